use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use ttooling::{CircuitTransition, ToolError, ToolOrigin, ToolRuntimeHooks};

/// Isolates panics raised by the wrapped hooks from the runtime.
pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_execution_start(&self, tool_name: &str, args: &Value) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_start(tool_name, args)
        }));
    }

    fn on_execution_success(&self, tool_name: &str, from_cache: bool, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_success(tool_name, from_cache, elapsed)
        }));
    }

    fn on_execution_failure(&self, tool_name: &str, error: &ToolError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_failure(tool_name, error, elapsed)
        }));
    }

    fn on_circuit_transition(&self, transition: &CircuitTransition) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_circuit_transition(transition)
        }));
    }

    fn on_tool_registered(&self, tool_name: &str, origin: &ToolOrigin, replaced: bool) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_tool_registered(tool_name, origin, replaced)
        }));
    }

    fn on_registration_failure(&self, module_name: &str, error: &ToolError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_registration_failure(module_name, error)
        }));
    }
}

/// Forwards every event to each hook in registration order.
#[derive(Default, Clone)]
pub struct FanoutToolHooks {
    hooks: Vec<Arc<dyn ToolRuntimeHooks>>,
}

impl FanoutToolHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<H>(mut self, hooks: H) -> Self
    where
        H: ToolRuntimeHooks + 'static,
    {
        self.hooks.push(Arc::new(hooks));
        self
    }

    pub fn with_shared(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl ToolRuntimeHooks for FanoutToolHooks {
    fn on_execution_start(&self, tool_name: &str, args: &Value) {
        for hooks in &self.hooks {
            hooks.on_execution_start(tool_name, args);
        }
    }

    fn on_execution_success(&self, tool_name: &str, from_cache: bool, elapsed: Duration) {
        for hooks in &self.hooks {
            hooks.on_execution_success(tool_name, from_cache, elapsed);
        }
    }

    fn on_execution_failure(&self, tool_name: &str, error: &ToolError, elapsed: Duration) {
        for hooks in &self.hooks {
            hooks.on_execution_failure(tool_name, error, elapsed);
        }
    }

    fn on_circuit_transition(&self, transition: &CircuitTransition) {
        for hooks in &self.hooks {
            hooks.on_circuit_transition(transition);
        }
    }

    fn on_tool_registered(&self, tool_name: &str, origin: &ToolOrigin, replaced: bool) {
        for hooks in &self.hooks {
            hooks.on_tool_registered(tool_name, origin, replaced);
        }
    }

    fn on_registration_failure(&self, module_name: &str, error: &ToolError) {
        for hooks in &self.hooks {
            hooks.on_registration_failure(module_name, error);
        }
    }
}

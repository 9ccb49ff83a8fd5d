//! Runtime hooks for tool execution lifecycle events.
//!
//! ```rust
//! use ttooling::{NoopToolRuntimeHooks, ToolRuntimeHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! let hooks = NoopToolRuntimeHooks;
//! assert_hooks_trait(&hooks);
//! ```

use std::time::Duration;

use serde_json::Value;

use crate::{CircuitTransition, ToolError, ToolOrigin};

pub trait ToolRuntimeHooks: Send + Sync {
    fn on_execution_start(&self, _tool_name: &str, _args: &Value) {}

    fn on_execution_success(&self, _tool_name: &str, _from_cache: bool, _elapsed: Duration) {}

    fn on_execution_failure(&self, _tool_name: &str, _error: &ToolError, _elapsed: Duration) {}

    fn on_circuit_transition(&self, _transition: &CircuitTransition) {}

    fn on_tool_registered(&self, _tool_name: &str, _origin: &ToolOrigin, _replaced: bool) {}

    fn on_registration_failure(&self, _module_name: &str, _error: &ToolError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolRuntimeHooks;

impl ToolRuntimeHooks for NoopToolRuntimeHooks {}

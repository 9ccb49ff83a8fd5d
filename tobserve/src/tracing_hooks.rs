//! Tracing-based observability hooks for tool runtime phases.
//!
//! ```rust
//! use tobserve::TracingObservabilityHooks;
//! use ttooling::ToolRuntimeHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_tool_hooks(&hooks);
//! ```

use std::time::Duration;

use serde_json::Value;
use ttooling::{CircuitState, CircuitTransition, ToolError, ToolOrigin, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_execution_start(&self, tool_name: &str, args: &Value) {
        tracing::debug!(
            phase = "tool",
            event = "execution_start",
            tool_name,
            arg_count = args.as_object().map_or(0, |map| map.len())
        );
    }

    fn on_execution_success(&self, tool_name: &str, from_cache: bool, elapsed: Duration) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_name,
            from_cache,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(&self, tool_name: &str, error: &ToolError, elapsed: Duration) {
        if error.is_user_error() {
            tracing::warn!(
                phase = "tool",
                event = "execution_rejected",
                tool_name,
                elapsed_ms = elapsed.as_millis() as u64,
                error_code = error.code(),
                error = %error
            );
        } else {
            tracing::error!(
                phase = "tool",
                event = "execution_failure",
                tool_name,
                elapsed_ms = elapsed.as_millis() as u64,
                error_code = error.code(),
                retryable = error.retryable,
                error = %error
            );
        }
    }

    fn on_circuit_transition(&self, transition: &CircuitTransition) {
        if transition.to == CircuitState::Open {
            tracing::warn!(
                phase = "circuit",
                event = "transition",
                tool_name = %transition.tool_name,
                from = %transition.from,
                to = %transition.to
            );
        } else {
            tracing::info!(
                phase = "circuit",
                event = "transition",
                tool_name = %transition.tool_name,
                from = %transition.from,
                to = %transition.to
            );
        }
    }

    fn on_tool_registered(&self, tool_name: &str, origin: &ToolOrigin, replaced: bool) {
        tracing::info!(
            phase = "registry",
            event = "tool_registered",
            tool_name,
            origin = %origin,
            replaced
        );
    }

    fn on_registration_failure(&self, module_name: &str, error: &ToolError) {
        tracing::warn!(
            phase = "registry",
            event = "registration_failure",
            module_name,
            error_code = error.code(),
            error = %error
        );
    }
}

//! Metrics-based observability hooks for tool runtime phases.
//!
//! ```rust
//! use tobserve::MetricsObservabilityHooks;
//! use ttooling::ToolRuntimeHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_tool_hooks(&hooks);
//! ```

use std::time::Duration;

use serde_json::Value;
use ttooling::{CircuitTransition, ToolError, ToolOrigin, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_execution_start(&self, tool_name: &str, _args: &Value) {
        metrics::counter!(
            "toolshed_tool_execution_start_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
    }

    fn on_execution_success(&self, tool_name: &str, from_cache: bool, elapsed: Duration) {
        metrics::counter!(
            "toolshed_tool_execution_success_total",
            "tool_name" => tool_name.to_string(),
            "from_cache" => from_cache.to_string()
        )
        .increment(1);
        if !from_cache {
            metrics::histogram!(
                "toolshed_tool_execution_duration_seconds",
                "tool_name" => tool_name.to_string(),
                "status" => "success"
            )
            .record(elapsed.as_secs_f64());
        }
    }

    fn on_execution_failure(&self, tool_name: &str, error: &ToolError, elapsed: Duration) {
        metrics::counter!(
            "toolshed_tool_execution_failure_total",
            "tool_name" => tool_name.to_string(),
            "error_code" => error.code()
        )
        .increment(1);
        metrics::histogram!(
            "toolshed_tool_execution_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_circuit_transition(&self, transition: &CircuitTransition) {
        metrics::counter!(
            "toolshed_circuit_transition_total",
            "tool_name" => transition.tool_name.clone(),
            "to" => transition.to.to_string()
        )
        .increment(1);
    }

    fn on_tool_registered(&self, _tool_name: &str, origin: &ToolOrigin, replaced: bool) {
        let origin = match origin {
            ToolOrigin::Host => "host",
            ToolOrigin::Module(_) => "module",
            ToolOrigin::Dynamic => "dynamic",
        };
        metrics::counter!(
            "toolshed_tool_registered_total",
            "origin" => origin,
            "replaced" => replaced.to_string()
        )
        .increment(1);
    }

    fn on_registration_failure(&self, module_name: &str, error: &ToolError) {
        metrics::counter!(
            "toolshed_registration_failure_total",
            "module_name" => module_name.to_string(),
            "error_code" => error.code()
        )
        .increment(1);
    }
}

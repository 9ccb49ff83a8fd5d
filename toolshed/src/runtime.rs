//! Runtime wiring helpers for common setups.
//!
//! ```rust
//! use toolshed::{RuntimeConfig, runtime_builder};
//!
//! let runtime = runtime_builder()
//!     .config(RuntimeConfig::default())
//!     .build()
//!     .expect("default config is valid");
//!
//! assert!(!runtime.is_ready());
//! ```

use std::sync::Arc;

use tobserve::{
    FanoutToolHooks, MetricsObservabilityHooks, SafeToolHooks, TracingObservabilityHooks,
};
use ttooling::{
    DefaultToolRuntime, DefaultToolRuntimeBuilder, Dependencies, RuntimeConfig, ToolError,
    ToolModule, ToolRuntime, ToolRuntimeHooks,
};

/// Tracing and metrics hooks, each isolated so a panicking exporter cannot
/// interrupt an execution.
pub fn observability_hooks() -> Arc<dyn ToolRuntimeHooks> {
    Arc::new(
        FanoutToolHooks::new()
            .with(SafeToolHooks::new(TracingObservabilityHooks))
            .with(SafeToolHooks::new(MetricsObservabilityHooks)),
    )
}

/// Like [`observability_hooks`], with an application hook appended.
pub fn observability_hooks_with(extra: Arc<dyn ToolRuntimeHooks>) -> Arc<dyn ToolRuntimeHooks> {
    Arc::new(
        FanoutToolHooks::new()
            .with(SafeToolHooks::new(TracingObservabilityHooks))
            .with(SafeToolHooks::new(MetricsObservabilityHooks))
            .with_shared(extra),
    )
}

/// Runtime builder preloaded with [`observability_hooks`].
pub fn runtime_builder() -> DefaultToolRuntimeBuilder {
    DefaultToolRuntime::builder().hooks(observability_hooks())
}

/// Builds an observed runtime from `config` and `modules`, then initializes it
/// with `dependencies`.
pub async fn start_runtime<I>(
    config: RuntimeConfig,
    modules: I,
    dependencies: Dependencies,
) -> Result<DefaultToolRuntime, ToolError>
where
    I: IntoIterator<Item = ToolModule>,
{
    let runtime = runtime_builder().config(config).modules(modules).build()?;
    let tool_count = runtime.initialize(dependencies).await?;
    tracing::info!(tool_count, "tool runtime started");
    Ok(runtime)
}

/// Erases a runtime behind the [`ToolRuntime`] trait for sharing across handlers.
pub fn shared_runtime(runtime: DefaultToolRuntime) -> Arc<dyn ToolRuntime> {
    Arc::new(runtime)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use ttooling::{ToolOrigin, ToolSet};

    use super::*;

    #[derive(Default)]
    struct Registrations {
        names: Mutex<Vec<String>>,
    }

    impl ToolRuntimeHooks for Registrations {
        fn on_tool_registered(&self, tool_name: &str, _origin: &ToolOrigin, _replaced: bool) {
            self.names
                .lock()
                .expect("names lock")
                .push(tool_name.to_string());
        }
    }

    fn basics() -> ToolModule {
        ToolModule::fixed(
            "basics",
            ToolSet::new().with_sync_fn(
                crate::ts_schema!("echo", "Echoes arguments"),
                |args, _ctx| Ok(args),
            ),
        )
    }

    #[tokio::test]
    async fn start_runtime_initializes_modules() {
        let runtime = start_runtime(RuntimeConfig::default(), [basics()], Dependencies::new())
            .await
            .expect("runtime should start");

        assert!(runtime.is_ready());
        assert!(runtime.has_tool("echo"));

        let shared = shared_runtime(runtime);
        let result = shared
            .execute("echo", json!({"text": "hi"}))
            .await
            .expect("runtime is ready");
        assert_eq!(result.result(), Some(&json!({"text": "hi"})));
    }

    #[tokio::test]
    async fn extra_hooks_receive_callbacks() {
        let extra = Arc::new(Registrations::default());
        let runtime = DefaultToolRuntime::builder()
            .hooks(observability_hooks_with(extra.clone()))
            .module(basics())
            .build()
            .expect("build");

        runtime
            .initialize(Dependencies::new())
            .await
            .expect("initialize");

        assert_eq!(*extra.names.lock().expect("names lock"), vec!["echo"]);
    }

    #[tokio::test]
    async fn invalid_config_fails_to_start() {
        let config = RuntimeConfig::default().with_learning_log_capacity(0);
        let error = start_runtime(config, Vec::new(), Dependencies::new())
            .await
            .err()
            .expect("zero capacity log should be rejected");

        assert_eq!(error.code(), "INVALID_CONFIG");
    }
}

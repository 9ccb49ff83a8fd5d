use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use ttooling::{
    CircuitState, CircuitTransition, DefaultToolRuntime, Dependencies, ToolError, ToolErrorKind,
    ToolOrigin, ToolRuntime, ToolRuntimeHooks, ToolSchema,
};

use crate::{
    FanoutToolHooks, MetricsObservabilityHooks, SafeToolHooks, TracingObservabilityHooks,
};

fn sample_transition() -> CircuitTransition {
    CircuitTransition {
        tool_name: "deploy".to_string(),
        from: CircuitState::Closed,
        to: CircuitState::Open,
    }
}

fn drive_all_callbacks(hooks: &dyn ToolRuntimeHooks) {
    let tool_error = ToolError::execution("tool failed");
    let user_error = ToolError::validation("missing required parameter city");

    hooks.on_execution_start("echo", &json!({"text": "hi"}));
    hooks.on_execution_success("echo", false, Duration::from_millis(20));
    hooks.on_execution_success("echo", true, Duration::from_millis(1));
    hooks.on_execution_failure("echo", &tool_error, Duration::from_millis(20));
    hooks.on_execution_failure("echo", &user_error, Duration::ZERO);
    hooks.on_circuit_transition(&sample_transition());
    hooks.on_tool_registered("echo", &ToolOrigin::Module("basics".to_string()), false);
    hooks.on_registration_failure("broken", &ToolError::registration("factory failed"));
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    drive_all_callbacks(&TracingObservabilityHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    drive_all_callbacks(&MetricsObservabilityHooks);
}

#[derive(Default, Clone)]
struct RecordingToolHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingToolHooks {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl ToolRuntimeHooks for RecordingToolHooks {
    fn on_execution_start(&self, _tool_name: &str, _args: &Value) {
        self.push("start");
    }

    fn on_execution_success(&self, _tool_name: &str, _from_cache: bool, _elapsed: Duration) {
        self.push("success");
    }

    fn on_execution_failure(&self, _tool_name: &str, _error: &ToolError, _elapsed: Duration) {
        self.push("failure");
    }

    fn on_circuit_transition(&self, _transition: &CircuitTransition) {
        self.push("circuit");
    }

    fn on_tool_registered(&self, _tool_name: &str, _origin: &ToolOrigin, _replaced: bool) {
        self.push("registered");
    }

    fn on_registration_failure(&self, _module_name: &str, _error: &ToolError) {
        self.push("registration_failure");
    }
}

struct PanicToolHooks;

impl ToolRuntimeHooks for PanicToolHooks {
    fn on_execution_start(&self, _tool_name: &str, _args: &Value) {
        panic!("start panic");
    }

    fn on_execution_success(&self, _tool_name: &str, _from_cache: bool, _elapsed: Duration) {
        panic!("success panic");
    }

    fn on_execution_failure(&self, _tool_name: &str, _error: &ToolError, _elapsed: Duration) {
        panic!("failure panic");
    }

    fn on_circuit_transition(&self, _transition: &CircuitTransition) {
        panic!("circuit panic");
    }

    fn on_tool_registered(&self, _tool_name: &str, _origin: &ToolOrigin, _replaced: bool) {
        panic!("registered panic");
    }

    fn on_registration_failure(&self, _module_name: &str, _error: &ToolError) {
        panic!("registration failure panic");
    }
}

#[test]
fn safe_tool_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingToolHooks::default();
    let events = Arc::clone(&inner.events);
    let hooks = SafeToolHooks::new(inner);

    drive_all_callbacks(&hooks);

    assert_eq!(
        *events.lock().expect("events lock"),
        vec![
            "start",
            "success",
            "success",
            "failure",
            "failure",
            "circuit",
            "registered",
            "registration_failure",
        ]
    );
}

#[test]
fn safe_tool_hooks_swallow_panics() {
    drive_all_callbacks(&SafeToolHooks::new(PanicToolHooks));
}

#[test]
fn fanout_forwards_to_every_hook() {
    let first = RecordingToolHooks::default();
    let second = RecordingToolHooks::default();
    let hooks = FanoutToolHooks::new()
        .with(first.clone())
        .with_shared(Arc::new(second.clone()))
        .with(SafeToolHooks::new(PanicToolHooks));
    assert_eq!(hooks.len(), 3);

    hooks.on_execution_start("echo", &json!({}));
    hooks.on_circuit_transition(&sample_transition());

    assert_eq!(*first.events.lock().expect("events lock"), vec!["start", "circuit"]);
    assert_eq!(*second.events.lock().expect("events lock"), vec!["start", "circuit"]);
}

#[tokio::test]
async fn panicking_hooks_do_not_break_execution() {
    let recorder = RecordingToolHooks::default();
    let hooks = FanoutToolHooks::new()
        .with(SafeToolHooks::new(PanicToolHooks))
        .with(SafeToolHooks::new(TracingObservabilityHooks))
        .with(SafeToolHooks::new(MetricsObservabilityHooks))
        .with(recorder.clone());

    let runtime = DefaultToolRuntime::builder()
        .hooks(Arc::new(hooks))
        .build()
        .expect("build");
    runtime
        .initialize(Dependencies::new())
        .await
        .expect("initialize");
    runtime
        .register_dynamic_tool(
            "echo",
            |args, _ctx| async move { Ok(args) },
            ToolSchema::new("echo", "Echoes arguments"),
        )
        .expect("register");

    let result = runtime
        .execute("echo", json!({"text": "hi"}))
        .await
        .expect("ready");
    assert_eq!(result.result(), Some(&json!({"text": "hi"})));

    let missing = runtime.execute("nope", json!({})).await.expect("ready");
    assert_eq!(missing.error_kind(), Some(ToolErrorKind::NotFound));

    assert_eq!(
        *recorder.events.lock().expect("events lock"),
        vec!["registered", "start", "success", "start", "failure"]
    );
}

//! Unified facade over the toolshed workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the tool runtime, its observability hooks, and the shared
//! primitives, and adds wiring helpers plus schema-building macros.

mod macros;

pub mod prelude;
pub mod runtime;
pub mod wire;

pub use tcommon;
pub use tobserve;
pub use ttooling;

pub use tcommon::{BoxFuture, Clock, ManualClock, MetadataMap, SystemClock};
pub use tobserve::{
    FanoutToolHooks, MetricsObservabilityHooks, SafeToolHooks, TracingObservabilityHooks,
};
pub use ttooling::{
    CircuitPolicy, CircuitState, CircuitTransition, DefaultToolRuntime, DefaultToolRuntimeBuilder,
    Dependencies, ExecuteOptions, ExecutionResult, FunctionTool, LearningSnapshot,
    NoopToolRuntimeHooks, ParameterSchema, ParameterSpec, ParameterType, RateLimit,
    RegistrationKind, RuntimeConfig, StatsSnapshot, Tool, ToolClass, ToolContext, ToolError,
    ToolErrorKind, ToolFuture, ToolInstaller, ToolMethod, ToolModule, ToolOrigin, ToolPolicy,
    ToolRegistration, ToolRegistry, ToolRuntime, ToolRuntimeHooks, ToolSchema, ToolSet,
    optional_bool, optional_str, parse_json_object, parse_json_value, required_f64, required_str,
};

pub use runtime::{
    observability_hooks, observability_hooks_with, runtime_builder, shared_runtime, start_runtime,
};
pub use wire::{ToolResponse, handle_execute, handle_list, handle_stats, status_for};

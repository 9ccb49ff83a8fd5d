//! Tool execution runtime: registry, schema validation, and the guarded
//! execution pipeline (rate limiting, result caching, circuit breaking,
//! timeouts, statistics).

mod args;
mod cache;
mod circuit;
mod config;
mod deps;
mod error;
mod hooks;
mod module;
mod rate_limit;
mod registry;
mod runtime;
mod schema;
mod stats;
mod tool;
mod types;
mod validate;

pub mod prelude {
    pub use crate::{
        DefaultToolRuntime, Dependencies, ExecuteOptions, ExecutionResult, FunctionTool,
        ParameterSpec, RuntimeConfig, Tool, ToolClass, ToolContext, ToolError, ToolErrorKind,
        ToolFuture, ToolMethod, ToolModule, ToolPolicy, ToolRegistry, ToolRuntime, ToolSchema,
        ToolSet,
    };
}

pub use args::{
    optional_bool, optional_str, parse_json_object, parse_json_value, required_f64, required_str,
};
pub use cache::{ResultCache, canonical_args};
pub use circuit::{Admission, AdmitDecision, CircuitBreaker, CircuitState, CircuitTransition};
pub use config::{CircuitPolicy, RateLimit, ResolvedPolicy, RuntimeConfig, ToolPolicy};
pub use deps::Dependencies;
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use module::{RegistrationKind, ToolClass, ToolMethod, ToolModule, ToolSet};
pub use rate_limit::RateLimiter;
pub use registry::{RegistryEntry, ToolInstaller, ToolOrigin, ToolRegistration, ToolRegistry};
pub use runtime::{DefaultToolRuntime, DefaultToolRuntimeBuilder, ToolRuntime};
pub use schema::{ParameterSchema, ParameterSpec, ParameterType, ToolSchema};
pub use stats::{
    ExecutionStats, LearningLog, LearningOutcome, LearningRecord, LearningSnapshot, StatsSnapshot,
};
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{ExecuteOptions, ExecutionResult, ToolContext};
pub use validate::validate_arguments;

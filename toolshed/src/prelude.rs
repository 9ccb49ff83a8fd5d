//! Common imports for most toolshed applications.

pub use crate::{handle_execute, handle_list, handle_stats, runtime_builder, start_runtime};
pub use crate::{ts_param, ts_schema};
pub use crate::{
    BoxFuture, DefaultToolRuntime, Dependencies, ExecuteOptions, ExecutionResult, FunctionTool,
    ParameterSpec, RuntimeConfig, Tool, ToolClass, ToolContext, ToolError, ToolErrorKind,
    ToolFuture, ToolMethod, ToolModule, ToolPolicy, ToolResponse, ToolRuntime, ToolSchema,
    ToolSet,
};

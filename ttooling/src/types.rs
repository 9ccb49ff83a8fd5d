//! Per-call context, options, and the structured execution result.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{Dependencies, ToolError, ToolErrorKind, ToolInstaller};

/// Handed to a tool for the duration of one invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub tool_name: String,
    dependencies: Arc<Dependencies>,
    installer: ToolInstaller,
}

impl ToolContext {
    pub(crate) fn new(
        tool_name: impl Into<String>,
        dependencies: Arc<Dependencies>,
        installer: ToolInstaller,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            dependencies,
            installer,
        }
    }

    /// A context backed by an empty private registry, for exercising a tool
    /// outside a runtime.
    pub fn detached(tool_name: impl Into<String>) -> Self {
        Self::new(
            tool_name,
            Arc::new(Dependencies::new()),
            ToolInstaller::standalone(),
        )
    }

    pub fn with_dependencies(mut self, dependencies: Dependencies) -> Self {
        self.dependencies = Arc::new(dependencies);
        self
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn installer(&self) -> &ToolInstaller {
        &self.installer
    }
}

impl Debug for ToolContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("tool_name", &self.tool_name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub use_cache: bool,
    pub timeout: Option<Duration>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            timeout: None,
        }
    }
}

impl ExecuteOptions {
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success {
        result: Value,
        execution_time: Duration,
        from_cache: bool,
    },
    Failure {
        error: ToolError,
        execution_time: Duration,
    },
}

impl ExecutionResult {
    pub fn success(result: Value, execution_time: Duration) -> Self {
        Self::Success {
            result,
            execution_time,
            from_cache: false,
        }
    }

    pub fn cached(result: Value, execution_time: Duration) -> Self {
        Self::Success {
            result,
            execution_time,
            from_cache: true,
        }
    }

    pub fn failure(error: ToolError, execution_time: Duration) -> Self {
        Self::Failure {
            error,
            execution_time,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error().map(|error| error.kind)
    }

    pub fn execution_time(&self) -> Duration {
        match self {
            Self::Success { execution_time, .. } | Self::Failure { execution_time, .. } => {
                *execution_time
            }
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(
            self,
            Self::Success {
                from_cache: true,
                ..
            }
        )
    }

    pub fn into_result(self) -> Result<Value, ToolError> {
        match self {
            Self::Success { result, .. } => Ok(result),
            Self::Failure { error, .. } => Err(error),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let execution_time_ms = self.execution_time().as_secs_f64() * 1000.0;
        match self {
            Self::Success {
                result, from_cache, ..
            } => {
                let mut state = serializer.serialize_struct("ExecutionResult", 4)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("result", result)?;
                state.serialize_field("executionTime", &execution_time_ms)?;
                state.serialize_field("fromCache", from_cache)?;
                state.end()
            }
            Self::Failure { error, .. } => {
                let mut state = serializer.serialize_struct("ExecutionResult", 4)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &error.kind)?;
                state.serialize_field("message", &error.message)?;
                state.serialize_field("executionTime", &execution_time_ms)?;
                state.end()
            }
        }
    }
}

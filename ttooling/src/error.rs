//! Tool runtime errors and classifications.
//!
//! ```rust
//! use ttooling::{ToolError, ToolErrorKind};
//!
//! let error = ToolError::validation("missing required parameter city").with_tool_name("get_weather");
//! assert_eq!(error.kind.code(), "VALIDATION_ERROR");
//! assert!(error.is_user_error());
//! assert!(error.to_string().starts_with("VALIDATION_ERROR"));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolErrorKind {
    NotFound,
    Validation,
    RateLimited,
    CircuitOpen,
    Timeout,
    Execution,
    Registration,
    NotReady,
    InvalidConfig,
    Internal,
}

impl ToolErrorKind {
    /// Stable wire code surfaced to callers.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "TOOL_NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::Timeout => "EXECUTION_TIMEOUT",
            Self::Execution => "EXECUTION_ERROR",
            Self::Registration => "REGISTRATION_ERROR",
            Self::NotReady => "NOT_READY",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether a failure of this kind counts against the tool's circuit breaker.
    pub fn trips_circuit(self) -> bool {
        matches!(self, Self::Execution | Self::Timeout | Self::Internal)
    }
}

impl Display for ToolErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for ToolErrorKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub retryable: bool,
    pub tool_name: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            tool_name: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message, false)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::RateLimited, message, true)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::CircuitOpen, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message, true)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message, false)
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Registration, message, false)
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotReady, message, false)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidConfig, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message, false)
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::Validation | ToolErrorKind::NotFound
        )
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.tool_name {
            Some(tool_name) => write!(
                f,
                "{} [tool={}]: {}",
                self.kind.code(),
                tool_name,
                self.message
            ),
            None => write!(f, "{}: {}", self.kind.code(), self.message),
        }
    }
}

impl Error for ToolError {}

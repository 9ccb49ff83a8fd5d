//! Transport-neutral request handling for exposing a runtime over HTTP.
//!
//! Every execution outcome, successful or not, is a `200` carrying the
//! execution result JSON. Only requests the runtime never saw are mapped to
//! other statuses: a malformed body is `400`, an uninitialized runtime is `503`.
//!
//! ```rust
//! use toolshed::{ToolResponse, ToolErrorKind};
//!
//! let response = ToolResponse::error(ToolErrorKind::Validation, "body must be a JSON object");
//! assert_eq!(response.status, 400);
//! assert_eq!(response.body["error"], "VALIDATION_ERROR");
//! ```

use serde::Serialize;
use serde_json::{Value, json};
use ttooling::{DefaultToolRuntime, ToolError, ToolErrorKind, ToolRuntime, parse_json_object};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub status: u16,
    pub body: Value,
}

impl ToolResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: status_for(kind),
            body: json!({
                "success": false,
                "error": kind.code(),
                "message": message.into(),
            }),
        }
    }

    pub fn from_error(error: &ToolError) -> Self {
        Self::error(error.kind, error.message.clone())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status for a failure that prevented an execution from starting.
pub fn status_for(kind: ToolErrorKind) -> u16 {
    match kind {
        ToolErrorKind::Validation => 400,
        ToolErrorKind::NotFound => 404,
        ToolErrorKind::NotReady => 503,
        _ => 500,
    }
}

/// `POST /tools/{name}` with a JSON object body.
pub async fn handle_execute(
    runtime: &dyn ToolRuntime,
    tool_name: &str,
    body: &str,
) -> ToolResponse {
    let args = match parse_json_object(body) {
        Ok(args) => args,
        Err(error) => return ToolResponse::from_error(&error),
    };

    match runtime.execute(tool_name, args).await {
        Ok(result) => ToolResponse::ok(result.to_json()),
        Err(error) => {
            tracing::warn!(tool = %tool_name, code = error.code(), "execution request refused");
            ToolResponse::from_error(&error)
        }
    }
}

/// `GET /tools`: every registered schema, in registration order.
pub fn handle_list(runtime: &dyn ToolRuntime) -> ToolResponse {
    match runtime.tool_schemas() {
        Ok(schemas) => {
            let tools: Vec<Value> = schemas.iter().map(|schema| schema.to_json()).collect();
            ToolResponse::ok(json!({ "tools": tools }))
        }
        Err(error) => ToolResponse::from_error(&error),
    }
}

/// `GET /stats`
pub fn handle_stats(runtime: &DefaultToolRuntime) -> ToolResponse {
    match runtime.stats_snapshot() {
        Ok(snapshot) => match serde_json::to_value(snapshot) {
            Ok(body) => ToolResponse::ok(body),
            Err(error) => ToolResponse::error(ToolErrorKind::Internal, error.to_string()),
        },
        Err(error) => ToolResponse::from_error(&error),
    }
}

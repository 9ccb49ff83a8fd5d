//! JSON argument helpers for request bodies and tool handlers.
//!
//! ```rust
//! use ttooling::{parse_json_object, required_str};
//!
//! let args = parse_json_object(r#"{"query":"rust"}"#).expect("object should parse");
//! let query = required_str(&args, "query").expect("query should be present");
//! assert_eq!(query, "rust");
//! ```

use serde_json::Value;

use crate::ToolError;

pub fn parse_json_value(args_json: &str) -> Result<Value, ToolError> {
    serde_json::from_str(args_json)
        .map_err(|err| ToolError::validation(format!("invalid JSON arguments: {err}")))
}

/// Parses a JSON object body; empty input is treated as `{}`.
pub fn parse_json_object(args_json: &str) -> Result<Value, ToolError> {
    if args_json.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value = parse_json_value(args_json)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ToolError::validation("expected JSON object arguments"))
    }
}

pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::validation(format!("missing required string: '{key}'")))
}

pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub fn required_f64(args: &Value, key: &str) -> Result<f64, ToolError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::validation(format!("missing required number: '{key}'")))
}

pub fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

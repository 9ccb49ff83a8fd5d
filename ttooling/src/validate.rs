//! Argument validation against a tool's declared parameter schema.
//!
//! ```rust
//! use serde_json::json;
//! use ttooling::{ParameterSpec, ToolSchema, validate_arguments};
//!
//! let schema = ToolSchema::new("get_weather", "Current weather")
//!     .required("city", ParameterSpec::string());
//!
//! assert!(validate_arguments(&schema.parameters, &json!({"city": "Oslo"})).is_ok());
//!
//! let error = validate_arguments(&schema.parameters, &json!({})).unwrap_err();
//! assert_eq!(error.message, "missing required parameter city");
//! ```

use serde_json::{Map, Value};

use crate::{ParameterSchema, ToolError};

/// Checks `args` against `schema`.
///
/// Checks run as required, declared types, enum membership, then undeclared
/// properties for closed schemas; the first violation is returned. A JSON
/// `null` property counts as absent.
pub fn validate_arguments(schema: &ParameterSchema, args: &Value) -> Result<(), ToolError> {
    let empty = Map::new();
    let supplied = match args {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(ToolError::validation("arguments must be an object")),
    };

    for name in &schema.required {
        if supplied.get(name).is_none_or(Value::is_null) {
            return Err(ToolError::validation(format!(
                "missing required parameter {name}"
            )));
        }
    }

    for (name, spec) in &schema.properties {
        let Some(value) = supplied.get(name).filter(|value| !value.is_null()) else {
            continue;
        };

        if !spec.kind.matches(value) {
            return Err(ToolError::validation(format!(
                "parameter {name} must be a {}",
                spec.kind
            )));
        }
    }

    for (name, spec) in &schema.properties {
        let (Some(value), Some(allowed)) = (supplied.get(name), spec.allowed.as_ref()) else {
            continue;
        };

        if !value.is_null() && !allowed.contains(value) {
            return Err(ToolError::validation(format!(
                "parameter {name} must be one of: {}",
                render_allowed(allowed)
            )));
        }
    }

    if schema.is_closed() {
        if let Some(extra) = supplied
            .keys()
            .find(|name| !schema.properties.contains_key(name.as_str()))
        {
            return Err(ToolError::validation(format!(
                "unexpected parameter {extra}"
            )));
        }
    }

    Ok(())
}

fn render_allowed(allowed: &[Value]) -> String {
    allowed
        .iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

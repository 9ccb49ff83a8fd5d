//! Declarative tool schemas advertised to callers and enforced by the validator.
//!
//! Schemas serialize to the JSON-Schema object shape accepted by LLM
//! function-calling APIs.
//!
//! ```rust
//! use ttooling::{ParameterSpec, ToolSchema};
//!
//! let schema = ToolSchema::new("get_weather", "Look up the current weather for a city")
//!     .required("city", ParameterSpec::string().describe("City name"))
//!     .optional("units", ParameterSpec::string().one_of(["metric", "imperial"]))
//!     .closed();
//!
//! let json = schema.to_json();
//! assert_eq!(json["parameters"]["type"], "object");
//! assert_eq!(json["parameters"]["required"][0], "city");
//! assert_eq!(json["parameters"]["additionalProperties"], false);
//! assert!(schema.check().is_ok());
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl Display for ParameterType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl ParameterSpec {
    pub fn new(kind: ParameterType) -> Self {
        Self {
            kind,
            description: None,
            allowed: None,
        }
    }

    pub fn string() -> Self {
        Self::new(ParameterType::String)
    }

    pub fn number() -> Self {
        Self::new(ParameterType::Number)
    }

    pub fn integer() -> Self {
        Self::new(ParameterType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(ParameterType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(ParameterType::Object)
    }

    pub fn array() -> Self {
        Self::new(ParameterType::Array)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SchemaType {
    #[default]
    Object,
}

fn open_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default)]
    schema_type: SchemaType,
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties", default = "open_by_default")]
    pub additional_properties: bool,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: SchemaType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(&self, name: &str) -> Option<&ParameterSpec> {
        self.properties.get(name)
    }

    pub fn is_closed(&self) -> bool {
        !self.additional_properties
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    pub fn required(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        if !self.parameters.required.contains(&name) {
            self.parameters.required.push(name.clone());
        }
        self.parameters.properties.insert(name, spec);
        self
    }

    pub fn optional(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.properties.insert(name.into(), spec);
        self
    }

    /// Rejects arguments that are not declared as properties.
    pub fn closed(mut self) -> Self {
        self.parameters.additional_properties = false;
        self
    }

    pub fn from_json(value: Value) -> Result<Self, ToolError> {
        let schema: ToolSchema = serde_json::from_value(value)
            .map_err(|err| ToolError::registration(format!("malformed tool schema: {err}")))?;
        schema.check()?;
        Ok(schema)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Checks the registration contract for this schema.
    pub fn check(&self) -> Result<(), ToolError> {
        if self.name.trim().is_empty() {
            return Err(ToolError::registration(
                "tool schema requires a non-empty name",
            ));
        }

        if self.description.trim().is_empty() {
            return Err(ToolError::registration(format!(
                "tool schema '{}' requires a description",
                self.name
            ))
            .with_tool_name(&self.name));
        }

        for required in &self.parameters.required {
            if !self.parameters.properties.contains_key(required) {
                return Err(ToolError::registration(format!(
                    "required parameter '{required}' is not declared in properties"
                ))
                .with_tool_name(&self.name));
            }
        }

        for (name, spec) in &self.parameters.properties {
            let Some(allowed) = &spec.allowed else {
                continue;
            };

            if allowed.is_empty() {
                return Err(ToolError::registration(format!(
                    "parameter '{name}' declares an empty enum"
                ))
                .with_tool_name(&self.name));
            }

            if allowed.iter().any(|value| !spec.kind.matches(value)) {
                return Err(ToolError::registration(format!(
                    "parameter '{name}' enum values must all be of type {}",
                    spec.kind
                ))
                .with_tool_name(&self.name));
            }
        }

        Ok(())
    }
}

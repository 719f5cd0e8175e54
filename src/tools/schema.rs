//! Declarative parameter schemas and validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::error::ToolError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    #[default]
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    pub fn from_json_type(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::Any,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    pub fn required(kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// Mapping from parameter name to its spec.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolSchema {
    params: BTreeMap<String, ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    pub fn required(self, name: impl Into<String>, kind: ParamType, description: &str) -> Self {
        self.param(name, ParamSpec::required(kind, description))
    }

    pub fn optional(self, name: impl Into<String>, kind: ParamType, description: &str) -> Self {
        self.param(name, ParamSpec::optional(kind, description))
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks `params` before a tool runs.
    ///
    /// A required key that is absent or null is reported as
    /// `missing required parameter: <name>`. Keys are checked in name order.
    pub fn validate(&self, params: &Value) -> Result<(), ToolError> {
        let empty = Map::new();
        let object = match params {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ToolError::invalid_input(format!(
                    "parameters must be an object, got {}",
                    json_type_name(other)
                )));
            }
        };

        for (name, spec) in &self.params {
            match object.get(name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ToolError::missing_parameter(name));
                    }
                }
                Some(value) if !spec.kind.matches(value) => {
                    return Err(ToolError::invalid_type(name, spec.kind.as_str()));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Reads `properties` and `required` from a JSON Schema object.
    pub fn from_json_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut params = BTreeMap::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let kind = match property.get("type") {
                    Some(Value::String(t)) => ParamType::from_json_type(t),
                    Some(Value::Array(types)) => types
                        .iter()
                        .filter_map(Value::as_str)
                        .find(|t| *t != "null")
                        .map(ParamType::from_json_type)
                        .unwrap_or_default(),
                    _ => ParamType::Any,
                };
                let description = property
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                params.insert(
                    name.clone(),
                    ParamSpec {
                        kind,
                        required: required.contains(&name.as_str()),
                        description,
                    },
                );
            }
        }
        Self { params }
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, spec) in &self.params {
            let mut property = Map::new();
            if spec.kind != ParamType::Any {
                property.insert("type".into(), Value::String(spec.kind.as_str().into()));
            }
            if !spec.description.is_empty() {
                property.insert("description".into(), Value::String(spec.description.clone()));
            }
            properties.insert(name.clone(), Value::Object(property));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params().collect::<Vec<_>>(),
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_schema() -> ToolSchema {
        ToolSchema::new()
            .required("file_path", ParamType::String, "Path to read")
            .optional("limit", ParamType::Integer, "Max lines")
    }

    #[test]
    fn test_missing_required_rejected() {
        let err = read_schema().validate(&json!({"limit": 5})).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: file_path");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = read_schema()
            .validate(&json!({"file_path": null}))
            .unwrap_err();
        assert_eq!(err, ToolError::missing_parameter("file_path"));
    }

    #[test]
    fn test_optional_may_be_absent() {
        assert!(read_schema().validate(&json!({"file_path": "a.rs"})).is_ok());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = read_schema()
            .validate(&json!({"file_path": "a.rs", "limit": "ten"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid type for parameter limit: expected integer");
    }

    #[test]
    fn test_non_object_params_rejected() {
        let err = read_schema().validate(&json!(["a.rs"])).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[test]
    fn test_extra_params_allowed() {
        assert!(
            read_schema()
                .validate(&json!({"file_path": "a.rs", "encoding": "utf8"}))
                .is_ok()
        );
    }

    #[test]
    fn test_json_schema_conversion() {
        let schema = ToolSchema::from_json_schema(&json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "Shell command"},
                "timeout_ms": {"type": ["integer", "null"]},
                "env": {}
            },
            "required": ["command"]
        }));
        assert_eq!(schema.len(), 3);
        assert!(schema.get("command").unwrap().required);
        assert_eq!(schema.get("timeout_ms").unwrap().kind, ParamType::Integer);
        assert_eq!(schema.get("env").unwrap().kind, ParamType::Any);

        let back = schema.to_json_schema();
        assert_eq!(back["required"], json!(["command"]));
        assert_eq!(back["properties"]["command"]["type"], "string");
    }
}

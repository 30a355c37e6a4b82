//! Declarative tool schema shared between the registry (C1) and the wire
//! format the model sees. `InputSchema` wraps an arbitrary JSON-schema-like
//! value; it never assumes a particular schema generator, though in practice
//! `orchestra-core` builds it from `schemars::Schema`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated argument schema for one tool. Transparent so it serializes as
/// a bare JSON-schema object on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct InputSchema(Value);

impl InputSchema {
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn object(properties: serde_json::Map<String, Value>, required: Vec<String>) -> Self {
        let mut schema = serde_json::Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert(
                "required".to_string(),
                Value::Array(required.into_iter().map(Value::String).collect()),
            );
        }
        Self(Value::Object(schema))
    }

    pub fn empty_object() -> Self {
        Self::object(serde_json::Map::new(), Vec::new())
    }
}

impl From<Value> for InputSchema {
    fn from(schema: Value) -> Self {
        Self(schema)
    }
}

impl From<schemars::Schema> for InputSchema {
    fn from(schema: schemars::Schema) -> Self {
        let value = serde_json::to_value(&schema).unwrap_or(Value::Null);
        Self(value)
    }
}

/// Declarative description of a tool: what the model is shown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// A single tool-call request as produced by the model (or a client
/// slash-command). Immutable once constructed — see `ToolCallRequest` in
/// `orchestra-core` for the session-scoped wrapper that adds identity and
/// provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub parameters: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_schema_omits_required_when_empty() {
        let schema = InputSchema::object(serde_json::Map::new(), Vec::new());
        assert!(schema.as_value().get("required").is_none());
    }

    #[test]
    fn object_schema_includes_required_when_present() {
        let mut props = serde_json::Map::new();
        props.insert("path".to_string(), serde_json::json!({"type": "string"}));
        let schema = InputSchema::object(props, vec!["path".to_string()]);
        assert_eq!(
            schema.as_value().get("required"),
            Some(&serde_json::json!(["path"]))
        );
    }
}

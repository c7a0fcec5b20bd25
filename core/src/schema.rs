//! Input schemas for tools: per-parameter type tags used both to advertise a
//! tool to the client and to validate incoming arguments.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::{FieldIssue, HandlerFault, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Integer,
    String,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.fract() == 0.0)
            }
            FieldKind::String => value.is_string(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
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

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub required: bool,
    /// Filled in when the caller omits the field.
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer, description)
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Implies optional.
    pub fn with_default(mut self, default: Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut property = json!({
            "type": self.kind.as_str(),
            "description": self.description,
        });
        if let Some(default) = &self.default {
            property["default"] = default.clone();
        }
        property
    }
}

/// Ordered parameter declarations of one tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. Redeclaring a name replaces the earlier spec in place.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.insert(spec.name.clone(), spec);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON Schema advertised in `tools/list`.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, spec)| (name.clone(), spec.to_json_schema()))
            .collect();
        let required: Vec<Value> = self
            .fields
            .values()
            .filter(|spec| spec.required)
            .map(|spec| Value::String(spec.name.clone()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    pub fn validate(&self, raw: &Value) -> Result<ToolArguments, ValidationError> {
        validate(self, raw)
    }
}

/// Checks `raw` against `schema`. Collects every offending field rather than
/// stopping at the first. Keys the schema does not declare are dropped.
pub fn validate(schema: &InputSchema, raw: &Value) -> Result<ToolArguments, ValidationError> {
    let empty = Map::new();
    let object = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ValidationError::new(vec![FieldIssue::new(
                "arguments",
                format!("expected object, received {}", json_type_name(other)),
            )]));
        }
    };

    let mut issues = Vec::new();
    let mut values = Map::new();
    for spec in schema.fields() {
        match object.get(&spec.name) {
            Some(value) if spec.kind.accepts(value) => {
                values.insert(spec.name.clone(), value.clone());
            }
            Some(value) => issues.push(FieldIssue::new(
                &spec.name,
                format!("expected {}, received {}", spec.kind, json_type_name(value)),
            )),
            None => match (&spec.default, spec.required) {
                (Some(default), _) => {
                    values.insert(spec.name.clone(), default.clone());
                }
                (None, true) => {
                    issues.push(FieldIssue::new(&spec.name, "required field is missing"))
                }
                (None, false) => {}
            },
        }
    }

    if issues.is_empty() {
        Ok(ToolArguments { values })
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Arguments that passed schema validation. Every required field is present
/// with its declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        let value = self.values.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|n| n as i64))
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Decodes the validated object into the handler's own argument type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, HandlerFault> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

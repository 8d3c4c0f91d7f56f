//! Caller-supplied output schemas.
//!
//! A [`Schema`] is a named JSON Schema document compiled once with the
//! `jsonschema` crate. Providers read its shape to build prompts and
//! request payloads, and every generated value is checked against it.

use std::fmt;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::ProviderError;

/// Named, compiled JSON Schema describing an expected output value.
///
/// Schemas sent to the schema-native provider run in strict mode, which
/// requires every property to be listed in `required` and
/// `additionalProperties: false` on each object.
#[derive(Clone)]
pub struct Schema {
    name: String,
    definition: Value,
    compiled: Arc<JSONSchema>,
}

impl Schema {
    /// Compile `definition` under `name`.
    ///
    /// The name is sent to backends as an identifier, so it is limited to
    /// ASCII letters, digits, `_` and `-`.
    pub fn new(name: impl Into<String>, definition: Value) -> Result<Self, ProviderError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ProviderError::InvalidSchema(format!(
                "schema name {:?} must be non-empty and contain only [a-zA-Z0-9_-]",
                name
            )));
        }

        let compiled = JSONSchema::compile(&definition)
            .map_err(|e| ProviderError::InvalidSchema(format!("{}: {}", name, e)))?;

        Ok(Self {
            name,
            definition,
            compiled: Arc::new(compiled),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The JSON Schema document as supplied.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Top-level properties in declaration order, if the schema is an object.
    pub fn properties(&self) -> Option<&serde_json::Map<String, Value>> {
        self.definition.get("properties").and_then(Value::as_object)
    }

    /// Top-level field names in declaration order.
    pub fn fields(&self) -> Vec<&str> {
        self.properties()
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Names listed in the top-level `required` array.
    pub fn required(&self) -> Vec<&str> {
        self.definition
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Field name when the schema is a single free-text field (a long-form
    /// report), `None` for any other shape.
    pub fn report_field(&self) -> Option<&str> {
        let props = self.properties()?;
        if props.len() != 1 {
            return None;
        }
        let (name, field) = props.iter().next()?;
        (type_name(field) == Some("string")).then_some(name.as_str())
    }

    /// Check `value` against the schema, joining all violations.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.compiled.validate(value).map_err(|errors| {
            errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{}: {}", path, err)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// The JSON type a schema node declares, ignoring a `null` alternative.
pub(crate) fn type_name(node: &Value) -> Option<&str> {
    match node.get("type")? {
        Value::String(name) => Some(name.as_str()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null"),
        _ => None,
    }
}

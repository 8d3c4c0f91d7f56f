//! Example JSON skeletons for prompt construction.

use serde_json::{json, Map, Value};

use crate::schema::{type_name, Schema};

/// Build a representative JSON skeleton for `schema`.
///
/// The skeleton only anchors the output format in a prompt: nested objects
/// are flattened to placeholder strings and arrays get two illustrative
/// items. Returns `"{}"` when the schema is not an object with properties.
pub fn synthesize_example(schema: &Schema) -> String {
    let Some(props) = schema.properties() else {
        return "{}".to_string();
    };

    let example: Map<String, Value> = props
        .iter()
        .map(|(name, field)| (name.clone(), example_for_field(name, field)))
        .collect();

    serde_json::to_string_pretty(&Value::Object(example)).unwrap_or_else(|_| "{}".to_string())
}

fn example_for_field(name: &str, field: &Value) -> Value {
    match type_name(field) {
        Some("array") => {
            let items = field.get("items").unwrap_or(&Value::Null);
            if type_name(items) == Some("object") {
                let item = example_object(items);
                Value::Array(vec![item.clone(), item])
            } else {
                json!(["first example", "second example"])
            }
        }
        Some("object") => json!("sample content"),
        Some("number") | Some("integer") => json!(0),
        Some("boolean") => json!(false),
        _ => Value::String(format!("example {}", name)),
    }
}

/// Nested object with every declared property set to a placeholder string.
fn example_object(node: &Value) -> Value {
    let props = node.get("properties").and_then(Value::as_object);
    match props {
        Some(props) if !props.is_empty() => Value::Object(
            props
                .keys()
                .map(|key| (key.clone(), Value::String(format!("example {}", key))))
                .collect(),
        ),
        _ => json!({
            "query": "example query",
            "researchGoal": "example research goal"
        }),
    }
}

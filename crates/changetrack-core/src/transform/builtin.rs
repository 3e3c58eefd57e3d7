use crate::transform::Transform;
use serde_json::Value;

///
/// ObjectTransform
///
/// Default transform: freezes the value as JSON text. Strings pass through
/// untouched; on the way back, text that parses as JSON is parsed and any
/// other text stays a string.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectTransform;

impl Transform for ObjectTransform {
    fn serialize(&self, value: &Value) -> Value {
        match value {
            Value::String(_) => value.clone(),
            other => Value::String(other.to_string()),
        }
    }

    fn deserialize(&self, serialized: &Value) -> Value {
        parse_if_text(serialized)
    }
}

///
/// JsonTransform
///
/// Leaves the value as is on serialize; the tracker stringifies it when the
/// checkpoint is taken. Parses JSON text on deserialize.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTransform;

impl Transform for JsonTransform {
    fn serialize(&self, value: &Value) -> Value {
        value.clone()
    }

    fn deserialize(&self, serialized: &Value) -> Value {
        parse_if_text(serialized)
    }
}

fn parse_if_text(serialized: &Value) -> Value {
    match serialized {
        Value::String(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        other => other.clone(),
    }
}

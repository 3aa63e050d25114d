// ── Flow messages ──
//
// A message is a JSON object passed between nodes. Action nodes read the
// trigger message, and answer by shallow-merging one result field into it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field used when a configured field name is missing or blank.
pub const DEFAULT_FIELD: &str = "payload";

/// A flow message: a JSON object with arbitrary top-level fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// A message with only `payload` set.
    pub fn with_payload(payload: Value) -> Self {
        Self::with_field(DEFAULT_FIELD, payload)
    }

    /// A message with exactly one field.
    pub fn with_field(field: &str, value: Value) -> Self {
        let mut map = Map::new();
        map.insert(field.to_string(), value);
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The `payload` field, `Null` when absent.
    pub fn payload(&self) -> Value {
        self.0.get(DEFAULT_FIELD).cloned().unwrap_or(Value::Null)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Overwrite this message's fields with every field of `other`.
    /// One level deep: nested objects are replaced, not merged.
    pub fn merge(mut self, other: Message) -> Self {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Value> for Message {
    /// Objects become messages as-is; any other value is wrapped as `payload`.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => Self::with_payload(other),
        }
    }
}

/// Resolve a configured field name, falling back to `payload` when blank.
pub fn field_or_default(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FIELD)
        .to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_field_names_fall_back_to_payload() {
        assert_eq!(field_or_default(None), "payload");
        assert_eq!(field_or_default(Some("")), "payload");
        assert_eq!(field_or_default(Some("   \t")), "payload");
        assert_eq!(field_or_default(Some(" carStatus ")), "carStatus");
    }

    #[test]
    fn merge_is_shallow_and_keeps_other_fields() {
        let trigger = Message::from(json!({
            "topic": "garage",
            "payload": { "nested": true },
            "_msgid": "abc"
        }));
        let result = Message::with_payload(json!("Lock successful"));

        let merged = trigger.merge(result);

        assert_eq!(
            merged.into_value(),
            json!({ "topic": "garage", "payload": "Lock successful", "_msgid": "abc" })
        );
    }

    #[test]
    fn non_object_values_become_payload() {
        let msg = Message::from(json!(42));
        assert_eq!(msg.payload(), json!(42));
        assert_eq!(Message::new().payload(), Value::Null);
    }
}

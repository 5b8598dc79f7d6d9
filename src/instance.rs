use serde_json::{Map, Value};

/// A decoded value of a schema'd type: field name → value, in schema order.
///
/// Absent optional fields have no entry; every other schema field is
/// present. Keys are *field names*, not wire keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    fields: Map<String, Value>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// `None` unless `value` is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_absent(&self, field: &str) -> bool {
        !self.fields.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

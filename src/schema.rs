//! Compiled, immutable type schemas.
//!
//! Raw field metadata ([`TypeDescription`]) goes in, a [`TypeSchema`] comes
//! out: an ordered table of non-excluded [`FieldDescriptor`]s with resolved
//! wire keys and a [`Shape`] that selects the decode policy for each field.
//! Schemas are compiled once per type and shared read-only afterwards.
pub mod cache;
pub mod compile;
pub mod describe;
pub mod keys;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub use compile::compile;
pub use describe::{ObjectRef, RawField, Registered, TypeDescription, TypeDescriptor};
pub use keys::{resolve_key, KeyStrategy};

// ------------------------------- Errors ----------------------------------- //

/// Programmer/config errors in a type's metadata. Raised while compiling,
/// never while decoding a particular document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("type `{type_name}` declares field `{field}` more than once")]
    DuplicateField { type_name: String, field: String },
    #[error("type `{type_name}`: fields `{first}` and `{second}` both resolve to JSON key `{key}`")]
    DuplicateKey { type_name: String, key: String, first: String, second: String },
    #[error("field `{field}` has inconsistent metadata: {reason}")]
    InconsistentMetadata { field: String, reason: String },
    #[error("default value for field `{field}` does not match its type: {reason}")]
    InvalidDefault { field: String, reason: String },
    #[error("defaults of `{type_name}` depend on its own schema")]
    CyclicDefault { type_name: String },
}

// ------------------------------- Shapes ----------------------------------- //

/// Structural classification of a field. Decides the decode strategy on its
/// own, independently of defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    OptionalScalar,
    ArrayOfNonDictionary,
    OptionalArrayOfNonDictionary,
    DictionaryOrArrayOfDictionary,
    OptionalDictionaryOrArrayOfDictionary,
    Object,
    OptionalObject,
}

impl Shape {
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Shape::OptionalScalar
                | Shape::OptionalArrayOfNonDictionary
                | Shape::OptionalDictionaryOrArrayOfDictionary
                | Shape::OptionalObject
        )
    }

    /// Element failures are skipped instead of failing the field.
    pub fn is_safe_array(self) -> bool {
        matches!(self, Shape::ArrayOfNonDictionary | Shape::OptionalArrayOfNonDictionary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Scalar => "scalar",
            Shape::OptionalScalar => "optional_scalar",
            Shape::ArrayOfNonDictionary => "array",
            Shape::OptionalArrayOfNonDictionary => "optional_array",
            Shape::DictionaryOrArrayOfDictionary => "dictionary",
            Shape::OptionalDictionaryOrArrayOfDictionary => "optional_dictionary",
            Shape::Object => "object",
            Shape::OptionalObject => "optional_object",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------- Value types -------------------------------- //

/// Compiled counterpart of [`TypeDescriptor`]: inline objects are already
/// compiled, registered ones are resolved through the cache on demand.
#[derive(Debug, Clone)]
pub enum ValueType {
    Bool,
    Integer,
    Float,
    String,
    Any,
    Array(Box<ValueType>),
    Dictionary(Box<ValueType>),
    Object(NestedSchema),
}

#[derive(Debug, Clone)]
pub enum NestedSchema {
    Compiled(Arc<TypeSchema>),
    Registered(Registered),
}

impl ValueType {
    /// Kind name used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Float => "number",
            ValueType::String => "string",
            ValueType::Any => "any",
            ValueType::Array(_) => "array",
            ValueType::Dictionary(_) => "dictionary",
            ValueType::Object(_) => "object",
        }
    }

    fn summary(&self) -> Value {
        match self {
            ValueType::Array(element) => json!({ "array": element.summary() }),
            ValueType::Dictionary(value) => json!({ "dictionary": value.summary() }),
            ValueType::Object(NestedSchema::Compiled(schema)) => json!({ "object": schema.summary() }),
            ValueType::Object(NestedSchema::Registered(registered)) => {
                json!({ "object": registered.type_name })
            }
            scalar => Value::from(scalar.kind_name()),
        }
    }
}

impl NestedSchema {
    pub fn resolve(&self) -> Result<Arc<TypeSchema>, SchemaError> {
        match self {
            NestedSchema::Compiled(schema) => Ok(Arc::clone(schema)),
            NestedSchema::Registered(registered) => (registered.load)(),
        }
    }
}

/// JSON kind of a concrete value, for mismatch errors.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ------------------------------ Descriptors ------------------------------- //

/// Compiled metadata for one serializable field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub shape: Shape,
    pub json_key: String,
    pub value_type: ValueType,
    /// Already decoded into instance form.
    pub default_value: Option<Value>,
}

impl FieldDescriptor {
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}

/// Ordered, immutable field table of one type. Declaration order is also
/// the encode output order.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    name: String,
    key_strategy: KeyStrategy,
    fields: IndexMap<String, FieldDescriptor>,
    excluded: Vec<String>,
}

impl TypeSchema {
    pub(crate) fn new(
        name: String,
        key_strategy: KeyStrategy,
        fields: IndexMap<String, FieldDescriptor>,
        excluded: Vec<String>,
    ) -> Self {
        Self { name, key_strategy, fields, excluded }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn key_strategy(&self) -> KeyStrategy {
        self.key_strategy
    }
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &FieldDescriptor> {
        self.fields.values()
    }
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    /// Names of fields dropped from the table. Kept for display only.
    pub fn excluded_fields(&self) -> &[String] {
        &self.excluded
    }

    /// Field table as JSON, for humans.
    pub fn summary(&self) -> Value {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields.values() {
            let mut o = Map::new();
            o.insert("name".into(), Value::from(field.name.clone()));
            o.insert("key".into(), Value::from(field.json_key.clone()));
            o.insert("shape".into(), Value::from(field.shape.as_str()));
            o.insert("type".into(), field.value_type.summary());
            if let Some(default) = &field.default_value {
                o.insert("default".into(), default.clone());
            }
            fields.push(Value::Object(o));
        }
        let mut out = json!({
            "name": self.name,
            "key_strategy": self.key_strategy.as_str(),
            "fields": fields,
        });
        if !self.excluded.is_empty() {
            out["excluded"] = Value::from(self.excluded.clone());
        }
        out
    }
}

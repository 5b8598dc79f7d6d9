//! Raw field metadata: the registration step a type goes through before its
//! schema is compiled.
//!
//! A [`TypeDescription`] is what a reflection front end (or a hand-written
//! table, or a descriptor file) hands to the compiler. Nothing here is
//! validated; [`super::compile`] does that.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::keys::KeyStrategy;
use super::{SchemaError, TypeSchema};
use crate::codable::JsonCodable;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Ordered field records for one type.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDescription {
    pub name: String,
    #[serde(default)]
    pub key_strategy: KeyStrategy,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

/// Declared type of a field (or of a collection element).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDescriptor {
    Bool,
    Integer,
    Float,
    String,
    /// Any non-null JSON value, kept as-is.
    Any,
    Array(Box<TypeDescriptor>),
    Dictionary(Box<TypeDescriptor>),
    Object(ObjectRef),
}

/// Where the schema of an object-typed field comes from.
#[derive(Clone)]
pub enum ObjectRef {
    /// Described in place; compiled together with the owning type.
    Inline(Box<TypeDescription>),
    /// A Rust type registered through [`JsonCodable`]; loaded from the
    /// schema cache on first use.
    Registered(Registered),
}

#[derive(Clone, Copy)]
pub struct Registered {
    pub type_name: &'static str,
    pub load: fn() -> Result<Arc<TypeSchema>, SchemaError>,
}

/// One field record as reported by the metadata collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "FieldEntry")]
pub struct RawField {
    pub name: String,
    pub type_descriptor: TypeDescriptor,
    pub is_optional: bool,
    pub is_array: bool,
    pub is_dictionary: bool,
    pub is_object_type: bool,
    pub json_key_override: Option<String>,
    /// JSON literal in wire form.
    pub default_value: Option<Value>,
    pub excluded: bool,
}

/// Descriptor-file form of [`RawField`]: structural flags may be left out
/// and are then read off the declared type.
#[derive(Deserialize)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type")]
    type_descriptor: TypeDescriptor,
    #[serde(default)]
    optional: bool,
    array: Option<bool>,
    dictionary: Option<bool>,
    object: Option<bool>,
    key: Option<String>,
    default: Option<Value>,
    #[serde(default)]
    excluded: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), key_strategy: KeyStrategy::Original, fields: Vec::new() }
    }
    pub fn key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }
    pub fn field(mut self, field: RawField) -> Self {
        self.fields.push(field);
        self
    }
}

impl TypeDescriptor {
    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }
    pub fn dictionary(value: TypeDescriptor) -> Self {
        TypeDescriptor::Dictionary(Box::new(value))
    }
    pub fn inline(description: TypeDescription) -> Self {
        TypeDescriptor::Object(ObjectRef::Inline(Box::new(description)))
    }
    /// Object field whose type is another registered Rust type.
    pub fn object<T: JsonCodable>() -> Self {
        TypeDescriptor::Object(ObjectRef::Registered(Registered {
            type_name: std::any::type_name::<T>(),
            load: crate::schema::cache::schema_for::<T>,
        }))
    }

    /// `(is_array, is_dictionary, is_object_type)` as a well-behaved
    /// collaborator would report them for this declared type.
    pub fn structural_flags(&self) -> (bool, bool, bool) {
        match self {
            TypeDescriptor::Array(element) => {
                (true, matches!(**element, TypeDescriptor::Dictionary(_)), false)
            }
            TypeDescriptor::Dictionary(_) => (false, true, false),
            TypeDescriptor::Object(_) => (false, false, true),
            _ => (false, false, false),
        }
    }
}

impl RawField {
    /// Field record with structural flags taken from `type_descriptor`.
    pub fn new(name: impl Into<String>, type_descriptor: TypeDescriptor) -> Self {
        let (is_array, is_dictionary, is_object_type) = type_descriptor.structural_flags();
        Self {
            name: name.into(),
            type_descriptor,
            is_optional: false,
            is_array,
            is_dictionary,
            is_object_type,
            json_key_override: None,
            default_value: None,
            excluded: false,
        }
    }
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.json_key_override = Some(key.into());
        self
    }
    pub fn default_value(mut self, literal: Value) -> Self {
        self.default_value = Some(literal);
        self
    }
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
    /// Overwrite the structural flags, for collaborators that report them
    /// independently of the declared type.
    pub fn with_flags(mut self, is_array: bool, is_dictionary: bool, is_object_type: bool) -> Self {
        self.is_array = is_array;
        self.is_dictionary = is_dictionary;
        self.is_object_type = is_object_type;
        self
    }
}

impl From<FieldEntry> for RawField {
    fn from(entry: FieldEntry) -> Self {
        let (array, dictionary, object) = entry.type_descriptor.structural_flags();
        RawField {
            name: entry.name,
            is_optional: entry.optional,
            is_array: entry.array.unwrap_or(array),
            is_dictionary: entry.dictionary.unwrap_or(dictionary),
            is_object_type: entry.object.unwrap_or(object),
            json_key_override: entry.key,
            default_value: entry.default,
            excluded: entry.excluded,
            type_descriptor: entry.type_descriptor,
        }
    }
}

// Only the inline form can come out of a descriptor file.
impl<'de> Deserialize<'de> for ObjectRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        TypeDescription::deserialize(deserializer).map(|d| ObjectRef::Inline(Box::new(d)))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Inline(description) => f.debug_tuple("Inline").field(description).finish(),
            ObjectRef::Registered(registered) => f.debug_tuple("Registered").field(registered).finish(),
        }
    }
}

impl fmt::Debug for Registered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

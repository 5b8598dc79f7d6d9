//! Raw field records → [`TypeSchema`].
use std::sync::Arc;

use indexmap::IndexMap;

use super::describe::{ObjectRef, RawField, TypeDescription, TypeDescriptor};
use super::keys::resolve_key;
use super::{FieldDescriptor, NestedSchema, SchemaError, Shape, TypeSchema, ValueType};
use crate::decode::{self, DecodeError};

/// Structural kind as stated by either the flags or the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Structure {
    Scalar,
    Array,
    Dictionary,
    ArrayOfDictionary,
    Object,
}

/// Compile one type. Excluded fields are dropped, every other field gets its
/// shape, wire key, compiled value type, and decoded default.
pub fn compile(description: &TypeDescription) -> Result<TypeSchema, SchemaError> {
    let mut fields: IndexMap<String, FieldDescriptor> = IndexMap::with_capacity(description.fields.len());
    let mut excluded: Vec<String> = Vec::new();
    // json key -> field name
    let mut keys: IndexMap<String, String> = IndexMap::new();

    for raw in &description.fields {
        if fields.contains_key(&raw.name) || excluded.contains(&raw.name) {
            return Err(SchemaError::DuplicateField {
                type_name: description.name.clone(),
                field: raw.name.clone(),
            });
        }
        if raw.excluded {
            excluded.push(raw.name.clone());
            continue;
        }

        let shape = classify(raw)?;
        let json_key = resolve_key(&raw.name, raw.json_key_override.as_deref(), description.key_strategy);
        if let Some(first) = keys.insert(json_key.clone(), raw.name.clone()) {
            return Err(SchemaError::DuplicateKey {
                type_name: description.name.clone(),
                key: json_key,
                first,
                second: raw.name.clone(),
            });
        }

        let value_type = lower(&raw.type_descriptor)?;
        let default_value = match &raw.default_value {
            None => None,
            Some(literal) => Some(decode::decode_literal(&value_type, literal).map_err(|error| match error {
                DecodeError::Schema(inner) => inner,
                other => SchemaError::InvalidDefault { field: raw.name.clone(), reason: other.to_string() },
            })?),
        };

        fields.insert(raw.name.clone(), FieldDescriptor {
            name: raw.name.clone(),
            shape,
            json_key,
            value_type,
            default_value,
        });
    }

    Ok(TypeSchema::new(description.name.clone(), description.key_strategy, fields, excluded))
}

fn classify(raw: &RawField) -> Result<Shape, SchemaError> {
    let inconsistent = |reason: String| SchemaError::InconsistentMetadata { field: raw.name.clone(), reason };

    let flagged = match (raw.is_array, raw.is_dictionary, raw.is_object_type) {
        (false, false, false) => Structure::Scalar,
        (true, false, false) => Structure::Array,
        (false, true, false) => Structure::Dictionary,
        (true, true, false) => Structure::ArrayOfDictionary,
        (false, false, true) => Structure::Object,
        _ => return Err(inconsistent("object flag combined with array/dictionary flags".into())),
    };
    let declared = match &raw.type_descriptor {
        TypeDescriptor::Array(element) if matches!(**element, TypeDescriptor::Dictionary(_)) => {
            Structure::ArrayOfDictionary
        }
        TypeDescriptor::Array(_) => Structure::Array,
        TypeDescriptor::Dictionary(_) => Structure::Dictionary,
        TypeDescriptor::Object(_) => Structure::Object,
        _ => Structure::Scalar,
    };
    if flagged != declared {
        return Err(inconsistent(format!("flags say {flagged:?} but declared type is {declared:?}")));
    }

    let shape = match (declared, raw.is_optional) {
        (Structure::Scalar, false) => Shape::Scalar,
        (Structure::Scalar, true) => Shape::OptionalScalar,
        (Structure::Array, false) => Shape::ArrayOfNonDictionary,
        (Structure::Array, true) => Shape::OptionalArrayOfNonDictionary,
        (Structure::Dictionary | Structure::ArrayOfDictionary, false) => Shape::DictionaryOrArrayOfDictionary,
        (Structure::Dictionary | Structure::ArrayOfDictionary, true) => {
            Shape::OptionalDictionaryOrArrayOfDictionary
        }
        (Structure::Object, false) => Shape::Object,
        (Structure::Object, true) => Shape::OptionalObject,
    };
    Ok(shape)
}

fn lower(descriptor: &TypeDescriptor) -> Result<ValueType, SchemaError> {
    Ok(match descriptor {
        TypeDescriptor::Bool => ValueType::Bool,
        TypeDescriptor::Integer => ValueType::Integer,
        TypeDescriptor::Float => ValueType::Float,
        TypeDescriptor::String => ValueType::String,
        TypeDescriptor::Any => ValueType::Any,
        TypeDescriptor::Array(element) => ValueType::Array(Box::new(lower(element)?)),
        TypeDescriptor::Dictionary(value) => ValueType::Dictionary(Box::new(lower(value)?)),
        TypeDescriptor::Object(ObjectRef::Inline(description)) => {
            ValueType::Object(NestedSchema::Compiled(Arc::new(compile(description)?)))
        }
        TypeDescriptor::Object(ObjectRef::Registered(registered)) => {
            ValueType::Object(NestedSchema::Registered(*registered))
        }
    })
}

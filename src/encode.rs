//! [`Instance`] → ordered wire object.
//!
//! Fields are written in schema order under their wire keys. An absent
//! optional field is left out entirely (no `null`). Object-typed values
//! recurse through their own schema, so nested wire keys are resolved too.
use serde_json::{Map, Value};
use thiserror::Error;

use crate::decode::{child_path, index_path, integral};
use crate::instance::Instance;
use crate::schema::{value_kind, SchemaError, TypeSchema, ValueType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("required field `{0}` has no value")]
    MissingValue(String),
    #[error("expected {expected} at `{path}`, found {actual}")]
    UnexpectedValue { expected: &'static str, actual: &'static str, path: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub fn encode_instance(schema: &TypeSchema, instance: &Instance) -> Result<Map<String, Value>, EncodeError> {
    encode_fields(schema, instance.as_map(), "")
}

fn encode_fields(schema: &TypeSchema, record: &Map<String, Value>, base: &str) -> Result<Map<String, Value>, EncodeError> {
    let mut out = Map::with_capacity(schema.len());
    for field in schema.fields() {
        let path = child_path(base, &field.name);
        match record.get(&field.name) {
            None | Some(Value::Null) if field.shape.is_optional() => continue,
            None | Some(Value::Null) => return Err(EncodeError::MissingValue(path)),
            Some(value) => {
                out.insert(field.json_key.clone(), encode_value(&field.value_type, value, &path)?);
            }
        }
    }
    Ok(out)
}

fn encode_value(value_type: &ValueType, value: &Value, path: &str) -> Result<Value, EncodeError> {
    match (value_type, value) {
        (ValueType::Array(element), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| encode_value(element, item, &index_path(path, index)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ValueType::Dictionary(element), Value::Object(entries)) => entries
            .iter()
            .map(|(key, item)| encode_value(element, item, &child_path(path, key)).map(|v| (key.clone(), v)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        (ValueType::Object(nested), Value::Object(record)) => {
            let schema = nested.resolve()?;
            encode_fields(&schema, record, path).map(Value::Object)
        }
        (ValueType::Integer, Value::Number(n)) => integral(n).ok_or_else(|| unexpected(value_type, value, path)),
        (ValueType::Bool, Value::Bool(_))
        | (ValueType::Float, Value::Number(_))
        | (ValueType::String, Value::String(_)) => Ok(value.clone()),
        (ValueType::Any, scalar) if !scalar.is_null() => Ok(scalar.clone()),
        (value_type, other) => Err(unexpected(value_type, other, path)),
    }
}

fn unexpected(value_type: &ValueType, value: &Value, path: &str) -> EncodeError {
    EncodeError::UnexpectedValue {
        expected: value_type.kind_name(),
        actual: value_kind(value),
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_instance;
    use crate::schema::{compile, KeyStrategy, RawField, TypeDescription, TypeDescriptor};
    use serde_json::json;

    fn instance(v: Value) -> Instance {
        Instance::from_value(v).unwrap()
    }

    fn profile_schema() -> TypeSchema {
        let address = TypeDescription::new("Address")
            .key_strategy(KeyStrategy::SnakeCase)
            .field(RawField::new("zipCode", TypeDescriptor::String));
        compile(
            &TypeDescription::new("Profile")
                .key_strategy(KeyStrategy::SnakeCase)
                .field(RawField::new("userId", TypeDescriptor::Integer))
                .field(RawField::new("nickName", TypeDescriptor::String).optional())
                .field(RawField::new("homes", TypeDescriptor::array(TypeDescriptor::inline(address.clone()))))
                .field(RawField::new("byName", TypeDescriptor::dictionary(TypeDescriptor::inline(address))))
                .field(RawField::new("token", TypeDescriptor::String).excluded()),
        )
        .unwrap()
    }

    #[test]
    fn writes_wire_keys_in_schema_order_and_recurses() {
        let encoded = encode_instance(
            &profile_schema(),
            &instance(json!({
                "byName": { "work": { "zipCode": "2" } },
                "homes": [{ "zipCode": "1" }],
                "userId": 7,
                "token": "never written",
            })),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&encoded).unwrap(),
            r#"{"user_id":7,"homes":[{"zip_code":"1"}],"by_name":{"work":{"zip_code":"2"}}}"#
        );
    }

    #[test]
    fn absent_and_null_optionals_are_omitted() {
        let schema = profile_schema();
        let base = json!({ "userId": 1, "homes": [], "byName": {} });
        let encoded = encode_instance(&schema, &instance(base.clone())).unwrap();
        assert!(!encoded.contains_key("nick_name"));

        let mut with_null = base;
        with_null["nickName"] = Value::Null;
        let encoded = encode_instance(&schema, &instance(with_null)).unwrap();
        assert!(!encoded.contains_key("nick_name"));
    }

    #[test]
    fn required_without_value_fails() {
        let err = encode_instance(&profile_schema(), &instance(json!({ "homes": [], "byName": {} }))).unwrap_err();
        assert_eq!(err, EncodeError::MissingValue("userId".into()));
    }

    #[test]
    fn structured_field_with_scalar_value_fails() {
        let err = encode_instance(
            &profile_schema(),
            &instance(json!({ "userId": 1, "homes": "none", "byName": {} })),
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::UnexpectedValue { expected: "array", .. }));
    }

    #[test]
    fn scalar_of_the_wrong_kind_fails() {
        let schema = compile(
            &TypeDescription::new("T")
                .field(RawField::new("id", TypeDescriptor::Integer))
                .field(RawField::new("tags", TypeDescriptor::array(TypeDescriptor::String))),
        )
        .unwrap();

        let err = encode_instance(&schema, &instance(json!({ "id": "not-an-int", "tags": [] }))).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnexpectedValue { expected: "integer", actual: "string", path: "id".into() }
        );

        let err = encode_instance(&schema, &instance(json!({ "id": 1, "tags": ["ok", 1, true] }))).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnexpectedValue { expected: "string", actual: "number", path: "tags[1]".into() }
        );

        let err = encode_instance(&schema, &instance(json!({ "id": 1.5, "tags": [] }))).unwrap_err();
        assert!(matches!(err, EncodeError::UnexpectedValue { expected: "integer", actual: "number", .. }));
    }

    #[test]
    fn encoded_scalars_always_decode_again() {
        let schema = compile(
            &TypeDescription::new("T")
                .field(RawField::new("count", TypeDescriptor::Integer))
                .field(RawField::new("ratio", TypeDescriptor::Float))
                .field(RawField::new("on", TypeDescriptor::Bool))
                .field(RawField::new("meta", TypeDescriptor::Any)),
        )
        .unwrap();
        let encoded = encode_instance(
            &schema,
            &instance(json!({ "count": 2.0, "ratio": 3, "on": false, "meta": { "k": [1] } })),
        )
        .unwrap();
        assert_eq!(Value::Object(encoded.clone()), json!({ "count": 2, "ratio": 3, "on": false, "meta": { "k": [1] } }));
        assert!(decode_instance(&encoded, &schema).is_ok());

        let err = encode_instance(&schema, &instance(json!({ "count": 1, "ratio": "x", "on": true, "meta": 0 })))
            .unwrap_err();
        assert_eq!(err, EncodeError::UnexpectedValue { expected: "number", actual: "string", path: "ratio".into() });
    }

    #[test]
    fn hand_built_instance() {
        let schema = profile_schema();
        let mut record = Instance::new();
        record.insert("userId", json!(5));
        record.insert("nickName", json!("n"));
        record.insert("homes", json!([]));
        record.insert("byName", json!({}));
        assert_eq!(record.remove("nickName"), Some(json!("n")));
        assert!(record.is_absent("nickName"));

        let encoded = encode_instance(&schema, &record).unwrap();
        assert_eq!(Value::Object(encoded), json!({ "user_id": 5, "homes": [], "by_name": {} }));

        let map = record.into_map();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["userId", "homes", "byName"]);
    }

    #[test]
    fn decode_then_encode_is_identity_on_fully_populated_input() {
        let schema = profile_schema();
        let wire = json!({
            "user_id": 3,
            "nick_name": "z",
            "homes": [{ "zip_code": "1" }, { "zip_code": "2" }],
            "by_name": { "a": { "zip_code": "3" } },
        });
        let decoded = decode_instance(wire.as_object().unwrap(), &schema).unwrap();
        let encoded = encode_instance(&schema, &decoded).unwrap();
        assert_eq!(Value::Object(encoded), wire);
    }
}

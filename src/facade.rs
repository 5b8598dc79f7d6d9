//! Top-level encode/decode entry points.
//!
//! Typed values go through serde to an [`Instance`] and then through the
//! schema engines; the wire side goes through `serde_json`. Whatever fails
//! on the way comes out as a [`JsonError`].
use serde_json::{Map, Value};

use crate::codable::JsonCodable;
use crate::decode::DecodeReport;
use crate::error::JsonError;
use crate::instance::Instance;
use crate::path_de;
use crate::schema::{value_kind, TypeSchema};

/// Output configuration for text and byte encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub pretty: bool,
}

impl EncodeOptions {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

// ------------------------------- Typed API -------------------------------- //

/// Compact JSON text.
pub fn encode<T: JsonCodable>(value: &T) -> Result<String, JsonError> {
    encode_with(value, EncodeOptions::default())
}

pub fn encode_pretty<T: JsonCodable>(value: &T) -> Result<String, JsonError> {
    encode_with(value, EncodeOptions::pretty())
}

pub fn encode_with<T: JsonCodable>(value: &T, options: EncodeOptions) -> Result<String, JsonError> {
    let schema = T::schema().map_err(JsonError::encoding_schema)?;
    encode_instance(&schema, &to_instance(value)?, options)
}

/// Canonical (compact) bytes.
pub fn encode_bytes<T: JsonCodable>(value: &T) -> Result<Vec<u8>, JsonError> {
    let schema = T::schema().map_err(JsonError::encoding_schema)?;
    let wire = crate::encode::encode_instance(&schema, &to_instance(value)?)?;
    write(wire, false)
}

/// Encodes to canonical bytes and parses them back into an untyped tree.
pub fn encode_to_dictionary<T: JsonCodable>(value: &T) -> Result<Map<String, Value>, JsonError> {
    let bytes = encode_bytes(value)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(JsonError::EncodingFailed(format!("encoded a {} instead of an object", value_kind(&other)))),
        Err(error) => Err(JsonError::EncodingFailed(error.to_string())),
    }
}

pub fn decode<T: JsonCodable>(text: &str) -> Result<T, JsonError> {
    decode_bytes(text.as_bytes())
}

pub fn decode_bytes<T: JsonCodable>(bytes: &[u8]) -> Result<T, JsonError> {
    let schema = T::schema().map_err(JsonError::decoding_schema)?;
    let container = parse(bytes)?;
    let instance = crate::decode::decode_instance(&container, &schema)?;
    from_instance(instance)
}

/// Goes through canonical bytes first so the result matches [`decode`]
/// exactly.
pub fn decode_from_dictionary<T: JsonCodable>(map: &Map<String, Value>) -> Result<T, JsonError> {
    let bytes = serde_json::to_vec(map).map_err(|error| JsonError::DecodingFailed(error.to_string()))?;
    decode_bytes(&bytes)
}

// ------------------------------ Schema API -------------------------------- //

/// Decode against a schema known only at runtime.
pub fn decode_with_schema(schema: &TypeSchema, bytes: &[u8]) -> Result<Instance, JsonError> {
    decode_with_report(schema, bytes).map(|(instance, _)| instance)
}

/// Also returns which array elements were skipped.
pub fn decode_with_report(schema: &TypeSchema, bytes: &[u8]) -> Result<(Instance, DecodeReport), JsonError> {
    let container = parse(bytes)?;
    Ok(crate::decode::decode_instance_with_report(&container, schema)?)
}

/// Same as [`decode_with_report`] for a document that is already parsed.
pub fn decode_value_with_report(schema: &TypeSchema, value: &Value) -> Result<(Instance, DecodeReport), JsonError> {
    let container = value.as_object().ok_or_else(|| not_an_object(value))?;
    Ok(crate::decode::decode_instance_with_report(container, schema)?)
}

pub fn encode_instance(schema: &TypeSchema, instance: &Instance, options: EncodeOptions) -> Result<String, JsonError> {
    let wire = crate::encode::encode_instance(schema, instance)?;
    String::from_utf8(write(wire, options.pretty)?).map_err(|_| JsonError::InvalidStringEncoding)
}

// ------------------------------- Internals -------------------------------- //

fn to_instance<T: JsonCodable>(value: &T) -> Result<Instance, JsonError> {
    let value = serde_json::to_value(value).map_err(|error| JsonError::EncodingFailed(error.to_string()))?;
    let kind = value_kind(&value);
    Instance::from_value(value)
        .ok_or_else(|| JsonError::EncodingFailed(format!("value serialized to a {kind}, not an object")))
}

fn from_instance<T: JsonCodable>(instance: Instance) -> Result<T, JsonError> {
    path_de::from_value_with_path(instance.into_value()).map_err(JsonError::DecodingFailed)
}

fn parse(bytes: &[u8]) -> Result<Map<String, Value>, JsonError> {
    let text = std::str::from_utf8(bytes).map_err(|_| JsonError::InvalidStringEncoding)?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(not_an_object(&other)),
        Err(error) => Err(JsonError::InvalidJsonSyntax(error.to_string())),
    }
}

fn not_an_object(value: &Value) -> JsonError {
    JsonError::DecodingFailed(format!("expected a JSON object at the top level, found {}", value_kind(value)))
}

fn write(wire: Map<String, Value>, pretty: bool) -> Result<Vec<u8>, JsonError> {
    let value = Value::Object(wire);
    let bytes = if pretty { serde_json::to_vec_pretty(&value) } else { serde_json::to_vec(&value) };
    bytes.map_err(|error| JsonError::EncodingFailed(error.to_string()))
}

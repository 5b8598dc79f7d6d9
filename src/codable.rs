use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::JsonError;
use crate::facade;
use crate::schema::{cache, SchemaError, TypeDescription, TypeSchema};

/// A Rust type with a registered field table.
///
/// `describe` is the registration step: it lists the type's fields in
/// declaration order, using the serde field names. Excluded fields should
/// also be `#[serde(skip)]` so decoding can fill them from `Default`.
pub trait JsonCodable: Serialize + DeserializeOwned + 'static {
    fn describe() -> TypeDescription;

    /// Compiled once per process, then shared.
    fn schema() -> Result<Arc<TypeSchema>, SchemaError> {
        cache::schema_for::<Self>()
    }

    fn to_json_string(&self) -> Result<String, JsonError> {
        facade::encode(self)
    }

    fn to_json_data(&self) -> Result<Vec<u8>, JsonError> {
        facade::encode_bytes(self)
    }

    fn to_dictionary(&self) -> Result<Map<String, Value>, JsonError> {
        facade::encode_to_dictionary(self)
    }

    fn from_json_string(text: &str) -> Result<Self, JsonError> {
        facade::decode(text)
    }

    fn from_json_data(bytes: &[u8]) -> Result<Self, JsonError> {
        facade::decode_bytes(bytes)
    }

    fn from_dictionary(map: &Map<String, Value>) -> Result<Self, JsonError> {
        facade::decode_from_dictionary(map)
    }
}

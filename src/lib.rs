//! Schema-driven JSON encoding and decoding.
//!
//! A type registers its fields once ([`TypeDescription`]); the compiled
//! [`TypeSchema`] then decides, per field, how to decode (strict, defaulted,
//! optional, or fault-tolerant for arrays) and how to encode.
pub mod codable;
pub mod decode;
pub mod encode;
pub mod error;
pub mod facade;
pub mod instance;
pub mod path_de;
pub mod schema;

pub use codable::JsonCodable;
pub use decode::{DecodeError, DecodeReport, SkippedElement};
pub use encode::EncodeError;
pub use error::JsonError;
pub use facade::{
    decode, decode_bytes, decode_from_dictionary, encode, encode_bytes, encode_pretty, encode_to_dictionary,
    encode_with, EncodeOptions,
};
pub use instance::Instance;
pub use schema::{
    FieldDescriptor, KeyStrategy, RawField, SchemaError, Shape, TypeDescription, TypeDescriptor, TypeSchema,
};

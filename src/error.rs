//! Public error taxonomy. Every failure leaving the facade is one of these.
use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::schema::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("missing required field `{0}`")]
    MissingRequiredField(String),
    #[error("type mismatch at `{key}`: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String, key: String },
    #[error("invalid JSON syntax: {0}")]
    InvalidJsonSyntax(String),
    #[error("input is not valid UTF-8")]
    InvalidStringEncoding,
    #[error("encoding failed: {0}")]
    EncodingFailed(String),
    #[error("decoding failed: {0}")]
    DecodingFailed(String),
}

impl JsonError {
    /// Schema problems hit while decoding.
    pub(crate) fn decoding_schema(error: SchemaError) -> Self {
        JsonError::DecodingFailed(format!("invalid schema: {error}"))
    }

    /// Schema problems hit while encoding.
    pub(crate) fn encoding_schema(error: SchemaError) -> Self {
        JsonError::EncodingFailed(format!("invalid schema: {error}"))
    }
}

impl From<DecodeError> for JsonError {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::MissingField { key } => JsonError::MissingRequiredField(key),
            DecodeError::TypeMismatch { expected, actual, key } => JsonError::TypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
                key,
            },
            DecodeError::Schema(inner) => JsonError::decoding_schema(inner),
        }
    }
}

impl From<EncodeError> for JsonError {
    fn from(error: EncodeError) -> Self {
        match error {
            EncodeError::Schema(inner) => JsonError::encoding_schema(inner),
            other => JsonError::EncodingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_keep_their_key() {
        let err: JsonError = DecodeError::TypeMismatch { expected: "integer", actual: "string", key: "a.b".into() }.into();
        assert_eq!(err.to_string(), "type mismatch at `a.b`: expected integer, found string");
        let err: JsonError = DecodeError::MissingField { key: "id".into() }.into();
        assert_eq!(err, JsonError::MissingRequiredField("id".into()));
    }

    #[test]
    fn schema_errors_follow_the_direction() {
        let schema = SchemaError::CyclicDefault { type_name: "T".into() };
        assert!(matches!(JsonError::from(DecodeError::Schema(schema.clone())), JsonError::DecodingFailed(_)));
        assert!(matches!(JsonError::from(EncodeError::Schema(schema)), JsonError::EncodingFailed(_)));
    }
}

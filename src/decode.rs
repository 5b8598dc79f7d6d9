//! Policy-driven decoding of a JSON object into an [`Instance`].
//!
//! Each field gets exactly one policy, picked from its [`Shape`] and whether
//! it has a default:
//!
//! - required, no default: any failure aborts the whole instance.
//! - required with default, or optional: failures are absorbed, yielding the
//!   default if there is one and "absent" otherwise.
//! - arrays of non-dictionaries: *safe* decode. Elements that fail on their
//!   own are dropped and the rest kept in order. Only a missing or non-array
//!   value falls back to the field's required/optional/default rule.
//! - dictionaries (and arrays of them): strict. One bad entry fails the
//!   field, which then follows its required/optional/default rule.
//!
//! Errors carry the absolute wire path of the failing value (`a.b[2].c`).
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::instance::Instance;
use crate::schema::{value_kind, FieldDescriptor, SchemaError, TypeSchema, ValueType};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing required field `{key}`")]
    MissingField { key: String },
    #[error("expected {expected} at `{key}`, found {actual}")]
    TypeMismatch { expected: &'static str, actual: &'static str, key: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Side channel for safe-array decoding: which elements were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub skipped: Vec<SkippedElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedElement {
    /// Wire path of the dropped element, e.g. `items[1]`.
    pub path: String,
    pub reason: DecodeError,
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Decode `container` against `schema`. Either every required field decodes
/// or the first failing one is returned; no partial instance escapes.
pub fn decode_instance(container: &Map<String, Value>, schema: &TypeSchema) -> Result<Instance, DecodeError> {
    decode_instance_with_report(container, schema).map(|(instance, _)| instance)
}

/// [`decode_instance`], also reporting every skipped array element.
pub fn decode_instance_with_report(
    container: &Map<String, Value>,
    schema: &TypeSchema,
) -> Result<(Instance, DecodeReport), DecodeError> {
    let mut report = DecodeReport::default();
    let instance = decode_fields(container, schema, "", &mut report)?;
    Ok((instance, report))
}

/// Strictly decode a standalone literal (used for schema defaults).
pub(crate) fn decode_literal(value_type: &ValueType, literal: &Value) -> Result<Value, DecodeError> {
    decode_value(value_type, literal, "", &mut DecodeReport::default())
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
    fn absorb(&mut self, other: DecodeReport) {
        self.skipped.extend(other.skipped);
    }
}

impl DecodeError {
    pub fn key(&self) -> Option<&str> {
        match self {
            DecodeError::MissingField { key } | DecodeError::TypeMismatch { key, .. } => Some(key.as_str()),
            DecodeError::Schema(_) => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FIELDS
// ————————————————————————————————————————————————————————————————————————————

fn decode_fields(
    container: &Map<String, Value>,
    schema: &TypeSchema,
    base: &str,
    report: &mut DecodeReport,
) -> Result<Instance, DecodeError> {
    let mut out = Map::with_capacity(schema.len());
    for field in schema.fields() {
        if let Some(value) = decode_field(container, field, base, report)? {
            out.insert(field.name.clone(), value);
        }
    }
    Ok(Instance::from_map(out))
}

/// `Ok(None)` means the field is absent in the decoded instance.
fn decode_field(
    container: &Map<String, Value>,
    field: &FieldDescriptor,
    base: &str,
    report: &mut DecodeReport,
) -> Result<Option<Value>, DecodeError> {
    let path = child_path(base, &field.json_key);
    // explicit null reads as missing
    let raw = container.get(&field.json_key).filter(|v| !v.is_null());

    if field.shape.is_safe_array() {
        return match (&field.value_type, raw) {
            (ValueType::Array(element), Some(Value::Array(items))) => {
                decode_safe_elements(element, items, &path, report).map(|items| Some(Value::Array(items)))
            }
            (_, None) => recover(field, DecodeError::MissingField { key: path }),
            (value_type, Some(other)) => recover(field, mismatch(value_type, other, path)),
        };
    }

    let Some(raw) = raw else {
        return recover(field, DecodeError::MissingField { key: path });
    };
    // skips inside a value that ends up replaced are not reported
    let mut scratch = DecodeReport::default();
    match decode_value(&field.value_type, raw, &path, &mut scratch) {
        Ok(value) => {
            report.absorb(scratch);
            Ok(Some(value))
        }
        Err(error) => recover(field, error),
    }
}

/// Apply the field's fallback rule to a failed decode.
fn recover(field: &FieldDescriptor, error: DecodeError) -> Result<Option<Value>, DecodeError> {
    if let DecodeError::Schema(_) = error {
        return Err(error);
    }
    if let Some(default) = &field.default_value {
        tracing::trace!(field = %field.name, %error, "substituted default");
        return Ok(Some(default.clone()));
    }
    if field.shape.is_optional() {
        tracing::trace!(field = %field.name, %error, "treated as absent");
        return Ok(None);
    }
    Err(error)
}

/// Schema errors are not element failures and still propagate.
fn decode_safe_elements(
    element: &ValueType,
    items: &[Value],
    path: &str,
    report: &mut DecodeReport,
) -> Result<Vec<Value>, DecodeError> {
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_path = index_path(path, index);
        let mut scratch = DecodeReport::default();
        match decode_value(element, item, &item_path, &mut scratch) {
            Ok(value) => {
                report.absorb(scratch);
                out.push(value);
            }
            Err(error @ DecodeError::Schema(_)) => return Err(error),
            Err(reason) => {
                tracing::debug!(path = %item_path, %reason, "skipped array element");
                report.skipped.push(SkippedElement { path: item_path, reason });
            }
        }
    }
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// VALUES
// ————————————————————————————————————————————————————————————————————————————

/// Strict decode of one value. Nested objects still apply their own field
/// policies, so safe arrays inside them keep skipping.
fn decode_value(
    value_type: &ValueType,
    value: &Value,
    path: &str,
    report: &mut DecodeReport,
) -> Result<Value, DecodeError> {
    match (value_type, value) {
        (ValueType::Bool, Value::Bool(_)) => Ok(value.clone()),
        (ValueType::Integer, Value::Number(n)) => {
            integral(n).ok_or_else(|| mismatch(value_type, value, path.to_string()))
        }
        (ValueType::Float, Value::Number(_)) => Ok(value.clone()),
        (ValueType::String, Value::String(_)) => Ok(value.clone()),
        (ValueType::Any, v) if !v.is_null() => Ok(value.clone()),
        (ValueType::Array(element), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| decode_value(element, item, &index_path(path, index), report))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ValueType::Dictionary(element), Value::Object(entries)) => entries
            .iter()
            .map(|(key, item)| {
                decode_value(element, item, &child_path(path, key), report).map(|v| (key.clone(), v))
            })
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        (ValueType::Object(nested), Value::Object(container)) => {
            let schema = nested.resolve()?;
            decode_fields(container, &schema, path, report).map(Instance::into_value)
        }
        (value_type, other) => Err(mismatch(value_type, other, path.to_string())),
    }
}

/// Integers, or floats with no fractional part that fit an `i64`.
pub(crate) fn integral(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

fn mismatch(value_type: &ValueType, value: &Value, key: String) -> DecodeError {
    DecodeError::TypeMismatch { expected: value_type.kind_name(), actual: value_kind(value), key }
}

pub(crate) fn child_path(base: &str, key: &str) -> String {
    if base.is_empty() { key.to_string() } else { format!("{base}.{key}") }
}

pub(crate) fn index_path(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

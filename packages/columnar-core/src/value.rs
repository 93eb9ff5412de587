//! Decoded cell values and the per-kind codec.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::schema::ColumnKind;

/// A decoded cell value. `Null` is the SQL-style missing value; every
/// column kind can hold it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String form used for search, the CONTAINS family, id matching,
    /// and mixed-kind comparison fallback.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// External JSON form, as returned in query responses.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Binary(bytes) => {
                JsonValue::Array(bytes.iter().map(|&b| JsonValue::from(b)).collect())
            }
        }
    }
}

/// Decodes an external JSON scalar into the native value for `kind`.
/// JSON null always decodes to `Value::Null`; anything that cannot be
/// coerced is a decode error and the caller sees the raw text.
pub fn decode(kind: ColumnKind, column: &str, raw: &JsonValue) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        ColumnKind::Integer => decode_integer(column, raw),
        ColumnKind::Double => decode_double(column, raw),
        ColumnKind::Boolean => decode_boolean(column, raw),
        ColumnKind::String => Ok(Value::String(json_text(raw))),
        ColumnKind::Binary => decode_binary(column, raw),
    }
}

fn decode_integer(column: &str, raw: &JsonValue) -> Result<Value> {
    if let Some(i) = raw.as_i64() {
        return i32::try_from(i)
            .map(Value::Integer)
            .map_err(|_| decode_error(ColumnKind::Integer, column, raw));
    }
    if let Some(s) = raw.as_str() {
        if let Ok(i) = s.trim().parse::<i32>() {
            return Ok(Value::Integer(i));
        }
    }
    Err(decode_error(ColumnKind::Integer, column, raw))
}

fn decode_double(column: &str, raw: &JsonValue) -> Result<Value> {
    if let Some(d) = raw.as_f64() {
        return Ok(Value::Double(d));
    }
    if let Some(s) = raw.as_str() {
        if let Ok(d) = s.trim().parse::<f64>() {
            return Ok(Value::Double(d));
        }
    }
    Err(decode_error(ColumnKind::Double, column, raw))
}

fn decode_boolean(column: &str, raw: &JsonValue) -> Result<Value> {
    if let Some(b) = raw.as_bool() {
        return Ok(Value::Boolean(b));
    }
    if let Some(s) = raw.as_str() {
        if s.eq_ignore_ascii_case("true") {
            return Ok(Value::Boolean(true));
        }
        if s.eq_ignore_ascii_case("false") {
            return Ok(Value::Boolean(false));
        }
    }
    Err(decode_error(ColumnKind::Boolean, column, raw))
}

fn decode_binary(column: &str, raw: &JsonValue) -> Result<Value> {
    let Some(items) = raw.as_array() else {
        return Err(decode_error(ColumnKind::Binary, column, raw));
    };
    let mut bytes = Vec::with_capacity(items.len());
    for item in items {
        match item.as_u64() {
            Some(b) if b <= u8::MAX as u64 => bytes.push(b as u8),
            _ => return Err(decode_error(ColumnKind::Binary, column, raw)),
        }
    }
    Ok(Value::Binary(bytes))
}

fn decode_error(kind: ColumnKind, column: &str, raw: &JsonValue) -> EngineError {
    EngineError::DecodeError {
        column: column.to_string(),
        kind,
        raw: raw.to_string(),
    }
}

/// String form of an external JSON scalar: strings verbatim, everything
/// else by its JSON text.
pub(crate) fn json_text(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compares a stored value with an external operand. Same-kind pairs
/// compare natively; mixed pairs fall back to a decimal parse of both
/// string forms, then to lexicographic order.
pub fn compare(cell: &Value, operand: &JsonValue) -> Ordering {
    match (cell, operand) {
        (Value::Integer(a), raw) if raw.is_i64() => {
            i64::from(*a).cmp(&raw.as_i64().unwrap_or_default())
        }
        (Value::Integer(a), raw) if raw.is_number() => {
            f64::from(*a).total_cmp(&raw.as_f64().unwrap_or_default())
        }
        (Value::Double(a), raw) if raw.is_number() => a.total_cmp(&raw.as_f64().unwrap_or_default()),
        (Value::Boolean(a), JsonValue::Bool(b)) => a.cmp(b),
        (Value::String(a), JsonValue::String(b)) => a.as_str().cmp(b.as_str()),
        _ => compare_text(&cell.to_text(), &json_text(operand)),
    }
}

/// Compares two stored values of the same column, for sorting.
pub fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Double(x), Value::Double(y)) => x.total_cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.cmp(y),
        _ => compare_text(&a.to_text(), &b.to_text()),
    }
}

/// Loose equality for the IN family: native when kinds line up, string
/// form otherwise.
pub fn loose_eq(cell: &Value, operand: &JsonValue) -> bool {
    match (cell, operand) {
        (Value::Integer(a), raw) if raw.is_i64() => i64::from(*a) == raw.as_i64().unwrap_or_default(),
        (Value::Double(a), raw) if raw.is_number() => *a == raw.as_f64().unwrap_or_default(),
        (Value::Boolean(a), JsonValue::Bool(b)) => a == b,
        (Value::String(a), JsonValue::String(b)) => a == b,
        _ => cell.to_text() == json_text(operand),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

//! Field extraction with string-to-number coercion
//!
//! The device is free to send numeric fields either as JSON numbers or as
//! numeric strings. These helpers accept both and report anything else as
//! a malformed response naming the offending key.

use serde_json::{Map, Value};

use apres_core::MAX_ATTENUATORS;

use crate::error::{ApresError, Result};

pub(crate) type Document = Map<String, Value>;

pub(crate) fn require<'a>(doc: &'a Document, key: &str) -> Result<&'a Value> {
    doc.get(key)
        .ok_or_else(|| ApresError::malformed(format!("No {} key in response.", key)))
}

fn invalid(key: &str, expected: &str, value: &Value) -> ApresError {
    ApresError::malformed(format!("{} should be {}, got {}", key, expected, value))
}

pub(crate) fn to_f64(key: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(key, "a number", value))
}

pub(crate) fn to_i64(key: &str, value: &Value) -> Result<i64> {
    let number = to_f64(key, value).map_err(|_| invalid(key, "an integer", value))?;
    if number.fract() != 0.0 {
        return Err(invalid(key, "an integer", value));
    }
    Ok(number as i64)
}

pub(crate) fn to_u32(key: &str, value: &Value) -> Result<u32> {
    u32::try_from(to_i64(key, value)?).map_err(|_| invalid(key, "a non-negative integer", value))
}

pub(crate) fn to_usize(key: &str, value: &Value) -> Result<usize> {
    usize::try_from(to_i64(key, value)?).map_err(|_| invalid(key, "a non-negative integer", value))
}

/// Attenuator count, bounded to what the hardware supports
pub(crate) fn to_attenuator_count(key: &str, value: &Value) -> Result<usize> {
    let count = to_usize(key, value)?;
    if !(1..=MAX_ATTENUATORS).contains(&count) {
        return Err(ApresError::malformed(format!(
            "{} must be between 1 and {}, got {}",
            key, MAX_ATTENUATORS, count
        )));
    }
    Ok(count)
}

pub(crate) fn to_i32(key: &str, value: &Value) -> Result<i32> {
    i32::try_from(to_i64(key, value)?).map_err(|_| invalid(key, "a 32-bit integer", value))
}

pub(crate) fn to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(invalid(key, "a string", value)),
    }
}

fn to_array<'a>(key: &str, value: &'a Value) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| invalid(key, "an array", value))
}

pub(crate) fn to_f64_vec(key: &str, value: &Value) -> Result<Vec<f64>> {
    to_array(key, value)?.iter().map(|v| to_f64(key, v)).collect()
}

pub(crate) fn to_i32_vec(key: &str, value: &Value) -> Result<Vec<i32>> {
    to_array(key, value)?.iter().map(|v| to_i32(key, v)).collect()
}

pub(crate) fn to_f64_rows(key: &str, value: &Value) -> Result<Vec<Vec<f64>>> {
    to_array(key, value)?
        .iter()
        .map(|row| to_f64_vec(key, row))
        .collect()
}

/// Antenna flags, sent as an array of 0/1 or as a CSV string
pub(crate) fn to_flags(key: &str, value: &Value) -> Result<Vec<u8>> {
    let flags: Vec<i64> = match value {
        Value::String(s) => s
            .split(',')
            .map(|part| to_i64(key, &Value::String(part.to_string())))
            .collect::<Result<_>>()?,
        _ => to_array(key, value)?
            .iter()
            .map(|v| to_i64(key, v))
            .collect::<Result<_>>()?,
    };
    flags
        .into_iter()
        .map(|flag| match flag {
            0 => Ok(0),
            1 => Ok(1),
            _ => Err(invalid(key, "a list of 1 or 0", value)),
        })
        .collect()
}

pub(crate) fn optional<T>(
    doc: &Document,
    key: &str,
    convert: impl Fn(&str, &Value) -> Result<T>,
) -> Result<Option<T>> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => convert(key, value).map(Some),
    }
}

//! SQL type definitions and mapping.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;

/// SQL data types a mapped column can declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    // Integer types
    TinyInt,
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,

    // Fixed precision
    Decimal { precision: u8, scale: u8 },

    // Boolean
    Boolean,

    // String types
    Char(u32),
    VarChar(u32),
    Text,

    // Binary types
    VarBinary(u32),
    Blob,

    // Date/time types
    Date,
    Time,
    DateTime,
    Timestamp,
    TimestampTz,

    // UUID
    Uuid,

    // JSON
    Json,

    // Custom type name
    Custom(&'static str),
}

impl SqlType {
    /// Convert a value read back from the database into this type's
    /// canonical `Value` representation.
    ///
    /// Drivers are free to widen integers (a 32-bit identity may come back
    /// as a 64-bit value, or as a decimal string), so the conversion
    /// narrows with a range check. NULL passes through unchanged.
    #[allow(clippy::result_large_err, clippy::cast_possible_truncation)]
    pub fn coerce(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |expected: &'static str| {
            Error::Type(TypeError {
                expected,
                actual: describe(value),
                column: None,
                rust_type: None,
            })
        };

        match self {
            SqlType::TinyInt => integer(value)
                .and_then(|v| i8::try_from(v).ok())
                .map(Value::TinyInt)
                .ok_or_else(|| mismatch("TINYINT")),
            SqlType::SmallInt => integer(value)
                .and_then(|v| i16::try_from(v).ok())
                .map(Value::SmallInt)
                .ok_or_else(|| mismatch("SMALLINT")),
            SqlType::Integer => integer(value)
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int)
                .ok_or_else(|| mismatch("INTEGER")),
            SqlType::BigInt => integer(value)
                .map(Value::BigInt)
                .ok_or_else(|| mismatch("BIGINT")),
            SqlType::Real => value
                .as_f64()
                .map(|v| Value::Float(v as f32))
                .ok_or_else(|| mismatch("REAL")),
            SqlType::Double => value
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| mismatch("DOUBLE")),
            SqlType::Decimal { .. } => match value {
                Value::Decimal(s) | Value::Text(s) => Ok(Value::Decimal(s.clone())),
                other => other
                    .as_i64()
                    .map(|v| Value::Decimal(v.to_string()))
                    .or_else(|| other.as_f64().map(|v| Value::Decimal(v.to_string())))
                    .ok_or_else(|| mismatch("DECIMAL")),
            },
            SqlType::Boolean => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| mismatch("BOOLEAN")),
            SqlType::Char(_) | SqlType::VarChar(_) | SqlType::Text => match value {
                Value::Text(s) | Value::Decimal(s) => Ok(Value::Text(s.clone())),
                _ => Err(mismatch("TEXT")),
            },
            SqlType::Uuid => match value {
                Value::Uuid(u) => Ok(Value::Uuid(*u)),
                Value::Bytes(b) if b.len() == 16 => {
                    let mut arr = [0u8; 16];
                    arr.copy_from_slice(b);
                    Ok(Value::Uuid(arr))
                }
                Value::Text(s) => parse_uuid(s).map(Value::Uuid).ok_or_else(|| mismatch("UUID")),
                _ => Err(mismatch("UUID")),
            },
            _ => Ok(value.clone()),
        }
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Decimal(s) | Value::Text(s) => s.trim().parse().ok(),
        Value::Bool(_) => None,
        other => other.as_i64(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Text(s) | Value::Decimal(s) => format!("{} '{}'", value.type_name(), s),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
            format!("{} {}", value.type_name(), value.as_i64().unwrap_or_default())
        }
        other => other.type_name().to_string(),
    }
}

/// Parse the canonical 36-character hyphenated UUID form (or bare hex).
fn parse_uuid(s: &str) -> Option<[u8; 16]> {
    let hex: String = s.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_narrows_integers() {
        assert_eq!(
            SqlType::Integer.coerce(&Value::BigInt(12)).unwrap(),
            Value::Int(12)
        );
        assert_eq!(
            SqlType::BigInt.coerce(&Value::Int(12)).unwrap(),
            Value::BigInt(12)
        );
        assert_eq!(
            SqlType::Integer.coerce(&Value::Decimal("41".into())).unwrap(),
            Value::Int(41)
        );
        assert!(SqlType::Integer.coerce(&Value::BigInt(i64::MAX)).is_err());
        assert!(SqlType::SmallInt.coerce(&Value::Text("abc".into())).is_err());
    }

    #[test]
    fn coerce_passes_null_through() {
        assert_eq!(SqlType::Integer.coerce(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn coerce_uuid_forms() {
        let text = Value::Text("00010203-0405-0607-0809-0a0b0c0d0e0f".into());
        let expected: [u8; 16] = std::array::from_fn(|i| i as u8);
        assert_eq!(SqlType::Uuid.coerce(&text).unwrap(), Value::Uuid(expected));
        assert!(SqlType::Uuid.coerce(&Value::Text("nope".into())).is_err());
    }

    #[test]
    fn coerce_error_mentions_value() {
        let err = SqlType::TinyInt.coerce(&Value::Int(1000)).unwrap_err();
        assert!(err.to_string().contains("INTEGER 1000"), "{}", err);
    }
}

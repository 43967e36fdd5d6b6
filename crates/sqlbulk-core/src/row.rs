//! Database row representation.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get all column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from a database query.
///
/// Column metadata is shared via `Arc` by every row of one result set.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get the shared column metadata.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    ///
    /// Falls back to a case-insensitive match, since some servers fold the
    /// case of names echoed back by a returning clause.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.index_of(name).or_else(|| {
            self.columns
                .names()
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
        });
        index.and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column index.
    #[allow(clippy::result_large_err)]
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!(
                    "index {} out of bounds (row has {} columns)",
                    index,
                    self.len()
                ),
                column: None,
                rust_type: None,
            })
        })?;
        T::from_value(value)
    }

    /// Get a typed value by column name.
    #[allow(clippy::result_large_err)]
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_by_name(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
                rust_type: None,
            })
        })?;
        decode_column(name, value)
    }

    /// Get all column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.names().iter().map(String::as_str)
    }

    /// Iterate over all values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
}

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    #[allow(clippy::result_large_err)]
    fn from_value(value: &Value) -> Result<Self>;
}

/// Convert `value` for the named column, attaching the column and the
/// target Rust type to any conversion error.
#[allow(clippy::result_large_err)]
pub fn decode_column<T: FromValue>(column: &str, value: &Value) -> Result<T> {
    T::from_value(value).map_err(|e| match e {
        Error::Type(mut te) => {
            te.column = Some(column.to_string());
            te.rust_type = Some(std::any::type_name::<T>());
            Error::Type(te)
        }
        e => e,
    })
}

fn type_error(expected: &'static str, actual: String) -> Error {
    Error::Type(TypeError {
        expected,
        actual,
        column: None,
        rust_type: None,
    })
}

/// Integer extraction with a range check, shared by every integer width.
#[allow(clippy::result_large_err)]
fn integer_from_value<T: TryFrom<i64>>(value: &Value, expected: &'static str) -> Result<T> {
    let v = value
        .as_i64()
        .ok_or_else(|| type_error(expected, value.type_name().to_string()))?;
    T::try_from(v).map_err(|_| type_error(expected, format!("value {} out of range", v)))
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| type_error("bool", value.type_name().to_string()))
    }
}

impl FromValue for i8 {
    fn from_value(value: &Value) -> Result<Self> {
        integer_from_value(value, "i8")
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> Result<Self> {
        integer_from_value(value, "i16")
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        integer_from_value(value, "i32")
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        integer_from_value(value, "i64")
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Result<Self> {
        integer_from_value(value, "u32")
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self> {
        integer_from_value(value, "u64")
    }
}

#[allow(clippy::cast_possible_truncation)]
impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            other => other
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| type_error("f32", other.type_name().to_string())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| type_error("f64", value.type_name().to_string()))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s.clone()),
            _ => Err(type_error("String", value.type_name().to_string())),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(type_error("Vec<u8>", value.type_name().to_string())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            Value::Text(s) => serde_json::from_str(s)
                .map_err(|e| type_error("valid JSON", format!("invalid JSON: {}", e))),
            _ => Err(type_error("JSON", value.type_name().to_string())),
        }
    }
}

impl FromValue for [u8; 16] {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Uuid(v) => Ok(*v),
            Value::Bytes(v) if v.len() == 16 => {
                let mut arr = [0u8; 16];
                arr.copy_from_slice(v);
                Ok(arr)
            }
            _ => Err(type_error("UUID (16 bytes)", value.type_name().to_string())),
        }
    }
}

//! In-memory tabular buffer handed to the bulk-copy channel.

use crate::Result;
use crate::dialect::Dialect;
use crate::error::{Error, TypeError};
use crate::value::Value;

/// A rectangular block of rows with named columns.
///
/// Every row is exactly as wide as the column list; missing values are
/// stored as `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableBuffer {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TableBuffer {
    /// Create an empty buffer with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create an empty buffer with room for `rows` rows.
    pub fn with_capacity(columns: Vec<String>, rows: usize) -> Self {
        Self {
            columns,
            rows: Vec::with_capacity(rows),
        }
    }

    /// Append one row.
    #[allow(clippy::result_large_err)]
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Type(TypeError {
                expected: "row as wide as the buffer's columns",
                actual: format!(
                    "{} values for {} columns",
                    row.len(),
                    self.columns.len()
                ),
                column: None,
                rust_type: None,
            }));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the buffer holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows per multi-row `INSERT ... VALUES` statement: at most
    /// `batch_size`, and never more bind parameters than the dialect allows.
    pub fn rows_per_statement(&self, dialect: Dialect, batch_size: usize) -> usize {
        let width = self.columns.len().max(1);
        let by_params = (dialect.max_params() / width).max(1);
        batch_size.max(1).min(by_params)
    }

    /// Build a parameterized multi-row insert for `row_count` rows of this
    /// buffer's shape.
    pub fn values_insert_sql(&self, dialect: Dialect, table: &str, row_count: usize) -> String {
        let width = self.columns.len();
        let columns = self
            .columns
            .iter()
            .map(|c| dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("INSERT INTO {} ({}) VALUES ", dialect.quote(table), columns);
        let mut param = 1;
        for row in 0..row_count {
            if row > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for col in 0..width {
                if col > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&dialect.placeholder(param));
                param += 1;
            }
            sql.push(')');
        }
        sql
    }
}

//! Model trait for mapping entities to tables.
//!
//! The `Model` trait is the compile-time replacement for runtime metadata
//! lookup: it names the target table, lists the persisted columns in a
//! pinned order, reads column values and writes generated keys back. It is
//! typically derived using `#[derive(Model)]` from `sqlbulk-macros`.

use crate::Result;
use crate::column::ColumnDefinition;
use crate::value::Value;

/// Trait for types that can be bulk-loaded into a database table.
///
/// # Example
///
/// ```ignore
/// use sqlbulk::Model;
///
/// #[derive(Model)]
/// #[bulk(table = "TodoItems")]
/// struct TodoItem {
///     #[bulk(primary_key, identity, column = "Id")]
///     id: i64,
///     #[bulk(column = "Name")]
///     name: Option<String>,
///     #[bulk(column = "IsComplete")]
///     is_complete: bool,
/// }
/// ```
pub trait Model: Sized + Send + Sync {
    /// The name of the database table. Empty means "not mapped".
    const TABLE_NAME: &'static str;

    /// Column metadata for every persisted field, in declared order.
    fn columns() -> &'static [ColumnDefinition];

    /// Read every persisted column of this instance as `(column, value)`.
    ///
    /// Absent optional values are `Value::Null`.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Write a value read back from the database into the named column's
    /// field, converting it to the field's Rust type.
    #[allow(clippy::result_large_err)]
    fn set_column(&mut self, column: &str, value: &Value) -> Result<()>;

    /// The value of one named column, if it is mapped.
    fn column_value(&self, column: &str) -> Option<Value> {
        self.to_row()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

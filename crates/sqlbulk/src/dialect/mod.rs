//! SQL generation for bulk operations, per database dialect.
//!
//! A [`BulkDialect`] turns column metadata into the statements a bulk
//! operation needs: create the staging table, apply one batch to the target,
//! drain that batch from staging, and drop the staging table. Updates also
//! look for repeated keys in staging before the first batch. Identifiers
//! are always quoted; entity values never appear in generated SQL.

mod postgres;
mod sqlite;
mod sqlserver;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use sqlbulk_core::{BulkErrorKind, ColumnDefinition, Dialect, Error, Result, SqlType};

use crate::staging::ROW_INDEX_COLUMN;

/// The statements run once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCommand {
    /// Moves up to one batch of staging rows, in `RowIndex` order, into the
    /// target table.
    pub apply: String,
    /// Deletes the same rows from staging. Its affected count drives loop
    /// termination.
    pub drain: String,
    /// `apply` yields one row of key values per inserted row.
    pub returns_keys: bool,
}

/// Inputs for an insert-from-staging batch.
#[derive(Debug, Clone, Copy)]
pub struct InsertBatch<'a> {
    pub target: &'a str,
    pub staging: &'a str,
    /// Columns copied from staging into the target.
    pub columns: &'a [ColumnDefinition],
    /// Generated key columns to read back. Empty when nothing is returned.
    pub returning: &'a [ColumnDefinition],
    /// Caller-supplied values are being written into identity columns.
    pub keep_identity: bool,
    pub batch_size: usize,
}

/// Inputs for an update-via-join batch.
#[derive(Debug, Clone, Copy)]
pub struct UpdateBatch<'a> {
    pub target: &'a str,
    pub staging: &'a str,
    /// Primary key columns used to match staging rows to target rows.
    pub keys: &'a [ColumnDefinition],
    /// Columns assigned from staging.
    pub set: &'a [ColumnDefinition],
    pub batch_size: usize,
}

/// Generates dialect-specific SQL for staging-table bulk operations.
///
/// Implement this to support a database the crate does not ship a
/// dialect for, and pass it to the `*_with_dialect` entry points.
pub trait BulkDialect: Send + Sync {
    /// The dialect name, for logging.
    fn name(&self) -> &'static str;

    /// Quote a table or column name.
    fn quote(&self, ident: &str) -> String;

    /// Storage type for a staging column of `sql_type`.
    fn type_name(&self, sql_type: &SqlType) -> String;

    /// Storage type for `column`; an explicit type override is used verbatim.
    fn column_type(&self, column: &ColumnDefinition) -> String {
        column
            .sql_type_override
            .map_or_else(|| self.type_name(&column.sql_type), str::to_string)
    }

    /// `CREATE TABLE` for a staging table holding `columns` plus `RowIndex`.
    fn create_staging(&self, staging: &str, columns: &[ColumnDefinition]) -> String {
        let mut defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", self.quote(c.name), self.column_type(c)))
            .collect();
        defs.push(format!(
            "{} {}",
            self.quote(ROW_INDEX_COLUMN),
            self.type_name(&SqlType::BigInt)
        ));
        format!("CREATE TABLE {} ({})", self.quote(staging), defs.join(", "))
    }

    /// Key values that occur on more than one staging row.
    fn duplicate_keys(&self, staging: &str, keys: &[ColumnDefinition]) -> String {
        let keys = keys
            .iter()
            .map(|k| self.quote(k.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {keys} FROM {} GROUP BY {keys} HAVING COUNT(*) > 1",
            self.quote(staging)
        )
    }

    fn drop_staging(&self, staging: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote(staging))
    }

    fn insert_batch(&self, batch: &InsertBatch<'_>) -> BatchCommand;

    fn update_batch(&self, batch: &UpdateBatch<'_>) -> BatchCommand;
}

/// The built-in dialect for a connection.
///
/// MySQL has no clause that returns generated keys from a set-based insert,
/// so it is rejected rather than half-supported.
#[allow(clippy::result_large_err)]
pub fn dialect_for(dialect: Dialect) -> Result<&'static dyn BulkDialect> {
    match dialect {
        Dialect::SqlServer => Ok(&SqlServerDialect),
        Dialect::Postgres => Ok(&PostgresDialect),
        Dialect::Sqlite => Ok(&SqliteDialect),
        Dialect::Mysql => Err(Error::bulk(
            BulkErrorKind::UnsupportedDialect,
            format!("no bulk command generator for {dialect}"),
        )),
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Comma-separated quoted column names.
fn column_list(d: &dyn BulkDialect, columns: &[ColumnDefinition]) -> String {
    columns
        .iter()
        .map(|c| d.quote(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `left."k1" = right."k1" AND ...` over the key columns.
fn key_match(d: &dyn BulkDialect, left: &str, right: &str, keys: &[ColumnDefinition]) -> String {
    keys.iter()
        .map(|k| {
            let col = d.quote(k.name);
            format!("{left}.{col} = {right}.{col}")
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// The next batch of staging rows for dialects with `LIMIT`.
fn limit_batch(d: &dyn BulkDialect, staging: &str, batch_size: usize) -> String {
    format!(
        "SELECT * FROM {} ORDER BY {} LIMIT {}",
        d.quote(staging),
        d.quote(ROW_INDEX_COLUMN),
        batch_size
    )
}

/// Insert-from-staging for dialects with `LIMIT` and `RETURNING`.
///
/// `overriding` is spliced between the column list and the `SELECT`.
fn limit_insert(d: &dyn BulkDialect, batch: &InsertBatch<'_>, overriding: Option<&str>) -> String {
    let columns = column_list(d, batch.columns);
    let mut sql = format!("INSERT INTO {} ({})", d.quote(batch.target), columns);
    if let Some(clause) = overriding {
        sql.push(' ');
        sql.push_str(clause);
    }
    sql.push_str(&format!(
        " SELECT {} FROM ({}) AS source ORDER BY source.{}",
        batch
            .columns
            .iter()
            .map(|c| format!("source.{}", d.quote(c.name)))
            .collect::<Vec<_>>()
            .join(", "),
        limit_batch(d, batch.staging, batch.batch_size),
        d.quote(ROW_INDEX_COLUMN)
    ));
    if !batch.returning.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(d, batch.returning));
    }
    sql
}

/// Update-via-join for dialects with `UPDATE ... FROM`.
fn limit_update(d: &dyn BulkDialect, batch: &UpdateBatch<'_>) -> String {
    let assignments = batch
        .set
        .iter()
        .map(|c| {
            let col = d.quote(c.name);
            format!("{col} = source.{col}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} AS target SET {} FROM ({}) AS source WHERE {}",
        d.quote(batch.target),
        assignments,
        limit_batch(d, batch.staging, batch.batch_size),
        key_match(d, "target", "source", batch.keys)
    )
}

/// Delete the first `batch_size` staging rows by `RowIndex`.
fn limit_drain(d: &dyn BulkDialect, staging: &str, batch_size: usize) -> String {
    let table = d.quote(staging);
    let order = d.quote(ROW_INDEX_COLUMN);
    format!(
        "DELETE FROM {table} WHERE {order} IN (SELECT {order} FROM {table} ORDER BY {order} LIMIT {batch_size})"
    )
}

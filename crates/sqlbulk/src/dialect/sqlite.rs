//! SQLite bulk dialect.
//!
//! Needs SQLite 3.35 or newer for `RETURNING` and `UPDATE ... FROM`.

use super::{
    BatchCommand, BulkDialect, InsertBatch, UpdateBatch, limit_drain, limit_insert, limit_update,
};
use sqlbulk_core::{SqlType, quote_ident};

/// Bulk dialect for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl BulkDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote(&self, ident: &str) -> String {
        quote_ident(ident)
    }

    /// Staging columns use the storage class each value binds as.
    fn type_name(&self, sql_type: &SqlType) -> String {
        let name = match sql_type {
            SqlType::TinyInt
            | SqlType::SmallInt
            | SqlType::Integer
            | SqlType::BigInt
            | SqlType::Boolean => "INTEGER",
            SqlType::Real | SqlType::Double => "REAL",
            SqlType::Decimal { .. } => "NUMERIC",
            SqlType::Char(_)
            | SqlType::VarChar(_)
            | SqlType::Text
            | SqlType::Date
            | SqlType::Time
            | SqlType::DateTime
            | SqlType::Timestamp
            | SqlType::TimestampTz
            | SqlType::Json => "TEXT",
            SqlType::VarBinary(_) | SqlType::Blob | SqlType::Uuid => "BLOB",
            SqlType::Custom(name) => *name,
        };
        name.to_string()
    }

    fn insert_batch(&self, batch: &InsertBatch<'_>) -> BatchCommand {
        BatchCommand {
            apply: limit_insert(self, batch, None),
            drain: limit_drain(self, batch.staging, batch.batch_size),
            returns_keys: !batch.returning.is_empty(),
        }
    }

    fn update_batch(&self, batch: &UpdateBatch<'_>) -> BatchCommand {
        BatchCommand {
            apply: limit_update(self, batch),
            drain: limit_drain(self, batch.staging, batch.batch_size),
            returns_keys: false,
        }
    }
}

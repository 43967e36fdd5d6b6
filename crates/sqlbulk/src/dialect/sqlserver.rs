//! SQL Server bulk dialect.
//!
//! Batches are selected with `TOP (n) ... ORDER BY [RowIndex]`, generated
//! keys are captured with `OUTPUT INSERTED ... INTO` a table variable and
//! read back from it, and updates join the target to the batch with
//! `UPDATE ... FROM`.

use super::{BatchCommand, BulkDialect, InsertBatch, UpdateBatch, column_list, key_match};
use crate::staging::ROW_INDEX_COLUMN;
use sqlbulk_core::{SqlType, quote_ident_mssql};

/// Bulk dialect for SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// The next batch of staging rows.
    fn top_batch(&self, staging: &str, batch_size: usize) -> String {
        format!(
            "SELECT TOP ({}) * FROM {} ORDER BY {}",
            batch_size,
            self.quote(staging),
            self.quote(ROW_INDEX_COLUMN)
        )
    }
}

impl BulkDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote(&self, ident: &str) -> String {
        quote_ident_mssql(ident)
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            // TINYINT is unsigned on SQL Server.
            SqlType::TinyInt | SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "FLOAT".to_string(),
            SqlType::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
            SqlType::Boolean => "BIT".to_string(),
            SqlType::Char(len) => format!("NCHAR({len})"),
            SqlType::VarChar(len) if *len <= 4000 => format!("NVARCHAR({len})"),
            SqlType::VarChar(_) | SqlType::Text | SqlType::Json => "NVARCHAR(MAX)".to_string(),
            SqlType::VarBinary(len) if *len <= 8000 => format!("VARBINARY({len})"),
            SqlType::VarBinary(_) | SqlType::Blob => "VARBINARY(MAX)".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::DateTime | SqlType::Timestamp => "DATETIME2".to_string(),
            SqlType::TimestampTz => "DATETIMEOFFSET".to_string(),
            SqlType::Uuid => "UNIQUEIDENTIFIER".to_string(),
            SqlType::Custom(name) => (*name).to_string(),
        }
    }

    fn insert_batch(&self, batch: &InsertBatch<'_>) -> BatchCommand {
        let target = self.quote(batch.target);
        let columns = column_list(self, batch.columns);
        let select = format!(
            "SELECT TOP ({}) {} FROM {} ORDER BY {}",
            batch.batch_size,
            columns,
            self.quote(batch.staging),
            self.quote(ROW_INDEX_COLUMN)
        );

        let apply = if batch.returning.is_empty() {
            format!("INSERT INTO {target} ({columns}) {select}")
        } else {
            // A bare OUTPUT clause is rejected on tables with enabled triggers.
            let keys = column_list(self, batch.returning);
            let key_defs = batch
                .returning
                .iter()
                .map(|k| format!("{} {}", self.quote(k.name), self.column_type(k)))
                .collect::<Vec<_>>()
                .join(", ");
            let inserted = batch
                .returning
                .iter()
                .map(|k| format!("INSERTED.{}", self.quote(k.name)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "DECLARE @keys TABLE ({key_defs}); \
                 INSERT INTO {target} ({columns}) OUTPUT {inserted} INTO @keys ({keys}) {select}; \
                 SELECT {keys} FROM @keys"
            )
        };
        let apply = if batch.keep_identity {
            format!("SET IDENTITY_INSERT {target} ON; {apply}; SET IDENTITY_INSERT {target} OFF")
        } else {
            apply
        };

        BatchCommand {
            apply,
            drain: format!(
                "WITH batch AS ({}) DELETE FROM batch",
                self.top_batch(batch.staging, batch.batch_size)
            ),
            returns_keys: !batch.returning.is_empty(),
        }
    }

    fn update_batch(&self, batch: &UpdateBatch<'_>) -> BatchCommand {
        let assignments = batch
            .set
            .iter()
            .map(|c| {
                let col = self.quote(c.name);
                format!("target.{col} = source.{col}")
            })
            .collect::<Vec<_>>()
            .join(", ");

        BatchCommand {
            apply: format!(
                "UPDATE target SET {} FROM {} AS target INNER JOIN ({}) AS source ON {}",
                assignments,
                self.quote(batch.target),
                self.top_batch(batch.staging, batch.batch_size),
                key_match(self, "target", "source", batch.keys)
            ),
            drain: format!(
                "WITH batch AS ({}) DELETE FROM batch",
                self.top_batch(batch.staging, batch.batch_size)
            ),
            returns_keys: false,
        }
    }
}

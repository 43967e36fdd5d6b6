//! PostgreSQL bulk dialect.

use super::{
    BatchCommand, BulkDialect, InsertBatch, UpdateBatch, limit_drain, limit_insert, limit_update,
};
use sqlbulk_core::{SqlType, quote_ident};

/// Bulk dialect for PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl BulkDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote(&self, ident: &str) -> String {
        quote_ident(ident)
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::TinyInt | SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal { precision, scale } => format!("NUMERIC({precision}, {scale})"),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Char(len) => format!("CHAR({len})"),
            SqlType::VarChar(len) => format!("VARCHAR({len})"),
            SqlType::Text => "TEXT".to_string(),
            SqlType::VarBinary(_) | SqlType::Blob => "BYTEA".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::DateTime | SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMPTZ".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Json => "JSONB".to_string(),
            SqlType::Custom(name) => (*name).to_string(),
        }
    }

    fn insert_batch(&self, batch: &InsertBatch<'_>) -> BatchCommand {
        // GENERATED ALWAYS identities refuse explicit values without this.
        let overriding = batch.keep_identity.then_some("OVERRIDING SYSTEM VALUE");
        BatchCommand {
            apply: limit_insert(self, batch, overriding),
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::ColumnDefinition;

    #[test]
    fn test_insert_returning() {
        let cols = [ColumnDefinition::new("name", "Name", SqlType::Text)];
        let keys = [ColumnDefinition::new("id", "Id", SqlType::BigInt)
            .primary_key(true)
            .generated(true)];
        let cmd = PostgresDialect.insert_batch(&InsertBatch {
            target: "TodoItems",
            staging: "Temp_abc",
            columns: &cols,
            returning: &keys,
            keep_identity: false,
            batch_size: 2,
        });
        assert_eq!(
            cmd.apply,
            "INSERT INTO \"TodoItems\" (\"Name\") SELECT source.\"Name\" FROM \
             (SELECT * FROM \"Temp_abc\" ORDER BY \"RowIndex\" LIMIT 2) AS source \
             ORDER BY source.\"RowIndex\" RETURNING \"Id\""
        );
        assert_eq!(
            cmd.drain,
            "DELETE FROM \"Temp_abc\" WHERE \"RowIndex\" IN \
             (SELECT \"RowIndex\" FROM \"Temp_abc\" ORDER BY \"RowIndex\" LIMIT 2)"
        );
        assert!(cmd.returns_keys);
    }

    #[test]
    fn test_insert_overriding_identity() {
        let cols = [
            ColumnDefinition::new("id", "Id", SqlType::BigInt)
                .primary_key(true)
                .generated(true),
            ColumnDefinition::new("name", "Name", SqlType::Text),
        ];
        let cmd = PostgresDialect.insert_batch(&InsertBatch {
            target: "TodoItems",
            staging: "Temp_abc",
            columns: &cols,
            returning: &[],
            keep_identity: true,
            batch_size: 10,
        });
        assert!(
            cmd.apply
                .starts_with("INSERT INTO \"TodoItems\" (\"Id\", \"Name\") OVERRIDING SYSTEM VALUE SELECT")
        );
        assert!(!cmd.apply.contains("RETURNING"));
    }

    #[test]
    fn test_update_from() {
        let keys = [ColumnDefinition::new("id", "Id", SqlType::BigInt).primary_key(true)];
        let set = [ColumnDefinition::new("name", "Name", SqlType::Text)];
        let cmd = PostgresDialect.update_batch(&UpdateBatch {
            target: "TodoItems",
            staging: "Temp_abc",
            keys: &keys,
            set: &set,
            batch_size: 100,
        });
        assert_eq!(
            cmd.apply,
            "UPDATE \"TodoItems\" AS target SET \"Name\" = source.\"Name\" FROM \
             (SELECT * FROM \"Temp_abc\" ORDER BY \"RowIndex\" LIMIT 100) AS source \
             WHERE target.\"Id\" = source.\"Id\""
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(PostgresDialect.type_name(&SqlType::Json), "JSONB");
        assert_eq!(PostgresDialect.type_name(&SqlType::Blob), "BYTEA");
        assert_eq!(
            PostgresDialect.type_name(&SqlType::Decimal {
                precision: 10,
                scale: 2
            }),
            "NUMERIC(10, 2)"
        );
    }
}

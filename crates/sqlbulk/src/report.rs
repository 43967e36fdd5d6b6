//! Results of bulk operations.

use serde::Serialize;
use sqlbulk_core::{BulkError, BulkErrorKind, BulkProgress, Error, Model, Result, Value};

/// Why an operation issued no statements at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The input slice was empty.
    NoEntities,
    /// Every column is computed or database-generated.
    NoInsertableColumns,
    /// The entity has no primary key to match rows on.
    NoPrimaryKey,
    /// Nothing is left to assign once keys and excluded columns are removed.
    NoUpdatableColumns,
}

/// Key values the database assigned to one inserted entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedKey {
    /// 0-based position of the entity in the input slice.
    pub index: usize,
    /// Key column name and value, converted to the column's declared type.
    pub values: Vec<(String, Value)>,
}

impl GeneratedKey {
    /// Value of one key column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The key value when the key has exactly one column.
    pub fn single(&self) -> Option<&Value> {
        match self.values.as_slice() {
            [(_, value)] => Some(value),
            _ => None,
        }
    }
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsertReport {
    pub rows_inserted: u64,
    /// Apply statements executed.
    pub batches: usize,
    /// Name of the staging table used, if one was created.
    pub staging_table: Option<String>,
    /// Generated keys in input order. Empty unless the table has
    /// database-generated keys and identity values were not preserved.
    pub keys: Vec<GeneratedKey>,
    pub skipped: Option<SkipReason>,
}

impl InsertReport {
    pub(crate) fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// True when the operation issued no statements.
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    fn progress(&self) -> BulkProgress {
        BulkProgress {
            batches: self.batches,
            rows: self.rows_inserted,
        }
    }

    /// Write the generated keys onto `entities`, which must be the slice
    /// that was inserted. Returns the number of entities updated.
    #[allow(clippy::result_large_err)]
    pub fn apply_keys<M: Model>(&self, entities: &mut [M]) -> Result<usize> {
        let len = entities.len();
        for key in &self.keys {
            let Some(entity) = entities.get_mut(key.index) else {
                return Err(BulkError::new(
                    BulkErrorKind::KeyCountMismatch,
                    format!(
                        "generated key for entity {} but only {} entities were given",
                        key.index, len
                    ),
                )
                .with_progress(self.progress())
                .into());
            };

            for (column, value) in &key.values {
                entity.set_column(column, value).map_err(|e| match e {
                    Error::Type(te) => BulkError::new(
                        BulkErrorKind::KeyConversion,
                        format!("cannot assign generated key to entity {}: {}", key.index, te),
                    )
                    .with_progress(self.progress())
                    .into(),
                    other => other,
                })?;
            }
        }
        Ok(self.keys.len())
    }
}

/// Outcome of a bulk update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Target rows changed, as counted by the database.
    pub rows_updated: u64,
    /// Staged rows whose key matched no target row.
    pub not_matched: u64,
    pub batches: usize,
    pub staging_table: Option<String>,
    pub skipped: Option<SkipReason>,
}

impl UpdateReport {
    pub(crate) fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::{ColumnDefinition, FromValue, SqlType};

    #[derive(Debug, Default)]
    struct Item {
        id: i32,
    }

    impl Model for Item {
        const TABLE_NAME: &'static str = "Items";

        fn columns() -> &'static [ColumnDefinition] {
            static COLUMNS: [ColumnDefinition; 1] = [ColumnDefinition::new(
                "id",
                "Id",
                SqlType::Integer,
            )
            .primary_key(true)
            .generated(true)];
            &COLUMNS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("Id", Value::Int(self.id))]
        }

        fn set_column(&mut self, column: &str, value: &Value) -> Result<()> {
            assert_eq!(column, "Id");
            self.id = sqlbulk_core::decode_column(column, value)?;
            Ok(())
        }
    }

    fn key(index: usize, value: Value) -> GeneratedKey {
        GeneratedKey {
            index,
            values: vec![("Id".to_string(), value)],
        }
    }

    fn report(keys: Vec<GeneratedKey>) -> InsertReport {
        InsertReport {
            rows_inserted: keys.len() as u64,
            batches: 1,
            staging_table: Some("Temp_x".to_string()),
            keys,
            skipped: None,
        }
    }

    #[test]
    fn test_apply_keys_in_order() {
        let mut items = vec![Item::default(), Item::default()];
        let report = report(vec![key(0, Value::Int(7)), key(1, Value::Int(8))]);
        assert_eq!(report.apply_keys(&mut items).unwrap(), 2);
        assert_eq!(items[0].id, 7);
        assert_eq!(items[1].id, 8);
    }

    #[test]
    fn test_apply_keys_out_of_range() {
        let mut items = vec![Item::default()];
        let report = report(vec![key(0, Value::Int(1)), key(1, Value::Int(2))]);
        let err = report.apply_keys(&mut items).unwrap_err();
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::KeyCountMismatch));
    }

    #[test]
    fn test_apply_keys_conversion_failure() {
        let mut items = vec![Item::default()];
        let report = report(vec![key(0, Value::Text("x".into()))]);
        match report.apply_keys(&mut items).unwrap_err() {
            Error::Bulk(e) => {
                assert_eq!(e.kind, BulkErrorKind::KeyConversion);
                assert_eq!(e.progress.rows, 1);
            }
            other => panic!("expected bulk error, got {other:?}"),
        }
    }

    #[test]
    fn test_generated_key_accessors() {
        let k = key(3, Value::BigInt(42));
        assert_eq!(k.single(), Some(&Value::BigInt(42)));
        assert_eq!(k.value("Id"), Some(&Value::BigInt(42)));
        assert_eq!(k.value("Other"), None);
        assert_eq!(i64::from_value(k.single().unwrap()).unwrap(), 42);

        let composite = GeneratedKey {
            index: 0,
            values: vec![
                ("A".to_string(), Value::Int(1)),
                ("B".to_string(), Value::Int(2)),
            ],
        };
        assert_eq!(composite.single(), None);
    }

    #[test]
    fn test_reports_serialize() {
        let report = UpdateReport {
            rows_updated: 3,
            not_matched: 1,
            batches: 1,
            staging_table: Some("Temp_x".to_string()),
            skipped: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rows_updated"], 3);
        assert_eq!(json["not_matched"], 1);

        let skipped = serde_json::to_value(InsertReport::skipped(SkipReason::NoEntities)).unwrap();
        assert_eq!(skipped["skipped"], "NoEntities");
    }
}

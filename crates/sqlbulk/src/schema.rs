//! Column metadata for an entity type.
//!
//! Everything here reads the compile-time table produced by
//! `#[derive(Model)]`; no database round-trip is involved.

use sqlbulk_core::{BulkErrorKind, ColumnDefinition, Error, Model, Result, validate_identifier};

use crate::staging::ROW_INDEX_COLUMN;

/// Persisted columns of `M` in declared field order.
///
/// Fails with `UnmappedEntity` when `M` has no table or no columns, and with
/// `InvalidIdentifier` when a name cannot be quoted or collides with the
/// staging order column.
#[allow(clippy::result_large_err)]
pub fn columns<M: Model>() -> Result<Vec<ColumnDefinition>> {
    let table = M::TABLE_NAME;
    let columns = M::columns();

    if table.is_empty() || columns.is_empty() {
        return Err(Error::bulk(
            BulkErrorKind::UnmappedEntity,
            format!(
                "type {} has no table mapping",
                std::any::type_name::<M>()
            ),
        ));
    }

    validate_identifier(table, "table")?;
    for column in columns {
        validate_identifier(column.name, "column")?;
        if column.name.eq_ignore_ascii_case(ROW_INDEX_COLUMN) {
            return Err(Error::bulk(
                BulkErrorKind::InvalidIdentifier,
                format!(
                    "column {:?} of table {:?} collides with the staging order column",
                    column.name, table
                ),
            ));
        }
    }

    Ok(columns.to_vec())
}

/// Columns written by an insert.
///
/// Computed columns never are. Generated keys are written only when the
/// caller preserves identity values.
pub fn insert_columns(columns: &[ColumnDefinition], keep_identity: bool) -> Vec<ColumnDefinition> {
    columns
        .iter()
        .filter(|c| {
            (c.is_writable() && !c.generated) || (keep_identity && c.is_generated_key())
        })
        .cloned()
        .collect()
}

/// Columns carried by an update's staging table: everything writable.
pub fn update_columns(columns: &[ColumnDefinition]) -> Vec<ColumnDefinition> {
    columns.iter().filter(|c| c.is_writable()).cloned().collect()
}

/// Primary-key columns the database assigns on insert.
pub fn generated_keys(columns: &[ColumnDefinition]) -> Vec<ColumnDefinition> {
    columns
        .iter()
        .filter(|c| c.is_generated_key())
        .cloned()
        .collect()
}

pub fn primary_keys(columns: &[ColumnDefinition]) -> Vec<ColumnDefinition> {
    columns.iter().filter(|c| c.primary_key).cloned().collect()
}

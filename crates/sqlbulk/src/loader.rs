//! Moving entities into a staging table.

use sqlbulk_core::{ColumnDefinition, Connection, Cx, Error, Model, Outcome, Result, TableBuffer, Value};

use crate::staging::{ROW_INDEX_COLUMN, StagingTable};

/// Tabulate `entities` for the staging table.
///
/// One column per entry of `columns`, by name, then `RowIndex` holding each
/// entity's 1-based position. A column the entity does not report becomes
/// NULL.
#[allow(clippy::result_large_err)]
pub fn build_buffer<M: Model>(entities: &[M], columns: &[ColumnDefinition]) -> Result<TableBuffer> {
    let mut names: Vec<String> = columns.iter().map(|c| c.name.to_string()).collect();
    names.push(ROW_INDEX_COLUMN.to_string());

    let mut buffer = TableBuffer::with_capacity(names, entities.len());
    for (position, entity) in (1_i64..).zip(entities) {
        let mut values = entity.to_row();
        let mut row: Vec<Value> = columns
            .iter()
            .map(|c| {
                values
                    .iter_mut()
                    .find(|(name, _)| *name == c.name)
                    .map_or(Value::Null, |(_, value)| std::mem::replace(value, Value::Null))
            })
            .collect();
        row.push(Value::BigInt(position));
        buffer.push_row(row)?;
    }
    Ok(buffer)
}

/// Copy `buffer` into the staging table through the connection's bulk-copy
/// channel, `batch_size` rows per chunk.
pub async fn load<C: Connection>(
    cx: &Cx,
    conn: &C,
    staging: &StagingTable,
    buffer: &TableBuffer,
    batch_size: usize,
) -> Outcome<u64, Error> {
    match conn.bulk_copy(cx, staging.name(), buffer, batch_size).await {
        Outcome::Ok(copied) => {
            tracing::debug!(
                staging = %staging.name(),
                rows = copied,
                batch_size,
                "Staging table loaded"
            );
            Outcome::Ok(copied)
        }
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled(r) => Outcome::Cancelled(r),
        Outcome::Panicked(p) => Outcome::Panicked(p),
    }
}

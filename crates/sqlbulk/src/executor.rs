//! The batch loop: apply, drain, repeat until staging is empty.

use sqlbulk_core::{
    BulkError, BulkErrorKind, BulkProgress, ColumnDefinition, Connection, Cx, Error, Outcome, Row,
    Value,
};

use crate::dialect::BatchCommand;
use crate::report::GeneratedKey;

/// Totals accumulated over every batch of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchTotals {
    /// Batches that moved at least one staging row.
    pub batches: usize,
    /// Rows the apply statements reported as affected.
    pub affected: u64,
    /// Rows removed from staging.
    pub drained: u64,
    /// Generated keys, in input order.
    pub keys: Vec<GeneratedKey>,
}

impl BatchTotals {
    fn progress_with(&self, rows: u64) -> BulkProgress {
        BulkProgress {
            batches: self.batches + 1,
            rows: self.affected + rows,
        }
    }
}

/// Run `command` until its drain statement removes nothing.
///
/// When the command returns keys, each returned row is paired with the next
/// entity in input order and its values are converted to the declared type
/// of `key_columns`. `entity_count` bounds how many keys may come back.
///
/// Cancellation is checked before each batch, never inside one.
#[tracing::instrument(level = "debug", skip(cx, conn, command, key_columns))]
pub async fn run_batches<C: Connection>(
    cx: &Cx,
    conn: &C,
    command: &BatchCommand,
    key_columns: &[ColumnDefinition],
    entity_count: usize,
) -> Outcome<BatchTotals, Error> {
    let mut totals = BatchTotals::default();

    loop {
        if let Some(reason) = cx.cancel_reason() {
            tracing::debug!(batches = totals.batches, "Bulk batches cancelled");
            return Outcome::Cancelled(reason);
        }

        tracing::trace!(sql = %command.apply, "Applying batch");
        let (affected, key_rows) = if command.returns_keys {
            match conn.query(cx, &command.apply, &[]).await {
                Outcome::Ok(rows) => (rows.len() as u64, Some(rows)),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        } else {
            match conn.execute(cx, &command.apply, &[]).await {
                Outcome::Ok(n) => (n, None),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        };

        tracing::trace!(sql = %command.drain, "Draining batch");
        let drained = match conn.execute(cx, &command.drain, &[]).await {
            Outcome::Ok(n) => n,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        if let Some(rows) = key_rows {
            if rows.len() as u64 != drained {
                return Outcome::Err(
                    BulkError::new(
                        BulkErrorKind::KeyCountMismatch,
                        format!(
                            "batch returned {} generated keys for {} staged rows",
                            rows.len(),
                            drained
                        ),
                    )
                    .with_progress(totals.progress_with(affected))
                    .into(),
                );
            }
            if let Err(e) = resolve_keys(&rows, key_columns, entity_count, &mut totals) {
                return Outcome::Err(e.with_progress(totals.progress_with(affected)).into());
            }
        }

        if drained == 0 {
            break;
        }

        totals.batches += 1;
        totals.affected += affected;
        totals.drained += drained;
        tracing::debug!(
            batch = totals.batches,
            affected,
            drained,
            "Bulk batch complete"
        );
    }

    Outcome::Ok(totals)
}

/// Fail with `DuplicateKey` when `sql`, a [`duplicate_keys`] query, finds
/// any key shared by two staged rows.
///
/// The update join would apply only one of them, chosen by the database.
///
/// [`duplicate_keys`]: crate::BulkDialect::duplicate_keys
pub async fn ensure_unique_keys<C: Connection>(
    cx: &Cx,
    conn: &C,
    sql: &str,
) -> Outcome<(), Error> {
    tracing::trace!(sql = %sql, "Checking staged keys");
    let repeated = match conn.query(cx, sql, &[]).await {
        Outcome::Ok(rows) => rows,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };
    match repeated.first() {
        None => Outcome::Ok(()),
        Some(row) => Outcome::Err(Error::bulk(
            BulkErrorKind::DuplicateKey,
            format!(
                "{} primary key values occur more than once in the input, e.g. {:?}",
                repeated.len(),
                row.values().collect::<Vec<_>>()
            ),
        )),
    }
}

/// Pair returned key rows with the entities after those already keyed.
///
/// A single integer key is matched by value: identity values are handed out
/// in the insert's `ORDER BY`, while the order of the returned rows is not
/// guaranteed. Composite and non-integer keys are matched by row position.
fn resolve_keys(
    rows: &[Row],
    key_columns: &[ColumnDefinition],
    entity_count: usize,
    totals: &mut BatchTotals,
) -> Result<(), BulkError> {
    let cursor = totals.keys.len();
    if cursor + rows.len() > entity_count {
        return Err(BulkError::new(
            BulkErrorKind::KeyCountMismatch,
            format!(
                "{} generated keys returned for {} entities",
                cursor + rows.len(),
                entity_count
            ),
        ));
    }

    let mut converted = Vec::with_capacity(rows.len());
    for (offset, row) in rows.iter().enumerate() {
        let mut values = Vec::with_capacity(key_columns.len());
        for (position, column) in key_columns.iter().enumerate() {
            let raw = row.get_by_name(column.name).or_else(|| row.get(position));
            let Some(raw) = raw else {
                return Err(BulkError::new(
                    BulkErrorKind::KeyConversion,
                    format!("returned key row {offset} has no value for key {:?}", column.name),
                ));
            };
            let value = column.sql_type.coerce(raw).map_err(|e| {
                BulkError::new(
                    BulkErrorKind::KeyConversion,
                    format!("key {:?} in returned row {}: {}", column.name, offset, e),
                )
            })?;
            values.push((column.name.to_string(), value));
        }
        converted.push(values);
    }
    order_by_identity(&mut converted);

    totals.keys.extend(
        converted
            .into_iter()
            .enumerate()
            .map(|(offset, values)| GeneratedKey {
                index: cursor + offset,
                values,
            }),
    );
    Ok(())
}

fn identity_value(values: &[(String, Value)]) -> Option<i64> {
    match values {
        [(_, Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_))] => {
            values[0].1.as_i64()
        }
        _ => None,
    }
}

/// Sort single integer keys ascending; anything else keeps its row order.
fn order_by_identity(keys: &mut [Vec<(String, Value)>]) {
    if keys.iter().all(|k| identity_value(k).is_some()) {
        keys.sort_by_key(|k| identity_value(k));
    }
}

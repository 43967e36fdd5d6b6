//! sqlbulk - bulk insert and update through staging tables.
//!
//! Row-by-row statements are slow for large batches, and a plain bulk copy
//! cannot hand back the keys the database generates. sqlbulk does both:
//!
//! 1. create a uniquely named staging table,
//! 2. stream the entities into it over the connection's bulk-copy channel,
//!    tagging each row with its input position (`RowIndex`),
//! 3. move the rows into the target in ordered batches, reading generated
//!    keys back and pairing them with the input by position,
//! 4. drop the staging table, whatever happened before.
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlbulk::prelude::*;
//!
//! #[derive(Model, Debug)]
//! #[bulk(table = "TodoItems")]
//! struct TodoItem {
//!     #[bulk(primary_key, identity, column = "Id")]
//!     id: i64,
//!     #[bulk(column = "Name")]
//!     name: Option<String>,
//!     #[bulk(column = "IsComplete")]
//!     is_complete: bool,
//! }
//!
//! async fn load(cx: &Cx, conn: &impl Connection, items: &mut [TodoItem]) {
//!     // Insert and write generated ids back onto the items
//!     let report = bulk_insert_mut(cx, conn, items, &BulkOptions::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(report.rows_inserted as usize, items.len());
//!
//!     // Update only the Name column
//!     let options = BulkOptions::new().update_columns(["Name"]);
//!     bulk_update(cx, conn, items, &options).await.unwrap();
//! }
//! ```
//!
//! # Guarantees
//!
//! - Keys are assigned in input order, across any number of batches.
//! - The staging table never outlives the call, including on error or
//!   cancellation.
//! - No transaction is opened; wrap the call in one for atomicity.

pub mod dialect;
pub mod executor;
pub mod loader;
pub mod options;
pub mod report;
pub mod schema;
pub mod staging;

#[cfg(test)]
mod testing;

pub use sqlbulk_core::{
    BulkError, BulkErrorKind, BulkProgress, ColumnDefinition, Connection, Cx, Dialect, Error,
    FromValue, Model, Outcome, Result, Row, SqlType, TableBuffer, Value,
};
pub use sqlbulk_macros::Model;

pub use dialect::{
    BatchCommand, BulkDialect, PostgresDialect, SqlServerDialect, SqliteDialect, dialect_for,
};
pub use loader::build_buffer;
pub use options::{BulkOptions, DEFAULT_BATCH_SIZE};
pub use report::{GeneratedKey, InsertReport, SkipReason, UpdateReport};
pub use schema::columns;
pub use staging::{ROW_INDEX_COLUMN, StagingTable};

use dialect::{InsertBatch, UpdateBatch};

/// Insert `entities` with the built-in dialect for `conn`.
///
/// Generated keys are returned in the report, not written to the entities;
/// see [`bulk_insert_mut`].
pub async fn bulk_insert<C: Connection, M: Model>(
    cx: &Cx,
    conn: &C,
    entities: &[M],
    options: &BulkOptions,
) -> Outcome<InsertReport, Error> {
    match dialect_for(conn.dialect()) {
        Ok(dialect) => bulk_insert_with_dialect(cx, conn, dialect, entities, options).await,
        Err(e) => Outcome::Err(e),
    }
}

/// Insert `entities`, then write the generated keys onto them.
pub async fn bulk_insert_mut<C: Connection, M: Model>(
    cx: &Cx,
    conn: &C,
    entities: &mut [M],
    options: &BulkOptions,
) -> Outcome<InsertReport, Error> {
    let report = match bulk_insert(cx, conn, &*entities, options).await {
        Outcome::Ok(report) => report,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };
    match report.apply_keys(entities) {
        Ok(_) => Outcome::Ok(report),
        Err(e) => Outcome::Err(e),
    }
}

/// Insert `entities` using a caller-supplied dialect.
#[tracing::instrument(
    level = "debug",
    skip(cx, conn, dialect, entities, options),
    fields(table = M::TABLE_NAME, rows = entities.len(), dialect = dialect.name())
)]
pub async fn bulk_insert_with_dialect<C: Connection, M: Model>(
    cx: &Cx,
    conn: &C,
    dialect: &dyn BulkDialect,
    entities: &[M],
    options: &BulkOptions,
) -> Outcome<InsertReport, Error> {
    if let Err(e) = options.validate() {
        return Outcome::Err(e);
    }
    if entities.is_empty() {
        return Outcome::Ok(InsertReport::skipped(SkipReason::NoEntities));
    }

    let all = match schema::columns::<M>() {
        Ok(columns) => columns,
        Err(e) => return Outcome::Err(e),
    };
    let columns = schema::insert_columns(&all, options.keep_identity);
    if columns.is_empty() {
        tracing::debug!("No insertable columns, skipping");
        return Outcome::Ok(InsertReport::skipped(SkipReason::NoInsertableColumns));
    }
    let returning = if options.keep_identity {
        Vec::new()
    } else {
        schema::generated_keys(&all)
    };

    let staging = match StagingTable::new(&options.staging_prefix, columns) {
        Ok(staging) => staging,
        Err(e) => return Outcome::Err(e),
    };
    let buffer = match build_buffer(entities, staging.columns()) {
        Ok(buffer) => buffer,
        Err(e) => return Outcome::Err(e),
    };
    let command = dialect.insert_batch(&InsertBatch {
        target: M::TABLE_NAME,
        staging: staging.name(),
        columns: staging.columns(),
        returning: &returning,
        keep_identity: options.keep_identity,
        batch_size: options.batch_size,
    });

    let body = async {
        match loader::load(cx, conn, &staging, &buffer, options.batch_size).await {
            Outcome::Ok(_) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
        executor::run_batches(cx, conn, &command, &returning, entities.len()).await
    };

    let totals = match staging.scope(cx, conn, dialect, body).await {
        Outcome::Ok(totals) => totals,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    tracing::debug!(
        inserted = totals.affected,
        batches = totals.batches,
        keys = totals.keys.len(),
        "Bulk insert complete"
    );
    Outcome::Ok(InsertReport {
        rows_inserted: totals.affected,
        batches: totals.batches,
        staging_table: Some(staging.name().to_string()),
        keys: totals.keys,
        skipped: None,
    })
}

/// Update the target rows matching `entities` by primary key, with the
/// built-in dialect for `conn`.
///
/// Two entities with the same key fail the whole call with
/// `BulkErrorKind::DuplicateKey` before any target row is touched.
pub async fn bulk_update<C: Connection, M: Model>(
    cx: &Cx,
    conn: &C,
    entities: &[M],
    options: &BulkOptions,
) -> Outcome<UpdateReport, Error> {
    match dialect_for(conn.dialect()) {
        Ok(dialect) => bulk_update_with_dialect(cx, conn, dialect, entities, options).await,
        Err(e) => Outcome::Err(e),
    }
}

/// Update using a caller-supplied dialect.
#[tracing::instrument(
    level = "debug",
    skip(cx, conn, dialect, entities, options),
    fields(table = M::TABLE_NAME, rows = entities.len(), dialect = dialect.name())
)]
pub async fn bulk_update_with_dialect<C: Connection, M: Model>(
    cx: &Cx,
    conn: &C,
    dialect: &dyn BulkDialect,
    entities: &[M],
    options: &BulkOptions,
) -> Outcome<UpdateReport, Error> {
    if let Err(e) = options.validate() {
        return Outcome::Err(e);
    }
    if entities.is_empty() {
        return Outcome::Ok(UpdateReport::skipped(SkipReason::NoEntities));
    }

    let all = match schema::columns::<M>() {
        Ok(columns) => columns,
        Err(e) => return Outcome::Err(e),
    };
    let keys = schema::primary_keys(&all);
    if keys.is_empty() {
        tracing::debug!("No primary key, skipping");
        return Outcome::Ok(UpdateReport::skipped(SkipReason::NoPrimaryKey));
    }
    let set = match assignable_columns(&all, options.update_allow_list()) {
        Ok(set) => set,
        Err(e) => return Outcome::Err(e),
    };
    if set.is_empty() {
        tracing::debug!("No updatable columns, skipping");
        return Outcome::Ok(UpdateReport::skipped(SkipReason::NoUpdatableColumns));
    }

    let staging = match StagingTable::new(&options.staging_prefix, schema::update_columns(&all)) {
        Ok(staging) => staging,
        Err(e) => return Outcome::Err(e),
    };
    let buffer = match build_buffer(entities, staging.columns()) {
        Ok(buffer) => buffer,
        Err(e) => return Outcome::Err(e),
    };
    let command = dialect.update_batch(&UpdateBatch {
        target: M::TABLE_NAME,
        staging: staging.name(),
        keys: &keys,
        set: &set,
        batch_size: options.batch_size,
    });
    let duplicates = dialect.duplicate_keys(staging.name(), &keys);

    let body = async {
        match loader::load(cx, conn, &staging, &buffer, options.batch_size).await {
            Outcome::Ok(_) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
        match executor::ensure_unique_keys(cx, conn, &duplicates).await {
            Outcome::Ok(()) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
        executor::run_batches(cx, conn, &command, &[], entities.len()).await
    };

    let totals = match staging.scope(cx, conn, dialect, body).await {
        Outcome::Ok(totals) => totals,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    let not_matched = totals.drained.saturating_sub(totals.affected);
    tracing::debug!(
        updated = totals.affected,
        not_matched,
        batches = totals.batches,
        "Bulk update complete"
    );
    Outcome::Ok(UpdateReport {
        rows_updated: totals.affected,
        not_matched,
        batches: totals.batches,
        staging_table: Some(staging.name().to_string()),
        skipped: None,
    })
}

/// Non-key writable columns an update assigns, in declared order.
///
/// Allow-list entries match a column name or a field name. Naming a key, a
/// computed column or nothing at all is an `UnknownColumn` error.
#[allow(clippy::result_large_err)]
fn assignable_columns(
    columns: &[ColumnDefinition],
    allow: Option<&[String]>,
) -> Result<Vec<ColumnDefinition>> {
    let assignable = |c: &ColumnDefinition| c.is_writable() && !c.primary_key;

    let Some(allow) = allow else {
        return Ok(columns.iter().filter(|&c| assignable(c)).cloned().collect());
    };

    for name in allow {
        let found = columns
            .iter()
            .find(|c| c.name == name.as_str() || c.field == name.as_str());
        match found {
            Some(c) if assignable(c) => {}
            Some(c) => {
                return Err(Error::bulk(
                    BulkErrorKind::UnknownColumn,
                    format!("column {:?} is a key or computed and cannot be updated", c.name),
                ));
            }
            None => {
                return Err(Error::bulk(
                    BulkErrorKind::UnknownColumn,
                    format!("no column named {name:?}"),
                ));
            }
        }
    }

    Ok(columns
        .iter()
        .filter(|&c| {
            assignable(c) && allow.iter().any(|n| c.name == n.as_str() || c.field == n.as_str())
        })
        .cloned()
        .collect())
}

/// Everything needed for typical use.
pub mod prelude {
    pub use crate::{
        BulkDialect, BulkOptions, Connection, Cx, Error, GeneratedKey, InsertReport, Model,
        Outcome, Result, SkipReason, UpdateReport, Value, bulk_insert, bulk_insert_mut,
        bulk_update,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, expect_err, unwrap_outcome};
    use asupersync::runtime::RuntimeBuilder;
    use asupersync::types::CancelKind;

    #[derive(Model, Debug, Clone, Default, PartialEq)]
    #[bulk(table = "TodoItems")]
    struct TodoItem {
        #[bulk(primary_key, identity, column = "Id")]
        id: i64,
        #[bulk(column = "Name")]
        name: Option<String>,
        #[bulk(column = "IsComplete")]
        is_complete: bool,
    }

    #[derive(Model, Debug, Clone)]
    struct Counter {
        #[bulk(primary_key, identity)]
        id: i64,
        #[bulk(computed)]
        total: i64,
    }

    #[derive(Model, Debug, Clone)]
    struct LogLine {
        message: String,
    }

    fn todos(n: usize) -> Vec<TodoItem> {
        (1..=n)
            .map(|i| TodoItem {
                id: 0,
                name: Some(format!("Teste {i}")),
                is_complete: i % 2 == 0,
            })
            .collect()
    }

    fn run<T>(f: impl Future<Output = T>) -> T {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        rt.block_on(f)
    }

    fn staging_dropped_last(conn: &MockConnection) -> bool {
        conn.executed()
            .last()
            .is_some_and(|sql| sql.starts_with("DROP TABLE IF EXISTS"))
    }

    #[test]
    fn insert_runs_batches_in_order() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::SqlServer, 2);
        let items = todos(3);
        let options = BulkOptions::new().batch_size(2);

        let report = run(bulk_insert(&cx, &conn, &items, &options));
        let report = unwrap_outcome(report);

        assert_eq!(report.rows_inserted, 3);
        assert_eq!(report.batches, 2);
        assert!(report.skipped.is_none());
        let indexes: Vec<usize> = report.keys.iter().map(|k| k.index).collect();
        assert_eq!(indexes, [0, 1, 2]);
        assert_eq!(report.keys[2].value("Id"), Some(&Value::BigInt(3)));

        let staging = report.staging_table.clone().unwrap();
        assert!(staging.starts_with("Temp_"));

        let executed = conn.executed();
        assert_eq!(
            executed[0],
            format!("CREATE TABLE [{staging}] ([Name] NVARCHAR(MAX), [IsComplete] BIT, [RowIndex] BIGINT)")
        );
        assert_eq!(executed[1], format!("COPY {staging}"));
        assert!(executed[2].starts_with("DECLARE @keys TABLE ([Id] BIGINT); INSERT INTO [TodoItems]"));
        assert!(executed[2].contains("OUTPUT INSERTED.[Id] INTO @keys ([Id])"));
        assert!(executed[3].starts_with("WITH batch AS"));
        // two full batches, one empty pass, then the drop
        assert_eq!(executed.len(), 2 + 3 * 2 + 1);
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn insert_mut_writes_keys_back() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Postgres, 2);
        conn.state.lock().unwrap().next_key = 10;
        let mut items = todos(3);

        let options = BulkOptions::new().batch_size(2);
        let report = unwrap_outcome(run(bulk_insert_mut(&cx, &conn, &mut items, &options)));

        assert_eq!(report.keys.len(), 3);
        let ids: Vec<i64> = items.iter().map(|t| t.id).collect();
        assert_eq!(ids, [10, 11, 12]);
        assert_eq!(items[0].name.as_deref(), Some("Teste 1"));
    }

    #[test]
    fn keep_identity_returns_no_keys() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Postgres, 1000);
        let items = todos(2);

        let options = BulkOptions::new().keep_identity(true);
        let report = unwrap_outcome(run(bulk_insert(&cx, &conn, &items, &options)));

        assert_eq!(report.rows_inserted, 2);
        assert!(report.keys.is_empty());
        let executed = conn.executed();
        assert!(executed[0].contains("\"Id\" BIGINT, \"Name\" TEXT"));
        assert!(executed[2].contains("OVERRIDING SYSTEM VALUE"));
        assert!(!executed[2].contains("RETURNING"));
    }

    #[test]
    fn update_counts_unmatched_rows() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Sqlite, 1000);
        conn.state.lock().unwrap().unmatched = 1;
        let items = todos(3);

        let report = unwrap_outcome(run(bulk_update(&cx, &conn, &items, &BulkOptions::default())));

        assert_eq!(report.rows_updated, 2);
        assert_eq!(report.not_matched, 1);
        assert_eq!(report.batches, 1);

        let executed = conn.executed();
        assert!(executed[0].contains("\"Id\" INTEGER, \"Name\" TEXT, \"IsComplete\" INTEGER, \"RowIndex\" INTEGER"));
        assert!(executed[2].ends_with("GROUP BY \"Id\" HAVING COUNT(*) > 1"));
        assert!(executed[3].starts_with(
            "UPDATE \"TodoItems\" AS target SET \"Name\" = source.\"Name\", \"IsComplete\" = source.\"IsComplete\" FROM"
        ));
        assert!(executed[3].ends_with("WHERE target.\"Id\" = source.\"Id\""));
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn update_allow_list_limits_assignments() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::SqlServer, 1000);
        let items = todos(1);

        let options = BulkOptions::new().update_columns(["is_complete"]);
        unwrap_outcome(run(bulk_update(&cx, &conn, &items, &options)));

        let apply = &conn.executed()[3];
        assert!(apply.starts_with("UPDATE target SET target.[IsComplete] = source.[IsComplete] FROM"));
        assert!(!apply.contains("target.[Name]"));
    }

    #[test]
    fn update_allow_list_rejects_unknown_and_key_columns() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::SqlServer, 1000);
        let items = todos(1);

        for name in ["Nope", "Id"] {
            let options = BulkOptions::new().update_columns([name]);
            let err = expect_err(run(bulk_update(&cx, &conn, &items, &options)));
            assert_eq!(err.bulk_kind(), Some(BulkErrorKind::UnknownColumn));
        }
        assert!(conn.executed().is_empty());
    }

    #[test]
    fn reversed_key_rows_follow_identity_order() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::SqlServer, 2);
        conn.state.lock().unwrap().reverse_keys = true;
        let mut items = todos(5);

        let options = BulkOptions::new().batch_size(2);
        let report = unwrap_outcome(run(bulk_insert_mut(&cx, &conn, &mut items, &options)));

        let ids: Vec<i64> = items.iter().map(|t| t.id).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
        assert_eq!(report.keys[0].single(), Some(&Value::BigInt(1)));
        assert_eq!(report.keys[1].single(), Some(&Value::BigInt(2)));
    }

    #[test]
    fn duplicate_update_keys_are_rejected_before_apply() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Postgres, 1000);
        conn.state.lock().unwrap().duplicate_keys = 1;

        let err = expect_err(run(bulk_update(&cx, &conn, &todos(2), &BulkOptions::default())));
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::DuplicateKey));

        let executed = conn.executed();
        assert!(!executed.iter().any(|sql| sql.starts_with("UPDATE")));
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn cancellation_stops_before_first_batch() {
        let cx = Cx::for_testing();
        cx.cancel_with(CancelKind::User, Some("shutting down"));
        let conn = MockConnection::new(Dialect::Sqlite, 1000);

        let outcome = run(bulk_insert(&cx, &conn, &todos(3), &BulkOptions::default()));
        match outcome {
            Outcome::Cancelled(reason) => assert_eq!(reason.kind, CancelKind::User),
            other => panic!("expected cancellation, got {other:?}"),
        }

        let executed = conn.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed[0].starts_with("CREATE TABLE"));
        assert!(executed[1].starts_with("COPY"));
        assert!(!executed.iter().any(|sql| sql.starts_with("INSERT INTO")));
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn apply_failure_still_drops_staging() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Sqlite, 1000);
        conn.state.lock().unwrap().fail_on = Some("INSERT INTO \"TodoItems\"");

        let err = expect_err(run(bulk_insert(&cx, &conn, &todos(2), &BulkOptions::default())));
        assert!(matches!(err, Error::Query(_)));
        assert!(err.sql().unwrap().starts_with("INSERT INTO \"TodoItems\""));
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn copy_and_create_failures_still_drop_staging() {
        for needle in ["COPY", "CREATE TABLE"] {
            let cx = Cx::for_testing();
            let conn = MockConnection::new(Dialect::Postgres, 1000);
            conn.state.lock().unwrap().fail_on = Some(needle);

            let err = expect_err(run(bulk_update(&cx, &conn, &todos(2), &BulkOptions::default())));
            assert!(matches!(err, Error::Query(_)));
            assert!(staging_dropped_last(&conn), "no drop after {needle} failure");
        }
    }

    #[test]
    fn drop_failure_after_success_is_reported() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Sqlite, 1000);
        conn.state.lock().unwrap().fail_on = Some("DROP TABLE");

        let err = expect_err(run(bulk_insert(&cx, &conn, &todos(1), &BulkOptions::default())));
        assert!(err.sql().unwrap().starts_with("DROP TABLE IF EXISTS"));
    }

    #[test]
    fn key_conversion_failure_carries_progress() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Postgres, 2);
        conn.state.lock().unwrap().key_value = Some(Value::Text("not a number".into()));

        let options = BulkOptions::new().batch_size(2);
        let err = expect_err(run(bulk_insert(&cx, &conn, &todos(5), &options)));
        match err {
            Error::Bulk(e) => {
                assert_eq!(e.kind, BulkErrorKind::KeyConversion);
                assert_eq!(e.progress.batches, 1);
                assert_eq!(e.progress.rows, 2);
            }
            other => panic!("expected bulk error, got {other:?}"),
        }
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn surplus_keys_are_a_count_mismatch() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::SqlServer, 1000);
        conn.state.lock().unwrap().extra_keys = 1;

        let err = expect_err(run(bulk_insert(&cx, &conn, &todos(2), &BulkOptions::default())));
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::KeyCountMismatch));
        assert!(staging_dropped_last(&conn));
    }

    #[test]
    fn nothing_to_do_is_skipped_without_statements() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::SqlServer, 1000);
        let options = BulkOptions::default();

        let empty: Vec<TodoItem> = Vec::new();
        let report = unwrap_outcome(run(bulk_insert(&cx, &conn, &empty, &options)));
        assert_eq!(report.skipped, Some(SkipReason::NoEntities));

        let counters = vec![Counter { id: 1, total: 2 }];
        let report = unwrap_outcome(run(bulk_insert(&cx, &conn, &counters, &options)));
        assert_eq!(report.skipped, Some(SkipReason::NoInsertableColumns));
        let report = unwrap_outcome(run(bulk_update(&cx, &conn, &counters, &options)));
        assert_eq!(report.skipped, Some(SkipReason::NoUpdatableColumns));

        let lines = vec![LogLine {
            message: "hello".into(),
        }];
        let report = unwrap_outcome(run(bulk_update(&cx, &conn, &lines, &options)));
        assert_eq!(report.skipped, Some(SkipReason::NoPrimaryKey));
        assert!(report.staging_table.is_none());

        assert!(conn.executed().is_empty());
    }

    #[test]
    fn invalid_options_and_dialects_fail_fast() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Mysql, 1000);
        let err = expect_err(run(bulk_insert(&cx, &conn, &todos(1), &BulkOptions::default())));
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::UnsupportedDialect));

        let conn = MockConnection::new(Dialect::Sqlite, 1000);
        let options = BulkOptions::new().batch_size(0);
        let err = expect_err(run(bulk_update(&cx, &conn, &todos(1), &options)));
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::InvalidBatchSize));
        assert!(conn.executed().is_empty());
    }

    #[test]
    fn custom_dialect_is_used() {
        let cx = Cx::for_testing();
        let conn = MockConnection::new(Dialect::Mysql, 1000);
        let report = unwrap_outcome(run(bulk_insert_with_dialect(
            &cx,
            &conn,
            &PostgresDialect,
            &todos(2),
            &BulkOptions::default(),
        )));
        assert_eq!(report.keys.len(), 2);
        assert!(conn.executed()[2].ends_with("RETURNING \"Id\""));
    }
}

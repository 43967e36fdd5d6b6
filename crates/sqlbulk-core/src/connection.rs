//! Database connection trait.
//!
//! [`Connection`] is the seam between the bulk engine and a driver. Besides
//! plain statement execution it exposes a bulk-copy channel for streaming a
//! [`TableBuffer`] into a table; drivers override it with their fastest
//! native path.
//!
//! All operations integrate with asupersync's structured concurrency via `Cx`
//! for cancellation and timeout handling.

use crate::buffer::TableBuffer;
use crate::dialect::Dialect;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// A database connection.
///
/// # Example
///
/// ```rust,ignore
/// let rows = conn.query(&cx, "SELECT * FROM users WHERE id = ?1", &[Value::Int(1)]).await?;
/// let copied = conn.bulk_copy(&cx, "Temp_abc", &buffer, 1000).await?;
/// ```
pub trait Connection: Send + Sync {
    /// The SQL dialect this connection speaks.
    fn dialect(&self) -> Dialect;

    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;

    /// Execute a statement (INSERT, UPDATE, DELETE, DDL) and return rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Stream every row of `buffer` into `table`, mapping columns by name.
    ///
    /// Rows are sent in chunks of at most `batch_size`. Returns the number
    /// of rows written. The default implementation issues one parameterized
    /// multi-row `INSERT ... VALUES` per chunk, shrinking chunks so that no
    /// statement exceeds the dialect's bind-parameter limit.
    fn bulk_copy(
        &self,
        cx: &Cx,
        table: &str,
        buffer: &TableBuffer,
        batch_size: usize,
    ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send {
        async move {
            let dialect = self.dialect();
            let per_statement = buffer.rows_per_statement(dialect, batch_size);
            let mut copied = 0u64;

            for chunk in buffer.rows().chunks(per_statement) {
                let sql = buffer.values_insert_sql(dialect, table, chunk.len());
                let params: Vec<Value> = chunk.iter().flatten().cloned().collect();
                match self.execute(cx, &sql, &params).await {
                    Outcome::Ok(n) => copied += n,
                    Outcome::Err(e) => return Outcome::Err(e),
                    Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                    Outcome::Panicked(p) => return Outcome::Panicked(p),
                }
            }

            tracing::trace!(
                table = %table,
                rows = copied,
                chunk = per_statement,
                "bulk copy via multi-row insert"
            );
            Outcome::Ok(copied)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockState {
        executed: Vec<(String, Vec<Value>)>,
    }

    struct MockConnection {
        dialect: Dialect,
        state: Arc<Mutex<MockState>>,
    }

    impl Connection for MockConnection {
        fn dialect(&self) -> Dialect {
            self.dialect
        }

        #[allow(clippy::manual_async_fn)]
        fn query(
            &self,
            _cx: &Cx,
            _sql: &str,
            _params: &[Value],
        ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send {
            async move {
                Outcome::Ok(vec![Row::new(
                    vec!["one".to_string()],
                    vec![Value::Int(1)],
                )])
            }
        }

        #[allow(clippy::manual_async_fn)]
        fn execute(
            &self,
            _cx: &Cx,
            sql: &str,
            params: &[Value],
        ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send {
            let state = Arc::clone(&self.state);
            let sql = sql.to_string();
            let params = params.to_vec();
            async move {
                let width = 2;
                let rows = (params.len() / width) as u64;
                state.lock().unwrap().executed.push((sql, params));
                Outcome::Ok(rows)
            }
        }
    }

    fn unwrap_outcome<T>(outcome: Outcome<T, crate::Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            Outcome::Err(e) => panic!("unexpected error: {e}"),
            Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
            Outcome::Panicked(p) => panic!("panicked: {p:?}"),
        }
    }

    fn buffer(rows: i64) -> TableBuffer {
        let mut buf = TableBuffer::new(vec!["Name".to_string(), "RowIndex".to_string()]);
        for i in 1..=rows {
            buf.push_row(vec![Value::Text(format!("n{i}")), Value::BigInt(i)])
                .unwrap();
        }
        buf
    }

    #[test]
    fn default_bulk_copy_chunks_by_batch_size() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let state = Arc::new(Mutex::new(MockState::default()));
        let conn = MockConnection {
            dialect: Dialect::Postgres,
            state: Arc::clone(&state),
        };

        rt.block_on(async {
            let copied = unwrap_outcome(conn.bulk_copy(&cx, "Temp_a", &buffer(5), 2).await);
            assert_eq!(copied, 5);
        });

        let state = state.lock().unwrap();
        assert_eq!(state.executed.len(), 3);
        assert_eq!(
            state.executed[0].0,
            "INSERT INTO \"Temp_a\" (\"Name\", \"RowIndex\") VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(state.executed[2].1, vec![Value::Text("n5".into()), Value::BigInt(5)]);
    }

    #[test]
    fn default_bulk_copy_empty_buffer_is_noop() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let state = Arc::new(Mutex::new(MockState::default()));
        let conn = MockConnection {
            dialect: Dialect::Sqlite,
            state: Arc::clone(&state),
        };

        rt.block_on(async {
            assert_eq!(unwrap_outcome(conn.bulk_copy(&cx, "t", &buffer(0), 10).await), 0);
        });
        assert!(state.lock().unwrap().executed.is_empty());
    }
}

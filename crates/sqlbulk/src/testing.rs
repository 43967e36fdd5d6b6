//! Scripted in-memory connection for engine unit tests.
//!
//! It models only a row count for the staging table: apply and drain
//! statements consume up to `batch_size` staged rows each, keys count up from
//! `next_key`, and any statement containing `fail_on` fails. Duplicate-key
//! checks report `duplicate_keys` rows.

use std::sync::{Arc, Mutex};

use sqlbulk_core::error::{QueryError, QueryErrorKind};
use sqlbulk_core::{Connection, Cx, Dialect, Error, Outcome, Row, TableBuffer, Value};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    /// Every statement seen, in order. Bulk copies are logged as `COPY <table>`.
    pub executed: Vec<String>,
    pub staged: u64,
    pub batch_size: u64,
    pub next_key: i64,
    /// Returned for every key instead of the counter.
    pub key_value: Option<Value>,
    /// Extra key rows returned by the next key-returning apply.
    pub extra_keys: usize,
    /// Key rows come back in descending order.
    pub reverse_keys: bool,
    /// Rows answered to the duplicate-key check.
    pub duplicate_keys: usize,
    /// Staged rows, counted from the front, that match no target row.
    pub unmatched: u64,
    pub fail_on: Option<&'static str>,
}

pub(crate) struct MockConnection {
    pub dialect: Dialect,
    pub state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new(dialect: Dialect, batch_size: u64) -> Self {
        Self {
            dialect,
            state: Arc::new(Mutex::new(MockState {
                batch_size,
                next_key: 1,
                ..MockState::default()
            })),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }
}

fn injected(state: &MockState, sql: &str) -> Option<Error> {
    state
        .fail_on
        .filter(|needle| sql.contains(needle))
        .map(|_| Error::Query(QueryError::new(QueryErrorKind::Database, Some(sql), "injected failure")))
}

fn is_drain(sql: &str) -> bool {
    sql.starts_with("DELETE") || sql.starts_with("WITH batch")
}

fn take_batch(state: &mut MockState) -> u64 {
    let n = state.batch_size.min(state.staged);
    state.staged -= n;
    n
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[allow(clippy::manual_async_fn)]
    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        _params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        async move {
            let mut guard = state.lock().unwrap();
            let state = &mut *guard;
            state.executed.push(sql.clone());
            if let Some(e) = injected(state, &sql) {
                return Outcome::Err(e);
            }

            if sql.contains("HAVING COUNT(*) > 1") {
                let row = Row::new(vec!["Id".to_string()], vec![Value::BigInt(1)]);
                return Outcome::Ok(vec![row; state.duplicate_keys]);
            }

            // Keys are returned for the rows the following drain removes.
            let n = state.batch_size.min(state.staged) as usize + std::mem::take(&mut state.extra_keys);
            let mut rows = Vec::with_capacity(n);
            for _ in 0..n {
                let value = match &state.key_value {
                    Some(v) => v.clone(),
                    None => {
                        state.next_key += 1;
                        Value::BigInt(state.next_key - 1)
                    }
                };
                rows.push(Row::new(vec!["Id".to_string()], vec![value]));
            }
            if state.reverse_keys {
                rows.reverse();
            }
            Outcome::Ok(rows)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        _params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        async move {
            let mut state = state.lock().unwrap();
            state.executed.push(sql.clone());
            if let Some(e) = injected(&state, &sql) {
                return Outcome::Err(e);
            }

            if sql.starts_with("CREATE") || sql.starts_with("DROP") {
                Outcome::Ok(0)
            } else if is_drain(&sql) {
                Outcome::Ok(take_batch(&mut state))
            } else {
                let n = state.batch_size.min(state.staged);
                let missed = n.min(state.unmatched);
                state.unmatched -= missed;
                Outcome::Ok(n - missed)
            }
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn bulk_copy(
        &self,
        _cx: &Cx,
        table: &str,
        buffer: &TableBuffer,
        _batch_size: usize,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = format!("COPY {table}");
        let rows = buffer.len() as u64;
        async move {
            let mut state = state.lock().unwrap();
            state.executed.push(sql.clone());
            if let Some(e) = injected(&state, &sql) {
                return Outcome::Err(e);
            }
            state.staged = rows;
            Outcome::Ok(rows)
        }
    }
}

pub(crate) fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub(crate) fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        other => panic!("expected error, got {other:?}"),
    }
}

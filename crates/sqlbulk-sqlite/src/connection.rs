//! SQLite connection implementation.
//!
//! This module provides safe wrappers around SQLite's C API and implements
//! the `Connection` trait from sqlbulk-core, including a bulk-copy channel
//! that reuses one prepared insert for every staged row.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::result_large_err)] // Error type is defined in sqlbulk-core
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers

use crate::ffi;
use crate::types;
use sqlbulk_core::{
    Connection, Cx, Dialect, Error, Outcome, Row, TableBuffer, Value,
    error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind},
    row::ColumnInfo,
};
use std::ffi::{CString, c_int};
use std::future::Future;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Savepoint wrapped around each bulk-copy chunk.
const COPY_SAVEPOINT: &str = "sqlbulk_copy";

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Open in multi-thread mode.
    pub no_mutex: bool,
    /// Open in serialized mode.
    pub full_mutex: bool,
    /// Enable shared cache mode.
    pub shared_cache: bool,
    /// Disable shared cache mode.
    pub private_cache: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let pairs = [
            (self.read_only, ffi::SQLITE_OPEN_READONLY),
            (self.read_write, ffi::SQLITE_OPEN_READWRITE),
            (self.create, ffi::SQLITE_OPEN_CREATE),
            (self.uri, ffi::SQLITE_OPEN_URI),
            (self.no_mutex, ffi::SQLITE_OPEN_NOMUTEX),
            (self.full_mutex, ffi::SQLITE_OPEN_FULLMUTEX),
            (self.shared_cache, ffi::SQLITE_OPEN_SHAREDCACHE),
            (self.private_cache, ffi::SQLITE_OPEN_PRIVATECACHE),
        ];
        let mut flags = pairs
            .iter()
            .filter(|(on, _)| *on)
            .fold(0, |acc, (_, flag)| acc | flag);

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Raw handle, only touched while the connection's mutex is held.
struct SqliteInner {
    db: *mut ffi::sqlite3,
}

// SAFETY: the handle is only used behind the Mutex in SqliteConnection
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
///
/// This is a thread-safe wrapper around a SQLite database handle.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                ffi::error_string(rc)
            } else {
                // SAFETY: db is a handle sqlite3_open_v2 allocated
                unsafe {
                    let msg = ffi::last_error_message(db);
                    ffi::sqlite3_close(db);
                    msg
                }
            };

            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database {}: {}", config.path, msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::debug!(path = %config.path, "opened sqlite connection");

        Ok(Self {
            inner: Mutex::new(SqliteInner { db }),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteInner>, Error> {
        self.inner.lock().map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Poisoned,
                message: "SQLite connection lock poisoned by a panicking thread".to_string(),
                source: None,
            })
        })
    }

    /// Execute one or more statements without parameters (DDL, pragmas).
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock()?;
        exec_batch(inner.db, sql)
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> Result<u64, Error> {
        let inner = self.lock()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_changes(inner.db) } as u64)
    }

    /// Prepare and execute a query, returning all rows.
    pub fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let inner = self.lock()?;
        let stmt = Statement::prepare(inner.db, sql)?;
        stmt.bind_all(params)?;

        let col_count = stmt.column_count();
        let mut col_names = Vec::with_capacity(col_count as usize);
        for i in 0..col_count {
            // SAFETY: stmt is valid and i < column count
            let name =
                unsafe { types::column_name(stmt.raw, i) }.unwrap_or_else(|| format!("col{}", i));
            col_names.push(name);
        }
        let columns = Arc::new(ColumnInfo::new(col_names));

        let mut rows = Vec::new();
        while stmt.step()? {
            let values = (0..col_count)
                // SAFETY: step just returned SQLITE_ROW
                .map(|i| unsafe { types::read_column(stmt.raw, i) })
                .collect();
            rows.push(Row::with_columns(Arc::clone(&columns), values));
        }

        tracing::trace!(sql = %sql, rows = rows.len(), "sqlite query");
        Ok(rows)
    }

    /// Prepare and execute a statement, returning rows affected.
    pub fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        let inner = self.lock()?;
        let stmt = Statement::prepare(inner.db, sql)?;
        stmt.bind_all(params)?;
        while stmt.step()? {}
        drop(stmt);

        // SAFETY: db is valid
        let changes = unsafe { ffi::sqlite3_changes(inner.db) } as u64;
        tracing::trace!(sql = %sql, changes, "sqlite execute");
        Ok(changes)
    }

    /// Copy `rows` through a single prepared insert inside a savepoint.
    ///
    /// Either every row of the chunk lands or none does.
    fn copy_chunk(&self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, Error> {
        let inner = self.lock()?;
        exec_batch(inner.db, &format!("SAVEPOINT {COPY_SAVEPOINT}"))?;

        let result = (|| {
            let stmt = Statement::prepare(inner.db, sql)?;
            for row in rows {
                stmt.bind_all(row)?;
                while stmt.step()? {}
                stmt.reset();
            }
            Ok(rows.len() as u64)
        })();

        match result {
            Ok(n) => {
                exec_batch(inner.db, &format!("RELEASE {COPY_SAVEPOINT}"))?;
                Ok(n)
            }
            Err(e) => {
                let rollback =
                    format!("ROLLBACK TO {COPY_SAVEPOINT}; RELEASE {COPY_SAVEPOINT}");
                if let Err(rollback_err) = exec_batch(inner.db, &rollback) {
                    tracing::warn!(error = %rollback_err, "failed to roll back bulk copy chunk");
                }
                Err(e)
            }
        }
    }

    fn bulk_copy_sync(
        &self,
        cx: &Cx,
        table: &str,
        buffer: &TableBuffer,
        batch_size: usize,
    ) -> Outcome<u64, Error> {
        if buffer.is_empty() {
            return Outcome::Ok(0);
        }
        let sql = buffer.values_insert_sql(Dialect::Sqlite, table, 1);
        let mut copied = 0u64;

        for chunk in buffer.rows().chunks(batch_size.max(1)) {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match self.copy_chunk(&sql, chunk) {
                Ok(n) => copied += n,
                Err(e) => return Outcome::Err(e),
            }
        }

        tracing::trace!(table = %table, rows = copied, "sqlite bulk copy");
        Outcome::Ok(copied)
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = match self.inner.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !inner.db.is_null() {
            // SAFETY: db is valid and no statement outlives the lock
            unsafe {
                ffi::sqlite3_close_v2(inner.db);
            }
            inner.db = ptr::null_mut();
        }
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.query_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.execute_sync(sql, params);
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn bulk_copy(
        &self,
        cx: &Cx,
        table: &str,
        buffer: &TableBuffer,
        batch_size: usize,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let outcome = self.bulk_copy_sync(cx, table, buffer, batch_size);
        async move { outcome }
    }
}

/// A prepared statement that finalizes itself on drop.
struct Statement {
    raw: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
    sql: String,
}

impl Statement {
    fn prepare(db: *mut ffi::sqlite3, sql: &str) -> Result<Self, Error> {
        let c_sql = CString::new(sql).map_err(|_| {
            Error::Query(QueryError::new(
                QueryErrorKind::Syntax,
                Some(sql),
                "SQL contains null byte",
            ))
        })?;

        let mut raw: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                db,
                c_sql.as_ptr(),
                c_sql.as_bytes().len() as c_int,
                &mut raw,
                ptr::null_mut(),
            )
        };

        if rc != ffi::SQLITE_OK {
            return Err(db_error(db, sql, rc, None));
        }

        Ok(Self {
            raw,
            db,
            sql: sql.to_string(),
        })
    }

    fn column_count(&self) -> c_int {
        // SAFETY: raw is a valid statement (or NULL for empty SQL, which yields 0)
        unsafe { ffi::sqlite3_column_count(self.raw) }
    }

    fn bind_all(&self, params: &[Value]) -> Result<(), Error> {
        for (i, param) in params.iter().enumerate() {
            // SAFETY: raw is valid, index is 1-based
            let rc = unsafe { types::bind_value(self.raw, (i + 1) as c_int, param) };
            if rc != ffi::SQLITE_OK {
                return Err(db_error(self.db, &self.sql, rc, Some(i + 1)));
            }
        }
        Ok(())
    }

    /// Advance one row. `Ok(true)` means a row is available.
    fn step(&self) -> Result<bool, Error> {
        if self.raw.is_null() {
            return Ok(false);
        }
        // SAFETY: raw is valid
        match unsafe { ffi::sqlite3_step(self.raw) } {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            rc => Err(db_error(self.db, &self.sql, rc, None)),
        }
    }

    /// Rewind for another execution with fresh bindings.
    fn reset(&self) {
        // SAFETY: raw is valid; the step error, if any, was already reported
        unsafe {
            ffi::sqlite3_reset(self.raw);
            ffi::sqlite3_clear_bindings(self.raw);
        }
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            // SAFETY: raw is valid and finalized exactly once
            unsafe {
                ffi::sqlite3_finalize(self.raw);
            }
        }
    }
}

fn exec_batch(db: *mut ffi::sqlite3, sql: &str) -> Result<(), Error> {
    let c_sql = CString::new(sql).map_err(|_| {
        Error::Query(QueryError::new(
            QueryErrorKind::Syntax,
            Some(sql),
            "SQL contains null byte",
        ))
    })?;

    let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc =
        unsafe { ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg) };

    if rc != ffi::SQLITE_OK {
        let msg = if errmsg.is_null() {
            ffi::error_string(rc)
        } else {
            // SAFETY: errmsg was allocated by sqlite3_exec and is freed once
            unsafe {
                let msg = std::ffi::CStr::from_ptr(errmsg)
                    .to_string_lossy()
                    .into_owned();
                ffi::sqlite3_free(errmsg.cast());
                msg
            }
        };
        return Err(Error::Query(QueryError::new(
            error_code_to_kind(rc),
            Some(sql),
            msg,
        )));
    }

    Ok(())
}

fn db_error(db: *mut ffi::sqlite3, sql: &str, rc: c_int, param_index: Option<usize>) -> Error {
    // SAFETY: db is valid for the lifetime of the connection
    let msg = unsafe { ffi::last_error_message(db) };
    let (kind, message) = match param_index {
        Some(i) => (
            QueryErrorKind::Database,
            format!("Failed to bind parameter {}: {}", i, msg),
        ),
        None => (error_code_to_kind(rc), msg),
    };
    Error::Query(QueryError::new(kind, Some(sql), message))
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    // extended result codes carry the primary code in the low byte
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Deadlock,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_TOOBIG => QueryErrorKind::DataTruncation,
        ffi::SQLITE_INTERRUPT => QueryErrorKind::Cancelled,
        _ => QueryErrorKind::Database,
    }
}

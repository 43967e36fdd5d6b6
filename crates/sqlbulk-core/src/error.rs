//! Error types for sqlbulk operations.

use std::fmt;

/// The primary error type for all sqlbulk operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (open, disconnect)
    Connection(ConnectionError),
    /// Query execution errors
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Bulk operation errors (mapping, dialect, key round-trip)
    Bulk(BulkError),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Internal connection state is unusable (e.g. a poisoned lock)
    Poisoned,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Data too large for column
    DataTruncation,
    /// Deadlock or lock contention
    Deadlock,
    /// Cancelled
    Cancelled,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
    pub rust_type: Option<&'static str>,
}

/// Failure of a bulk insert or update.
///
/// `progress` records how much work reached the target table before the
/// failure, so callers can tell a clean failure from a partial one.
#[derive(Debug)]
pub struct BulkError {
    pub kind: BulkErrorKind,
    pub message: String,
    pub progress: BulkProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkErrorKind {
    /// The entity type carries no table or column mapping.
    UnmappedEntity,
    /// No command generator exists for the connection's dialect.
    UnsupportedDialect,
    /// A table or column name cannot be used as an identifier.
    InvalidIdentifier,
    /// Batch size must be at least one.
    InvalidBatchSize,
    /// An update allow-list names a column the entity does not map.
    UnknownColumn,
    /// A generated key could not be converted to the key column's type.
    KeyConversion,
    /// A batch returned a different number of keys than rows it consumed.
    KeyCountMismatch,
    /// Two update rows share a primary key.
    DuplicateKey,
}

/// Work already applied to the target table when a bulk operation failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkProgress {
    /// Batches whose statements completed.
    pub batches: usize,
    /// Rows those batches wrote to the target.
    pub rows: u64,
}

impl BulkError {
    /// Create a bulk error with no recorded progress.
    pub fn new(kind: BulkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            progress: BulkProgress::default(),
        }
    }

    /// Attach the progress made before the failure.
    pub fn with_progress(mut self, progress: BulkProgress) -> Self {
        self.progress = progress;
        self
    }
}

impl Error {
    /// Shorthand for a [`BulkError`] without progress.
    pub fn bulk(kind: BulkErrorKind, message: impl Into<String>) -> Self {
        Error::Bulk(BulkError::new(kind, message))
    }

    /// The bulk error kind, if this is a bulk error.
    pub fn bulk_kind(&self) -> Option<BulkErrorKind> {
        match self {
            Error::Bulk(b) => Some(b.kind),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl QueryError {
    /// Create a query error carrying the offending SQL.
    pub fn new(kind: QueryErrorKind, sql: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            sql: sql.map(str::to_string),
            sqlstate: None,
            message: message.into(),
            detail: None,
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Bulk(e) => write!(f, "Bulk error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Type(_) | Error::Bulk(_) => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for BulkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.progress.batches > 0 {
            write!(
                f,
                "{} (after {} batches, {} rows)",
                self.message, self.progress.batches, self.progress.rows
            )
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<BulkError> for Error {
    fn from(err: BulkError) -> Self {
        Error::Bulk(err)
    }
}

/// Result type alias for sqlbulk operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_display_and_sql() {
        let mut query = QueryError::new(
            QueryErrorKind::Constraint,
            Some("INSERT INTO t VALUES (1)"),
            "unique violation",
        );
        query.sqlstate = Some("23505".to_string());

        let err = Error::Query(query);
        assert_eq!(err.to_string(), "Query error (SQLSTATE 23505): unique violation");
        assert_eq!(err.sql(), Some("INSERT INTO t VALUES (1)"));
    }

    #[test]
    fn bulk_error_display_includes_progress() {
        let err = Error::Bulk(
            BulkError::new(BulkErrorKind::KeyConversion, "cannot convert key").with_progress(
                BulkProgress {
                    batches: 2,
                    rows: 20,
                },
            ),
        );
        assert_eq!(
            err.to_string(),
            "Bulk error: cannot convert key (after 2 batches, 20 rows)"
        );
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::KeyConversion));
    }

    #[test]
    fn bulk_error_without_progress() {
        let err = Error::bulk(BulkErrorKind::UnmappedEntity, "no table mapping");
        assert_eq!(err.to_string(), "Bulk error: no table mapping");
        assert_eq!(err.sql(), None);
    }

    #[test]
    fn connection_error_source_is_exposed() {
        use std::error::Error as _;

        let io = std::io::Error::other("socket closed");
        let err = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Connect,
            message: "failed to open database".to_string(),
            source: Some(Box::new(io)),
        });
        assert_eq!(err.to_string(), "Connection error: failed to open database");
        assert_eq!(err.source().unwrap().to_string(), "socket closed");
    }
}

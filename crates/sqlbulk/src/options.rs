//! Per-call options for bulk operations.

use serde::Serialize;
use sqlbulk_core::{BulkErrorKind, Error, Result, validate_identifier};

/// Rows moved per batch when the caller does not say otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Prefix of every staging table name.
pub const DEFAULT_STAGING_PREFIX: &str = "Temp_";

/// Options for [`bulk_insert`](crate::bulk_insert) and
/// [`bulk_update`](crate::bulk_update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOptions {
    /// Maximum rows per staging chunk and per apply statement.
    pub batch_size: usize,
    /// Insert caller-supplied values into generated key columns instead of
    /// letting the database assign them.
    pub keep_identity: bool,
    /// Columns an update may set. `None` (or an empty list) sets every
    /// writable non-key column.
    pub update_columns: Option<Vec<String>>,
    /// Prefix for the staging table name.
    pub staging_prefix: String,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            keep_identity: false,
            update_columns: None,
            staging_prefix: DEFAULT_STAGING_PREFIX.to_string(),
        }
    }
}

impl BulkOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }

    /// Preserve caller-supplied identity values on insert.
    pub fn keep_identity(mut self, enabled: bool) -> Self {
        self.keep_identity = enabled;
        self
    }

    /// Restrict an update to the named columns (column or field names).
    pub fn update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the staging table prefix.
    pub fn staging_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.staging_prefix = prefix.into();
        self
    }

    /// The update allow-list, with an empty list treated as absent.
    pub fn update_allow_list(&self) -> Option<&[String]> {
        self.update_columns
            .as_deref()
            .filter(|columns| !columns.is_empty())
    }

    /// Check the options before any statement is issued.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::bulk(
                BulkErrorKind::InvalidBatchSize,
                "batch size must be at least 1",
            ));
        }
        validate_identifier(&self.staging_prefix, "staging prefix")
    }
}

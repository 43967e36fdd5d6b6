//! Ephemeral staging tables.
//!
//! Each bulk operation loads its rows into a table of its own, named with a
//! random suffix so concurrent operations never share one. The table exists
//! only for the duration of [`StagingTable::scope`].

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sqlbulk_core::{ColumnDefinition, Connection, Cx, Error, Outcome, Result, validate_identifier};

use crate::dialect::BulkDialect;

/// Ordering column added to every staging table. Holds the 1-based position
/// of the entity in the caller's input.
pub const ROW_INDEX_COLUMN: &str = "RowIndex";

/// Length of the random part of a staging table name.
pub const STAGING_SUFFIX_LEN: usize = 16;

/// `prefix` followed by 16 characters from `[A-Za-z0-9]`, drawn from the
/// operating system's CSPRNG.
pub fn staging_table_name(prefix: &str) -> String {
    let suffix: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(STAGING_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}{suffix}")
}

/// A staging table: its name and the entity columns it carries.
///
/// The order column is implied and not part of `columns`.
#[derive(Debug, Clone)]
pub struct StagingTable {
    name: String,
    columns: Vec<ColumnDefinition>,
}

impl StagingTable {
    /// Pick a fresh name for a staging table holding `columns`.
    #[allow(clippy::result_large_err)]
    pub fn new(prefix: &str, columns: Vec<ColumnDefinition>) -> Result<Self> {
        let name = staging_table_name(prefix);
        validate_identifier(&name, "staging table")?;
        Ok(Self { name, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Create the table, run `body`, then drop the table.
    ///
    /// The drop is attempted whatever `body` returns, including
    /// cancellation. If both fail, the drop failure is logged and the body's
    /// outcome is returned. If only the drop fails, its failure becomes the
    /// result.
    pub async fn scope<C, T, F>(
        &self,
        cx: &Cx,
        conn: &C,
        dialect: &dyn BulkDialect,
        body: F,
    ) -> Outcome<T, Error>
    where
        C: Connection,
        F: Future<Output = Outcome<T, Error>>,
    {
        let create = dialect.create_staging(&self.name, &self.columns);
        tracing::trace!(sql = %create, "Creating staging table");

        let failed: Option<Outcome<T, Error>> = match conn.execute(cx, &create, &[]).await {
            Outcome::Ok(_) => None,
            Outcome::Err(e) => Some(Outcome::Err(e)),
            Outcome::Cancelled(r) => Some(Outcome::Cancelled(r)),
            Outcome::Panicked(p) => Some(Outcome::Panicked(p)),
        };
        if let Some(failed) = failed {
            // A failed create can still leave the table behind. The create
            // error is returned; a drop failure is only logged.
            let _dropped = self.drop_table(cx, conn, dialect).await;
            return failed;
        }
        tracing::debug!(
            staging = %self.name,
            columns = self.columns.len(),
            "Staging table created"
        );

        let outcome = body.await;
        let dropped = self.drop_table(cx, conn, dialect).await;

        match (outcome, dropped) {
            (Outcome::Ok(value), Outcome::Ok(_)) => Outcome::Ok(value),
            (Outcome::Ok(_), Outcome::Err(e)) => Outcome::Err(e),
            (Outcome::Ok(_), Outcome::Cancelled(r)) => Outcome::Cancelled(r),
            (Outcome::Ok(_), Outcome::Panicked(p)) => Outcome::Panicked(p),
            (failed, _) => failed,
        }
    }

    async fn drop_table<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        dialect: &dyn BulkDialect,
    ) -> Outcome<u64, Error> {
        let sql = dialect.drop_staging(&self.name);
        tracing::trace!(sql = %sql, "Dropping staging table");

        let outcome = conn.execute(cx, &sql, &[]).await;
        match &outcome {
            Outcome::Ok(_) => tracing::debug!(staging = %self.name, "Staging table dropped"),
            Outcome::Err(e) => {
                tracing::error!(staging = %self.name, error = %e, "Failed to drop staging table");
            }
            Outcome::Cancelled(r) => {
                tracing::error!(staging = %self.name, reason = ?r, "Staging table drop cancelled");
            }
            Outcome::Panicked(p) => {
                tracing::error!(staging = %self.name, panic = ?p, "Staging table drop panicked");
            }
        }
        outcome
    }
}

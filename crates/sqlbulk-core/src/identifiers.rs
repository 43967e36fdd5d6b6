//! SQL identifier quoting and validation utilities.
//!
//! Table and column names are never bound as parameters, so every name that
//! reaches generated SQL is validated once and then quoted per dialect.

use crate::Result;
use crate::error::{BulkErrorKind, Error};

/// Longest identifier accepted (the SQL Server `sysname` limit).
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
///
/// # Examples
///
/// ```
/// use sqlbulk_core::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("user\"name"), "\"user\"\"name\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// ```
/// use sqlbulk_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("user`name"), "`user``name`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a SQL identifier using SQL Server bracket quoting.
///
/// A closing bracket is escaped by doubling it (`]` → `]]`).
///
/// ```
/// use sqlbulk_core::quote_ident_mssql;
///
/// assert_eq!(quote_ident_mssql("TodoItems"), "[TodoItems]");
/// assert_eq!(quote_ident_mssql("a]b"), "[a]]b]");
/// ```
#[inline]
pub fn quote_ident_mssql(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Check that `name` can be used as a table or column identifier.
///
/// Quoting makes any printable name safe, so only names that no server
/// accepts are rejected: empty, too long, or containing NUL / control
/// characters.
#[allow(clippy::result_large_err)]
pub fn validate_identifier(name: &str, what: &str) -> Result<()> {
    let problem = if name.trim().is_empty() {
        Some("is empty")
    } else if name.chars().count() > MAX_IDENTIFIER_LEN {
        Some("exceeds 128 characters")
    } else if name.chars().any(char::is_control) {
        Some("contains control characters")
    } else {
        None
    };

    match problem {
        Some(problem) => Err(Error::bulk(
            BulkErrorKind::InvalidIdentifier,
            format!("{} name {:?} {}", what, name, problem),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_simple() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("select"), "\"select\"");
    }

    #[test]
    fn test_quote_ident_sql_injection_attempt() {
        let malicious = "users\"; DROP TABLE secrets; --";
        assert_eq!(
            quote_ident(malicious),
            "\"users\"\"; DROP TABLE secrets; --\""
        );
    }

    #[test]
    fn test_quote_ident_mysql() {
        assert_eq!(quote_ident_mysql("users"), "`users`");
        assert_eq!(quote_ident_mysql("a`b`c"), "`a``b``c`");
    }

    #[test]
    fn test_quote_ident_mssql() {
        assert_eq!(quote_ident_mssql("Temp_abc"), "[Temp_abc]");
        assert_eq!(quote_ident_mssql("x]; DROP TABLE t; --"), "[x]]; DROP TABLE t; --]");
        assert_eq!(quote_ident_mssql("first name"), "[first name]");
    }

    #[test]
    fn test_validate_accepts_ordinary_names() {
        assert!(validate_identifier("TodoItems", "table").is_ok());
        assert!(validate_identifier("Is Complete", "column").is_ok());
        assert!(validate_identifier("naïve", "column").is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let err = validate_identifier("", "table").unwrap_err();
        assert_eq!(err.bulk_kind(), Some(BulkErrorKind::InvalidIdentifier));
        assert!(validate_identifier("   ", "table").is_err());
        assert!(validate_identifier("a\0b", "column").is_err());
        assert!(validate_identifier("a\nb", "column").is_err());
        assert!(validate_identifier(&"x".repeat(129), "column").is_err());
        assert!(validate_identifier(&"x".repeat(128), "column").is_ok());
    }
}

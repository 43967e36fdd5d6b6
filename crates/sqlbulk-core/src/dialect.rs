//! SQL dialects a connection can speak.

use crate::identifiers::{quote_ident, quote_ident_mssql, quote_ident_mysql};

/// The SQL dialect spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Microsoft SQL Server / Azure SQL
    SqlServer,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
    /// MySQL / MariaDB
    Mysql,
}

impl Dialect {
    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::SqlServer => format!("@P{}", index),
            Dialect::Postgres => format!("${}", index),
            Dialect::Sqlite => format!("?{}", index),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Quote an identifier the way this dialect expects.
    pub fn quote(self, name: &str) -> String {
        match self {
            Dialect::SqlServer => quote_ident_mssql(name),
            Dialect::Postgres | Dialect::Sqlite => quote_ident(name),
            Dialect::Mysql => quote_ident_mysql(name),
        }
    }

    /// Most bind parameters one statement may carry.
    pub const fn max_params(self) -> usize {
        match self {
            // hard limit is 2100, a few are reserved by the driver
            Dialect::SqlServer => 2000,
            Dialect::Postgres | Dialect::Mysql => 65_535,
            Dialect::Sqlite => 32_766,
        }
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Dialect::SqlServer => "sqlserver",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

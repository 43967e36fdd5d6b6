//! SQLite driver for sqlbulk.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate implements the `Connection` trait from sqlbulk-core on top of
//! libsqlite3 (bundled through `libsqlite3-sys`). Staging tables, the
//! batch apply/drain statements and the bulk-copy channel all run against
//! a single `SqliteConnection`.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlbulk_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_raw("CREATE TABLE \"TodoItems\" (\"Id\" INTEGER PRIMARY KEY, \"Name\" TEXT)")?;
//! let report = sqlbulk::bulk_insert(&cx, &conn, &items, &BulkOptions::default()).await;
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite storage |
//! |-------|----------------|
//! | `Bool` | INTEGER (0/1) |
//! | `TinyInt` .. `BigInt` | INTEGER |
//! | `Float`, `Double` | REAL |
//! | `Text`, `Decimal` | TEXT |
//! | `Bytes`, `Uuid` | BLOB |
//! | `Date`, `Time`, `Timestamp` | TEXT (ISO-8601) |
//! | `Json` | TEXT |
//!
//! Integers always read back as `BigInt`; the bulk engine narrows generated
//! keys to the key column's declared type.
//!
//! # Thread Safety
//!
//! `SqliteConnection` is both `Send` and `Sync`; a mutex guards the handle.

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection};

/// The linked SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// The linked SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}

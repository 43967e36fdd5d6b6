//! Core types and traits for sqlbulk.
//!
//! This crate provides the foundational abstractions shared by the bulk
//! engine and the drivers:
//!
//! - `Model` trait and `ColumnDefinition` for compile-time column mapping
//! - `Connection` trait, including the bulk-copy channel
//! - `Value`, `Row` and `TableBuffer` for moving data in and out
//! - `Dialect` and identifier quoting helpers
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod buffer;
pub mod column;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod row;
pub mod types;
pub mod value;

pub use buffer::TableBuffer;
pub use column::ColumnDefinition;
pub use connection::Connection;
pub use dialect::Dialect;
pub use error::{BulkError, BulkErrorKind, BulkProgress, Error, Result};
pub use identifiers::{quote_ident, quote_ident_mssql, quote_ident_mysql, validate_identifier};
pub use model::Model;
pub use row::{FromValue, Row, decode_column};
pub use types::SqlType;
pub use value::Value;

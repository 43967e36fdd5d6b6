//! Column definitions for mapped entities.

use crate::types::SqlType;

/// Metadata about one persisted column of an entity.
///
/// The derive macro emits a `&'static [ColumnDefinition]` per entity in
/// declared field order; the bulk engine reads it to decide which columns
/// travel through the staging table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Rust field name
    pub field: &'static str,
    /// Database column name (may differ from field name)
    pub name: &'static str,
    /// SQL type for this column
    pub sql_type: SqlType,
    /// Explicit storage type (e.g. "NVARCHAR(200)", "DECIMAL(10,2)").
    /// When set, staging tables use it verbatim instead of `sql_type`.
    pub sql_type_override: Option<&'static str>,
    /// Rust type of the field, as written in the struct
    pub rust_type: &'static str,
    /// Whether this column accepts NULL
    pub nullable: bool,
    /// Whether this column is part of the primary key
    pub primary_key: bool,
    /// Whether the database generates this column's value on insert
    /// (identity / auto-increment)
    pub generated: bool,
    /// Whether this column is computed by the database and never written
    pub computed: bool,
}

impl ColumnDefinition {
    /// Create a new column definition with minimal required data.
    pub const fn new(field: &'static str, name: &'static str, sql_type: SqlType) -> Self {
        Self {
            field,
            name,
            sql_type,
            sql_type_override: None,
            rust_type: "",
            nullable: false,
            primary_key: false,
            generated: false,
            computed: false,
        }
    }

    /// Set explicit storage type override.
    pub const fn sql_type_override(mut self, type_str: &'static str) -> Self {
        self.sql_type_override = Some(type_str);
        self
    }

    /// Set storage type override from optional.
    pub const fn sql_type_override_opt(mut self, type_str: Option<&'static str>) -> Self {
        self.sql_type_override = type_str;
        self
    }

    /// Record the Rust type of the field.
    pub const fn rust_type(mut self, name: &'static str) -> Self {
        self.rust_type = name;
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set generated (identity) flag.
    pub const fn generated(mut self, value: bool) -> Self {
        self.generated = value;
        self
    }

    /// Set computed flag.
    pub const fn computed(mut self, value: bool) -> Self {
        self.computed = value;
        self
    }

    /// Whether the database assigns this column's value on insert and
    /// reports it back through a returning clause.
    pub const fn is_generated_key(&self) -> bool {
        self.primary_key && self.generated
    }

    /// Whether values for this column can be written at all.
    pub const fn is_writable(&self) -> bool {
        !self.computed
    }
}

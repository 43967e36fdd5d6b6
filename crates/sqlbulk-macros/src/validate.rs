//! Compile-time validation for the Model derive macro.
//!
//! Problems are collected and reported together so one build shows every
//! mistake in a struct, each pointing at the offending field.

use std::collections::HashSet;

use proc_macro2::Span;
use syn::{Error, GenericArgument, PathArguments, Type};

use crate::parse::{FieldDef, ModelDef};

/// Column name the bulk engine adds to every staging table.
const RESERVED_COLUMN: &str = "RowIndex";

/// Longest identifier accepted, matching SQL Server's limit.
const MAX_IDENTIFIER_LEN: usize = 128;

/// Validate a parsed model definition, returning combined errors.
pub fn validate_model(model: &ModelDef) -> Result<(), Error> {
    let mut errors = Vec::new();

    validate_has_fields(model, &mut errors);
    validate_identifier(&model.table_name, "table", model.name.span(), &mut errors);
    validate_no_duplicate_columns(model, &mut errors);

    for field in model.persisted_fields() {
        validate_field(field, &mut errors);
    }

    validate_identity_has_pk(model, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let mut combined = errors.remove(0);
        for err in errors {
            combined.combine(err);
        }
        Err(combined)
    }
}

/// At least one field must map to a column.
fn validate_has_fields(model: &ModelDef, errors: &mut Vec<Error>) {
    if model.persisted_fields().next().is_none() {
        errors.push(Error::new(
            model.name.span(),
            "Model struct must have at least one persisted field",
        ));
    }
}

/// Names are always quoted when emitted, so only reject what quoting
/// cannot carry.
fn validate_identifier(name: &str, what: &str, span: Span, errors: &mut Vec<Error>) {
    if name.trim().is_empty() {
        errors.push(Error::new(
            span,
            format!("{what} name cannot be empty or whitespace"),
        ));
        return;
    }

    if name.chars().count() > MAX_IDENTIFIER_LEN {
        errors.push(Error::new(
            span,
            format!("{what} name '{name}' is longer than {MAX_IDENTIFIER_LEN} characters"),
        ));
    }

    if name.chars().any(char::is_control) {
        errors.push(Error::new(
            span,
            format!("{what} name contains a control character"),
        ));
    }
}

/// No two persisted fields may map to the same column.
fn validate_no_duplicate_columns(model: &ModelDef, errors: &mut Vec<Error>) {
    let mut seen_columns: HashSet<String> = HashSet::new();

    for field in model.persisted_fields() {
        if !seen_columns.insert(field.column_name.to_lowercase()) {
            errors.push(Error::new(
                field.name.span(),
                format!(
                    "duplicate column name '{}'; another field already maps to this column",
                    field.column_name
                ),
            ));
        }
    }
}

/// `identity` only makes sense on a key the database assigns.
fn validate_identity_has_pk(model: &ModelDef, errors: &mut Vec<Error>) {
    for field in model.persisted_fields() {
        if field.identity && !field.primary_key {
            errors.push(Error::new(
                field.name.span(),
                "identity requires primary_key; add #[bulk(primary_key)] to this field",
            ));
        }
    }
}

fn validate_field(field: &FieldDef, errors: &mut Vec<Error>) {
    let span = field.name.span();
    validate_identifier(&field.column_name, "column", span, errors);

    if field.column_name.eq_ignore_ascii_case(RESERVED_COLUMN) {
        errors.push(Error::new(
            span,
            format!(
                "column name '{}' is reserved for staging row order; \
                 rename the column with #[bulk(column = \"...\")]",
                field.column_name
            ),
        ));
    }

    if field.computed && field.primary_key && !field.identity {
        errors.push(Error::new(
            span,
            "a computed column cannot be a primary key unless it is also an identity",
        ));
    }

    validate_type(&field.ty, span, errors);
}

/// Validate that a type is supported.
fn validate_type(ty: &Type, span: Span, errors: &mut Vec<Error>) {
    if is_nested_option(ty) {
        errors.push(Error::new(
            span,
            "nested Option<Option<T>> is ambiguous and not supported; \
             use a single Option<T> or a custom type",
        ));
    }

    if matches!(ty, Type::Reference(_)) {
        errors.push(Error::new(
            span,
            "reference types (&T) are not supported; use owned types instead",
        ));
    }

    if matches!(ty, Type::Ptr(_)) {
        errors.push(Error::new(
            span,
            "raw pointer types (*const T, *mut T) are not supported; use owned types instead",
        ));
    }
}

/// Check if a type is Option<Option<T>>.
fn is_nested_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(Type::Path(inner_path))) = args.args.first() {
                        if let Some(inner_seg) = inner_path.path.segments.last() {
                            return inner_seg.ident == "Option";
                        }
                    }
                }
            }
        }
    }
    false
}

//! Parsing logic for the Model derive macro.
//!
//! This module extracts struct-level and field-level `#[bulk(...)]`
//! attributes from the derive input to build `ModelDef` and `FieldDef`
//! structures used for code generation.

use proc_macro2::Span;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Generics, Ident, Lit, Result, Type};

/// Parsed model definition from a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    /// The struct name (e.g., `TodoItem`).
    pub name: Ident,
    /// The SQL table name (e.g., `"TodoItems"`).
    pub table_name: String,
    /// Parsed field definitions, in declared order.
    pub fields: Vec<FieldDef>,
    /// Generic parameters from the struct.
    pub generics: Generics,
}

/// Parsed field definition from a struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name.
    pub name: Ident,
    /// The database column name.
    pub column_name: String,
    /// The Rust type.
    pub ty: Type,
    /// Explicit storage type from `sql_type = "..."`.
    pub sql_type: Option<String>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Value generated by the database on insert.
    pub identity: bool,
    /// Value computed by the database, never written.
    pub computed: bool,
    /// Not persisted at all.
    pub skip: bool,
}

impl ModelDef {
    /// Fields that map to a column, in declared order.
    pub fn persisted_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.skip)
    }
}

/// Parse a `DeriveInput` into a `ModelDef`.
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();
    let table_name = parse_struct_attrs(&input.attrs, &name)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    Ok(ModelDef {
        name,
        table_name,
        fields,
        generics,
    })
}

/// Parse struct-level `#[bulk(table = "...")]`.
///
/// Without an explicit table the struct name is pluralized, so `TodoItem`
/// maps to `TodoItems`.
fn parse_struct_attrs(attrs: &[Attribute], struct_name: &Ident) -> Result<String> {
    let mut table_name: Option<String> = None;

    for attr in attrs {
        if !attr.path().is_ident("bulk") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: Lit = meta.value()?.parse()?;
                if let Lit::Str(lit_str) = value {
                    if table_name.is_some() {
                        return Err(Error::new_spanned(
                            meta.path,
                            "duplicate bulk attribute: table",
                        ));
                    }
                    table_name = Some(lit_str.value());
                    Ok(())
                } else {
                    Err(Error::new_spanned(
                        value,
                        "expected string literal for table name",
                    ))
                }
            } else {
                let path_str = meta
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                Err(Error::new_spanned(
                    meta.path,
                    format!("unknown bulk struct attribute `{path_str}`; expected `table`"),
                ))
            }
        })?;
    }

    Ok(table_name.unwrap_or_else(|| pluralize(&struct_name.to_string())))
}

/// Simple English pluralization of a PascalCase name.
fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return word.to_string();
    }

    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }

    if let Some(stripped) = word.strip_suffix('y') {
        if let Some(prev) = stripped.chars().last() {
            if !"aeiouAEIOU".contains(prev) {
                return format!("{stripped}ies");
            }
        }
    }

    format!("{word}s")
}

/// Parse all fields from a struct.
fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Model requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Model requires a struct with fields, not a unit struct",
        )),
    }
}

/// Parse a single field and its attributes.
fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let ty = field.ty.clone();
    let attrs = parse_field_attrs(&field.attrs, &name)?;
    let column_name = attrs
        .column
        .unwrap_or_else(|| name.to_string().trim_start_matches("r#").to_string());

    Ok(FieldDef {
        name,
        column_name,
        nullable: attrs.nullable || is_option_type(&ty),
        ty,
        sql_type: attrs.sql_type,
        primary_key: attrs.primary_key,
        identity: attrs.identity,
        computed: attrs.computed,
        skip: attrs.skip,
    })
}

/// Intermediate struct for collecting field attributes.
#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    sql_type: Option<String>,
    nullable: bool,
    primary_key: bool,
    identity: bool,
    computed: bool,
    skip: bool,
}

/// Parse all `#[bulk(...)]` attributes on a field.
fn parse_field_attrs(attrs: &[Attribute], field_name: &Ident) -> Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("bulk") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("primary_key") || path.is_ident("key") {
                result.primary_key = true;
            } else if path.is_ident("identity") || path.is_ident("auto_increment") {
                result.identity = true;
            } else if path.is_ident("computed") {
                result.computed = true;
            } else if path.is_ident("nullable") {
                result.nullable = true;
            } else if path.is_ident("skip") {
                result.skip = true;
            } else if path.is_ident("column") {
                let value: Lit = meta.value()?.parse()?;
                if let Lit::Str(lit_str) = value {
                    result.column = Some(lit_str.value());
                } else {
                    return Err(Error::new_spanned(
                        value,
                        "expected string literal for column name",
                    ));
                }
            } else if path.is_ident("sql_type") {
                let value: Lit = meta.value()?.parse()?;
                if let Lit::Str(lit_str) = value {
                    result.sql_type = Some(lit_str.value());
                } else {
                    return Err(Error::new_spanned(
                        value,
                        "expected string literal for sql_type",
                    ));
                }
            } else {
                let path_str = path
                    .get_ident()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown bulk attribute `{path_str}`; expected one of: \
                         primary_key, identity, computed, nullable, skip, column, sql_type"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    if result.skip && (result.primary_key || result.identity || result.computed) {
        return Err(Error::new_spanned(
            field_name,
            "`skip` excludes the field from the mapping; it cannot be combined with \
             primary_key, identity or computed",
        ));
    }

    Ok(result)
}

/// Check if a type is `Option<T>`.
pub fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("TodoItem"), "TodoItems");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Day"), "Days");
        assert_eq!(pluralize("Box"), "Boxes");
    }

    #[test]
    fn test_parse_model_reads_attributes() {
        let input: DeriveInput = parse_quote! {
            #[bulk(table = "TodoItems")]
            struct TodoItem {
                #[bulk(primary_key, identity, column = "Id")]
                id: i64,
                #[bulk(column = "Name", sql_type = "NVARCHAR(200)")]
                name: Option<String>,
                #[bulk(skip)]
                tags: Vec<String>,
            }
        };
        let model = parse_model(&input).unwrap();

        assert_eq!(model.table_name, "TodoItems");
        assert_eq!(model.fields.len(), 3);
        assert_eq!(model.persisted_fields().count(), 2);

        let id = &model.fields[0];
        assert!(id.primary_key && id.identity && !id.nullable);
        assert_eq!(id.column_name, "Id");

        let name = &model.fields[1];
        assert!(name.nullable);
        assert_eq!(name.sql_type.as_deref(), Some("NVARCHAR(200)"));
    }

    #[test]
    fn test_default_table_and_column_names() {
        let input: DeriveInput = parse_quote! {
            struct TodoItem {
                is_complete: bool,
            }
        };
        let model = parse_model(&input).unwrap();
        assert_eq!(model.table_name, "TodoItems");
        assert_eq!(model.fields[0].column_name, "is_complete");
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let input: DeriveInput = parse_quote! {
            struct T {
                #[bulk(unique)]
                id: i64,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_skip_conflicts_rejected() {
        let input: DeriveInput = parse_quote! {
            struct T {
                #[bulk(skip, primary_key)]
                id: i64,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_rejects_tuple_struct() {
        let input: DeriveInput = parse_quote! {
            struct T(i64);
        };
        assert!(parse_model(&input).is_err());
    }
}

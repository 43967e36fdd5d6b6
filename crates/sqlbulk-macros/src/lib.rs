//! Procedural macros for sqlbulk.
//!
//! `sqlbulk-macros` is the compile-time mapping layer. `#[derive(Model)]`
//! turns a struct into a table mapping: the table name, one
//! `ColumnDefinition` per persisted field in declared order, a row reader
//! and a column writer used to hand generated keys back to the entity.
//!
//! These macros are used by application crates via the `sqlbulk` facade.
//! Generated code refers to `sqlbulk_core`, so that crate must be a
//! dependency of the deriving crate.

use proc_macro::TokenStream;

mod infer;
mod parse;
mod validate;

use parse::{ModelDef, parse_model};

/// Derive macro for the `Model` trait.
///
/// # Attributes
///
/// - `#[bulk(table = "name")]` - Table name (defaults to the pluralized struct name)
/// - `#[bulk(primary_key)]` - Mark field as part of the primary key
/// - `#[bulk(identity)]` - Key value is generated by the database on insert
/// - `#[bulk(computed)]` - Column is computed by the database and never written
/// - `#[bulk(column = "name")]` - Override column name (defaults to the field name)
/// - `#[bulk(sql_type = "NVARCHAR(200)")]` - Explicit storage type
/// - `#[bulk(nullable)]` - Mark column as nullable (implied by `Option<T>`)
/// - `#[bulk(skip)]` - Field is not persisted
///
/// Every persisted field type must convert into `Value` and implement
/// `FromValue`.
///
/// # Example
///
/// ```ignore
/// use sqlbulk::Model;
///
/// #[derive(Model)]
/// #[bulk(table = "TodoItems")]
/// struct TodoItem {
///     #[bulk(primary_key, identity, column = "Id")]
///     id: i64,
///
///     #[bulk(column = "Name", sql_type = "NVARCHAR(200)")]
///     name: Option<String>,
///
///     #[bulk(column = "IsComplete")]
///     is_complete: bool,
/// }
/// ```
#[proc_macro_derive(Model, attributes(bulk))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let model = match parse_model(&input) {
        Ok(m) => m,
        Err(e) => return e.to_compile_error().into(),
    };

    if let Err(e) = validate::validate_model(&model) {
        return e.to_compile_error().into();
    }

    generate_model_impl(&model).into()
}

/// Generate the Model trait implementation from parsed model definition.
fn generate_model_impl(model: &ModelDef) -> proc_macro2::TokenStream {
    let name = &model.name;
    let table_name = &model.table_name;
    let (impl_generics, ty_generics, where_clause) = model.generics.split_for_impl();

    let column_defs = generate_column_definitions(model);
    let to_row_body = generate_to_row(model);
    let set_column_body = generate_set_column(model);

    quote::quote! {
        impl #impl_generics sqlbulk_core::Model for #name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table_name;

            fn columns() -> &'static [sqlbulk_core::ColumnDefinition] {
                static COLUMNS: &[sqlbulk_core::ColumnDefinition] = &[
                    #(#column_defs),*
                ];
                COLUMNS
            }

            fn to_row(&self) -> ::std::vec::Vec<(&'static str, sqlbulk_core::Value)> {
                #to_row_body
            }

            fn set_column(
                &mut self,
                column: &str,
                value: &sqlbulk_core::Value,
            ) -> sqlbulk_core::Result<()> {
                #set_column_body
            }
        }
    }
}

/// One `ColumnDefinition` constructor expression per persisted field.
fn generate_column_definitions(model: &ModelDef) -> Vec<proc_macro2::TokenStream> {
    model
        .persisted_fields()
        .map(|field| {
            let field_ident = field.name.to_string();
            let field_lit = field_ident.trim_start_matches("r#");
            let column_name = &field.column_name;
            let rust_type = infer::type_to_string(&field.ty);
            let nullable = field.nullable;
            let primary_key = field.primary_key;
            let generated = field.identity;
            let computed = field.computed;

            let (sql_type, override_opt) = match &field.sql_type {
                Some(raw) => (
                    infer::parse_sql_type_attr(raw),
                    quote::quote! { ::core::option::Option::Some(#raw) },
                ),
                None => (
                    infer::infer_sql_type(&field.ty),
                    quote::quote! { ::core::option::Option::None },
                ),
            };

            quote::quote! {
                sqlbulk_core::ColumnDefinition::new(#field_lit, #column_name, #sql_type)
                    .sql_type_override_opt(#override_opt)
                    .rust_type(#rust_type)
                    .nullable(#nullable)
                    .primary_key(#primary_key)
                    .generated(#generated)
                    .computed(#computed)
            }
        })
        .collect()
}

/// Generate the to_row method body.
fn generate_to_row(model: &ModelDef) -> proc_macro2::TokenStream {
    let conversions = model.persisted_fields().map(|field| {
        let field_name = &field.name;
        let column_name = &field.column_name;

        if parse::is_option_type(&field.ty) {
            quote::quote! {
                (#column_name, match &self.#field_name {
                    ::core::option::Option::Some(v) => sqlbulk_core::Value::from(v.clone()),
                    ::core::option::Option::None => sqlbulk_core::Value::Null,
                })
            }
        } else {
            quote::quote! {
                (#column_name, sqlbulk_core::Value::from(self.#field_name.clone()))
            }
        }
    });

    quote::quote! {
        vec![#(#conversions),*]
    }
}

/// Generate the set_column method body.
fn generate_set_column(model: &ModelDef) -> proc_macro2::TokenStream {
    let arms = model.persisted_fields().map(|field| {
        let field_name = &field.name;
        let column_name = &field.column_name;
        let ty = &field.ty;

        quote::quote! {
            #column_name => {
                self.#field_name = sqlbulk_core::decode_column::<#ty>(column, value)?;
            }
        }
    });

    quote::quote! {
        match column {
            #(#arms)*
            other => {
                return ::core::result::Result::Err(sqlbulk_core::Error::Type(
                    sqlbulk_core::error::TypeError {
                        expected: "a column mapped by this model",
                        actual: ::std::format!("unknown column '{}'", other),
                        column: ::core::option::Option::Some(other.to_string()),
                        rust_type: ::core::option::Option::None,
                    },
                ));
            }
        }
        ::core::result::Result::Ok(())
    }
}

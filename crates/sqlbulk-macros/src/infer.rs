//! SQL type inference from Rust types.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, PathArguments, Type};

/// Infer the SQL type from a Rust field type, returning a TokenStream that
/// constructs the matching `SqlType` variant. `Option<T>` infers from `T`.
pub fn infer_sql_type(ty: &Type) -> TokenStream {
    let inner_ty = unwrap_option_type(ty);
    let type_str = type_to_string(inner_ty);

    match type_str.as_str() {
        "bool" => quote! { sqlbulk_core::SqlType::Boolean },

        "i8" => quote! { sqlbulk_core::SqlType::TinyInt },
        "i16" | "u8" => quote! { sqlbulk_core::SqlType::SmallInt },
        "i32" | "u16" => quote! { sqlbulk_core::SqlType::Integer },
        "i64" | "u32" | "u64" => quote! { sqlbulk_core::SqlType::BigInt },

        "f32" => quote! { sqlbulk_core::SqlType::Real },
        "f64" => quote! { sqlbulk_core::SqlType::Double },

        "String" => quote! { sqlbulk_core::SqlType::Text },
        "char" => quote! { sqlbulk_core::SqlType::Char(1) },

        "Vec<u8>" => quote! { sqlbulk_core::SqlType::Blob },

        "[u8;16]" | "Uuid" | "uuid::Uuid" => quote! { sqlbulk_core::SqlType::Uuid },

        "serde_json::Value" => quote! { sqlbulk_core::SqlType::Json },

        // most permissive fallback
        _ => quote! { sqlbulk_core::SqlType::Text },
    }
}

/// Parse an explicit `sql_type = "..."` string into a `SqlType` TokenStream.
///
/// Unknown spellings become `SqlType::Custom` with the original text.
pub fn parse_sql_type_attr(sql_type: &str) -> TokenStream {
    let upper = sql_type.to_uppercase();
    let trimmed = upper.trim();

    if let Some(len) = sized(trimmed, "VARCHAR(").or_else(|| sized(trimmed, "NVARCHAR(")) {
        return quote! { sqlbulk_core::SqlType::VarChar(#len) };
    }
    if let Some(len) = sized(trimmed, "CHAR(").or_else(|| sized(trimmed, "NCHAR(")) {
        return quote! { sqlbulk_core::SqlType::Char(#len) };
    }
    if let Some(len) = sized(trimmed, "VARBINARY(") {
        return quote! { sqlbulk_core::SqlType::VarBinary(#len) };
    }
    for prefix in ["DECIMAL(", "NUMERIC("] {
        if let Some(params) = trimmed
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            if let Some((p_str, s_str)) = params.split_once(',') {
                if let (Ok(p), Ok(s)) = (p_str.trim().parse::<u8>(), s_str.trim().parse::<u8>()) {
                    return quote! { sqlbulk_core::SqlType::Decimal { precision: #p, scale: #s } };
                }
            }
        }
    }

    match trimmed {
        "TINYINT" => quote! { sqlbulk_core::SqlType::TinyInt },
        "SMALLINT" | "INT2" => quote! { sqlbulk_core::SqlType::SmallInt },
        "INTEGER" | "INT" | "INT4" => quote! { sqlbulk_core::SqlType::Integer },
        "BIGINT" | "INT8" => quote! { sqlbulk_core::SqlType::BigInt },
        "REAL" | "FLOAT4" => quote! { sqlbulk_core::SqlType::Real },
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" | "FLOAT" => {
            quote! { sqlbulk_core::SqlType::Double }
        }
        "DECIMAL" | "NUMERIC" => {
            quote! { sqlbulk_core::SqlType::Decimal { precision: 38, scale: 18 } }
        }
        "BOOLEAN" | "BOOL" | "BIT" => quote! { sqlbulk_core::SqlType::Boolean },
        "TEXT" | "NVARCHAR(MAX)" | "VARCHAR(MAX)" | "NTEXT" => {
            quote! { sqlbulk_core::SqlType::Text }
        }
        "BLOB" | "BYTEA" | "VARBINARY(MAX)" => quote! { sqlbulk_core::SqlType::Blob },
        "DATE" => quote! { sqlbulk_core::SqlType::Date },
        "TIME" => quote! { sqlbulk_core::SqlType::Time },
        "DATETIME" | "DATETIME2" => quote! { sqlbulk_core::SqlType::DateTime },
        "TIMESTAMP" => quote! { sqlbulk_core::SqlType::Timestamp },
        "TIMESTAMPTZ" | "DATETIMEOFFSET" | "TIMESTAMP WITH TIME ZONE" => {
            quote! { sqlbulk_core::SqlType::TimestampTz }
        }
        "UUID" | "UNIQUEIDENTIFIER" => quote! { sqlbulk_core::SqlType::Uuid },
        "JSON" | "JSONB" => quote! { sqlbulk_core::SqlType::Json },
        _ => {
            let custom = sql_type;
            quote! { sqlbulk_core::SqlType::Custom(#custom) }
        }
    }
}

/// `PREFIX(n)` → `n`.
fn sized(s: &str, prefix: &str) -> Option<u32> {
    s.strip_prefix(prefix)?
        .strip_suffix(')')?
        .trim()
        .parse::<u32>()
        .ok()
}

/// Unwrap Option<T> to get the inner type, or return the original type.
fn unwrap_option_type(ty: &Type) -> &Type {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return inner;
                    }
                }
            }
        }
    }
    ty
}

/// Convert a Type to a simplified string representation for matching.
pub fn type_to_string(ty: &Type) -> String {
    use quote::ToTokens;
    ty.to_token_stream().to_string().replace(' ', "")
}

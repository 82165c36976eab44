//! PostgreSQL schema introspection.
//!
//! Table definitions are discovered from `information_schema.columns` and
//! the primary key from `pg_index`.

use crate::sql::qualified_name;
use anyhow::{Context, Result};
use sync_core::{ColumnDefinition, TableDefinition, UniversalType};
use tokio_postgres::Client;
use tracing::debug;

/// Convert PostgreSQL INFORMATION_SCHEMA column type to UniversalType.
///
/// # Arguments
///
/// * `data_type` - The PostgreSQL data type name (e.g., "integer", "character varying")
/// * `char_length` - `character_maximum_length`, for character types
/// * `precision` - `numeric_precision`, for numeric types
/// * `scale` - `numeric_scale`, for numeric types
///
/// # Example
///
/// ```
/// use asset_sync_postgresql::postgresql_column_to_universal_type;
/// use sync_core::UniversalType;
///
/// let ut = postgresql_column_to_universal_type("integer", None, None, None);
/// assert_eq!(ut, UniversalType::Int32);
///
/// let ut = postgresql_column_to_universal_type("numeric", None, Some(10), Some(2));
/// assert_eq!(ut, UniversalType::decimal(10, 2));
/// ```
pub fn postgresql_column_to_universal_type(
    data_type: &str,
    char_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> UniversalType {
    let length = |default: u16| {
        char_length
            .and_then(|l| u16::try_from(l).ok())
            .unwrap_or(default)
    };

    match data_type.to_lowercase().as_str() {
        // Numeric types
        "smallint" | "int2" => UniversalType::Int16,
        "integer" | "int" | "int4" => UniversalType::Int32,
        "bigint" | "int8" => UniversalType::Int64,
        "real" | "float4" => UniversalType::Float32,
        "double precision" | "float8" => UniversalType::Float64,
        "numeric" | "decimal" => UniversalType::Decimal {
            // Unconstrained numeric reports no precision; cap at 38
            precision: precision
                .and_then(|p| u8::try_from(p.min(38)).ok())
                .unwrap_or(38),
            scale: scale.and_then(|s| u8::try_from(s.min(38)).ok()).unwrap_or(10),
        },

        // Boolean
        "boolean" | "bool" => UniversalType::Bool,

        // String types
        "text" | "name" | "citext" => UniversalType::Text,
        "character varying" | "varchar" => match char_length {
            Some(_) => UniversalType::VarChar { length: length(0) },
            None => UniversalType::Text,
        },
        "character" | "char" | "bpchar" => UniversalType::Char { length: length(1) },

        // Binary
        "bytea" => UniversalType::Bytes,

        // Date/Time types
        "date" => UniversalType::Date,
        "time" | "time without time zone" => UniversalType::Time,
        "timestamp" | "timestamp without time zone" => UniversalType::LocalDateTime,
        "timestamptz" | "timestamp with time zone" => UniversalType::ZonedDateTime,

        // UUID
        "uuid" => UniversalType::Uuid,

        // JSON types
        "json" => UniversalType::Json,
        "jsonb" => UniversalType::Jsonb,

        // Fallback to Text for unknown types
        _ => UniversalType::Text,
    }
}

/// Read the definition of `schema.table`.
///
/// Returns `None` if the table does not exist.
pub async fn read_table_definition(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Option<TableDefinition>> {
    let rows = client
        .query(
            "SELECT column_name::text, data_type::text, is_nullable::text, \
                    character_maximum_length::int4, numeric_precision::int4, numeric_scale::int4 \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
            &[&schema, &table],
        )
        .await
        .with_context(|| format!("Failed to read columns of {}", qualified_name(schema, table)))?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.try_get(0)?;
        let data_type: String = row.try_get(1)?;
        let is_nullable: String = row.try_get(2)?;
        let column_type = postgresql_column_to_universal_type(
            &data_type,
            row.try_get(3)?,
            row.try_get(4)?,
            row.try_get(5)?,
        );
        debug!("Column {table}.{name}: {data_type} -> {column_type}");
        columns.push(ColumnDefinition {
            name,
            column_type,
            nullable: is_nullable.eq_ignore_ascii_case("YES"),
        });
    }

    let primary_key = get_primary_key_columns(client, schema, table).await?;
    Ok(Some(
        TableDefinition::new(table, columns).with_primary_key(primary_key),
    ))
}

/// Get primary key columns of a table, in key order. Empty if the table has
/// no primary key.
pub async fn get_primary_key_columns(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT a.attname::text AS column_name
             FROM pg_index i
             JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
             WHERE i.indrelid = ($1::text)::regclass
             AND i.indisprimary
             ORDER BY array_position(i.indkey, a.attnum)",
            &[&qualified_name(schema, table)],
        )
        .await
        .with_context(|| {
            format!(
                "Failed to read primary key of {}",
                qualified_name(schema, table)
            )
        })?;

    rows.iter()
        .map(|row| row.try_get::<_, String>(0).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgresql_int_types() {
        assert_eq!(
            postgresql_column_to_universal_type("smallint", None, Some(16), Some(0)),
            UniversalType::Int16
        );
        assert_eq!(
            postgresql_column_to_universal_type("integer", None, Some(32), Some(0)),
            UniversalType::Int32
        );
        assert_eq!(
            postgresql_column_to_universal_type("bigint", None, Some(64), Some(0)),
            UniversalType::Int64
        );
    }

    #[test]
    fn test_postgresql_float_types() {
        assert_eq!(
            postgresql_column_to_universal_type("real", None, Some(24), None),
            UniversalType::Float32
        );
        assert_eq!(
            postgresql_column_to_universal_type("double precision", None, Some(53), None),
            UniversalType::Float64
        );
    }

    #[test]
    fn test_postgresql_decimal_types() {
        assert_eq!(
            postgresql_column_to_universal_type("numeric", None, Some(18), Some(4)),
            UniversalType::decimal(18, 4)
        );
        // Unconstrained numeric
        assert_eq!(
            postgresql_column_to_universal_type("numeric", None, None, None),
            UniversalType::decimal(38, 10)
        );
        // Precision capping at 38
        assert_eq!(
            postgresql_column_to_universal_type("numeric", None, Some(50), Some(10)),
            UniversalType::decimal(38, 10)
        );
    }

    #[test]
    fn test_postgresql_string_types() {
        assert_eq!(
            postgresql_column_to_universal_type("text", None, None, None),
            UniversalType::Text
        );
        // VARCHAR without length is treated as Text
        assert_eq!(
            postgresql_column_to_universal_type("character varying", None, None, None),
            UniversalType::Text
        );
        assert_eq!(
            postgresql_column_to_universal_type("character varying", Some(255), None, None),
            UniversalType::varchar(255)
        );
        assert_eq!(
            postgresql_column_to_universal_type("character", Some(10), None, None),
            UniversalType::char(10)
        );
    }

    #[test]
    fn test_postgresql_datetime_types() {
        assert_eq!(
            postgresql_column_to_universal_type("date", None, None, None),
            UniversalType::Date
        );
        assert_eq!(
            postgresql_column_to_universal_type("timestamp without time zone", None, None, None),
            UniversalType::LocalDateTime
        );
        assert_eq!(
            postgresql_column_to_universal_type("timestamp with time zone", None, None, None),
            UniversalType::ZonedDateTime
        );
        assert_eq!(
            postgresql_column_to_universal_type("time without time zone", None, None, None),
            UniversalType::Time
        );
    }

    #[test]
    fn test_postgresql_unknown_type_falls_back_to_text() {
        assert_eq!(
            postgresql_column_to_universal_type("tsvector", None, None, None),
            UniversalType::Text
        );
    }
}

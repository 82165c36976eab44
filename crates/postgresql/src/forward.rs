//! Forward conversion: TypedValue → PostgreSQL parameter
//!
//! Values are conformed to the declared column type before they are bound,
//! so a loosely typed incoming value (e.g. the text `"10.5"` for a
//! `double precision` column) is sent as the native type. Nulls keep their
//! declared type as well, which lets the server resolve parameters such as
//! `$1` in `SET "PRECO" = $1` without guessing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sync_core::{TypedValue, UniversalType, UniversalValue};
use thiserror::Error;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

/// A value that cannot be bound to its declared column type.
#[derive(Debug, Error, PartialEq)]
#[error("invalid input for type {column_type}: {value}")]
pub struct ConversionError {
    pub column_type: UniversalType,
    pub value: String,
}

/// PostgreSQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum PostgreSQLValue {
    /// Null of the given declared type
    Null(UniversalType),
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Timestamp without timezone
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl TryFrom<&TypedValue> for PostgreSQLValue {
    type Error = ConversionError;

    fn try_from(typed: &TypedValue) -> Result<Self, Self::Error> {
        let invalid = || ConversionError {
            column_type: typed.column_type.clone(),
            value: typed.value.canonical_string(),
        };
        let value = typed.conformed().ok_or_else(invalid)?;

        let converted = match (&typed.column_type, value) {
            (ty, UniversalValue::Null) => Self::Null(ty.clone()),
            (UniversalType::Bool, UniversalValue::Bool(b)) => Self::Bool(b),
            (UniversalType::Int16, UniversalValue::Int(i)) => {
                Self::Int16(i16::try_from(i).map_err(|_| invalid())?)
            }
            (UniversalType::Int32, UniversalValue::Int(i)) => {
                Self::Int32(i32::try_from(i).map_err(|_| invalid())?)
            }
            (UniversalType::Int64, UniversalValue::Int(i)) => Self::Int64(i),
            (UniversalType::Float32, UniversalValue::Float(f)) => Self::Float32(f as f32),
            (UniversalType::Float64, UniversalValue::Float(f)) => Self::Float64(f),
            (UniversalType::Decimal { .. }, UniversalValue::Decimal(d)) => Self::Decimal(d),
            (
                UniversalType::Char { .. } | UniversalType::VarChar { .. } | UniversalType::Text,
                UniversalValue::Text(s),
            ) => Self::Text(s),
            (UniversalType::Bytes, UniversalValue::Bytes(b)) => Self::Bytes(b),
            (UniversalType::Uuid, UniversalValue::Uuid(u)) => Self::Uuid(u),
            (UniversalType::Date, UniversalValue::Date(d)) => Self::Date(d),
            (UniversalType::Time, UniversalValue::Time(t)) => Self::Time(t),
            (UniversalType::LocalDateTime, UniversalValue::DateTime(ts)) => Self::Timestamp(ts),
            (UniversalType::ZonedDateTime, UniversalValue::TimestampTz(ts)) => {
                Self::TimestampTz(ts)
            }
            (UniversalType::Json | UniversalType::Jsonb, UniversalValue::Json(j)) => Self::Json(j),
            _ => return Err(invalid()),
        };
        Ok(converted)
    }
}

/// Convert a PostgreSQLValue to a boxed ToSql trait object.
pub fn pg_value_to_boxed(value: PostgreSQLValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        PostgreSQLValue::Null(ty) => typed_null(&ty),
        PostgreSQLValue::Bool(b) => Box::new(b),
        PostgreSQLValue::Int16(i) => Box::new(i),
        PostgreSQLValue::Int32(i) => Box::new(i),
        PostgreSQLValue::Int64(i) => Box::new(i),
        PostgreSQLValue::Float32(f) => Box::new(f),
        PostgreSQLValue::Float64(f) => Box::new(f),
        PostgreSQLValue::Decimal(d) => Box::new(d),
        PostgreSQLValue::Text(s) => Box::new(s),
        PostgreSQLValue::Bytes(b) => Box::new(b),
        PostgreSQLValue::Uuid(u) => Box::new(u),
        PostgreSQLValue::Date(d) => Box::new(d),
        PostgreSQLValue::Time(t) => Box::new(t),
        PostgreSQLValue::Timestamp(ts) => Box::new(ts),
        PostgreSQLValue::TimestampTz(ts) => Box::new(ts),
        PostgreSQLValue::Json(j) => Box::new(j),
    }
}

fn typed_null(ty: &UniversalType) -> Box<dyn ToSql + Sync + Send> {
    match ty {
        UniversalType::Bool => Box::new(None::<bool>),
        UniversalType::Int16 => Box::new(None::<i16>),
        UniversalType::Int32 => Box::new(None::<i32>),
        UniversalType::Int64 => Box::new(None::<i64>),
        UniversalType::Float32 => Box::new(None::<f32>),
        UniversalType::Float64 => Box::new(None::<f64>),
        UniversalType::Decimal { .. } => Box::new(None::<Decimal>),
        UniversalType::Char { .. } | UniversalType::VarChar { .. } | UniversalType::Text => {
            Box::new(None::<String>)
        }
        UniversalType::Bytes => Box::new(None::<Vec<u8>>),
        UniversalType::Date => Box::new(None::<NaiveDate>),
        UniversalType::Time => Box::new(None::<NaiveTime>),
        UniversalType::LocalDateTime => Box::new(None::<NaiveDateTime>),
        UniversalType::ZonedDateTime => Box::new(None::<DateTime<Utc>>),
        UniversalType::Uuid => Box::new(None::<Uuid>),
        UniversalType::Json | UniversalType::Jsonb => Box::new(None::<serde_json::Value>),
    }
}

/// Convert statement parameters to boxed native values.
pub fn to_params(values: &[&TypedValue]) -> Result<Vec<Box<dyn ToSql + Sync + Send>>, ConversionError> {
    values
        .iter()
        .map(|v| PostgreSQLValue::try_from(*v).map(pg_value_to_boxed))
        .collect()
}

//! Reverse conversion: PostgreSQL row cell → UniversalValue

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sync_core::UniversalValue;
use tokio_postgres::types::Type;
use tokio_postgres::Row;

/// Convert a single cell of a PostgreSQL row.
pub fn convert_postgres_value(row: &Row, index: usize) -> Result<UniversalValue> {
    let column = &row.columns()[index];
    let pg_type = column.type_();

    let value = match *pg_type {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.into(),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(i64::from)
            .into(),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(i64::from)
            .into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.into(),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(f64::from)
            .into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.into(),
        Type::NUMERIC => row.try_get::<_, Option<Decimal>>(index)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(index)?.into()
        }
        Type::BYTEA => match row.try_get::<_, Option<Vec<u8>>>(index)? {
            Some(b) => UniversalValue::Bytes(b),
            None => UniversalValue::Null,
        },
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(index)?.into(),
        Type::TIME => match row.try_get::<_, Option<NaiveTime>>(index)? {
            Some(t) => UniversalValue::Time(t),
            None => UniversalValue::Null,
        },
        Type::TIMESTAMP => match row.try_get::<_, Option<NaiveDateTime>>(index)? {
            Some(ts) => UniversalValue::DateTime(ts),
            None => UniversalValue::Null,
        },
        Type::TIMESTAMPTZ => match row.try_get::<_, Option<DateTime<Utc>>>(index)? {
            Some(ts) => UniversalValue::TimestampTz(ts),
            None => UniversalValue::Null,
        },
        Type::UUID => match row.try_get::<_, Option<uuid::Uuid>>(index)? {
            Some(u) => UniversalValue::Uuid(u),
            None => UniversalValue::Null,
        },
        Type::JSON | Type::JSONB => match row.try_get::<_, Option<serde_json::Value>>(index)? {
            Some(j) => UniversalValue::Json(j),
            None => UniversalValue::Null,
        },
        _ => {
            // For unknown types, try to get as string
            match row.try_get::<_, Option<String>>(index) {
                Ok(s) => s.into(),
                Err(_) => anyhow::bail!(
                    "Unsupported PostgreSQL type {pg_type} in column '{}'",
                    column.name()
                ),
            }
        }
    };
    Ok(value)
}

/// Convert every cell of a row, in column order.
pub fn convert_row(row: &Row) -> Result<Vec<UniversalValue>> {
    (0..row.len())
        .map(|i| convert_postgres_value(row, i))
        .collect()
}

//! Scalar values held in snapshot cells.
//!
//! Incoming snapshots are produced by loosely typed sources (CSV, JSON,
//! scrapers) while baselines are read back from a typed store. To compare
//! the two, an incoming value is *conformed* to the declared type of the
//! baseline column, which mirrors what the store does when the value is
//! written and read back.

use crate::types::UniversalType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Date formats accepted when text is conformed to a date-like type.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Naive timestamp formats accepted when text is conformed to a date-like type.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A single cell value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniversalValue {
    /// Null value
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer value (all integer widths)
    Int(i64),

    /// Floating point value (both float widths)
    Float(f64),

    /// Exact decimal value
    Decimal(Decimal),

    /// Text value
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Calendar date
    Date(NaiveDate),

    /// Time of day
    Time(NaiveTime),

    /// Timestamp without timezone
    DateTime(NaiveDateTime),

    /// Timestamp with timezone, normalized to UTC
    TimestampTz(DateTime<Utc>),

    /// UUID value
    Uuid(Uuid),

    /// JSON document
    Json(serde_json::Value),
}

impl UniversalValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "date_time",
            Self::TimestampTz(_) => "timestamp_tz",
            Self::Uuid(_) => "uuid",
            Self::Json(_) => "json",
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Conform this value to a declared column type.
    ///
    /// Returns `None` when the value cannot be represented in that type.
    /// Null conforms to every type.
    pub fn try_conform(&self, ty: &UniversalType) -> Option<UniversalValue> {
        if self.is_null() {
            return Some(Self::Null);
        }
        match ty {
            UniversalType::Bool => self.to_bool().map(Self::Bool),
            UniversalType::Int16 => self
                .to_i64()
                .filter(|i| i16::try_from(*i).is_ok())
                .map(Self::Int),
            UniversalType::Int32 => self
                .to_i64()
                .filter(|i| i32::try_from(*i).is_ok())
                .map(Self::Int),
            UniversalType::Int64 => self.to_i64().map(Self::Int),
            UniversalType::Float32 => self.to_f64().map(|f| Self::Float(f as f32 as f64)),
            UniversalType::Float64 => self.to_f64().map(Self::Float),
            UniversalType::Decimal { scale, .. } => self
                .to_decimal()
                .map(|d| {
                    Self::Decimal(d.round_dp_with_strategy(
                        u32::from(*scale),
                        RoundingStrategy::MidpointAwayFromZero,
                    ))
                }),
            UniversalType::Char { length } => self.to_text().map(|s| {
                let width = usize::from(*length);
                let chars = s.chars().count();
                if chars < width {
                    Self::Text(format!("{s}{}", " ".repeat(width - chars)))
                } else {
                    Self::Text(s)
                }
            }),
            UniversalType::VarChar { .. } | UniversalType::Text => self.to_text().map(Self::Text),
            UniversalType::Bytes => match self {
                Self::Bytes(b) => Some(Self::Bytes(b.clone())),
                Self::Text(s) => Some(Self::Bytes(s.as_bytes().to_vec())),
                _ => None,
            },
            UniversalType::Date => self.to_date().map(Self::Date),
            UniversalType::Time => self.to_time().map(Self::Time),
            UniversalType::LocalDateTime => self.to_naive_datetime().map(Self::DateTime),
            UniversalType::ZonedDateTime => self.to_utc_datetime().map(Self::TimestampTz),
            UniversalType::Uuid => match self {
                Self::Uuid(u) => Some(Self::Uuid(*u)),
                Self::Text(s) => Uuid::parse_str(s.trim()).ok().map(Self::Uuid),
                _ => None,
            },
            UniversalType::Json | UniversalType::Jsonb => self.to_json().map(Self::Json),
        }
    }

    /// Conform this value to a declared column type, keeping it unchanged
    /// when it cannot be represented in that type.
    pub fn conform(&self, ty: &UniversalType) -> UniversalValue {
        self.try_conform(ty).unwrap_or_else(|| self.clone())
    }

    /// Exact equality as observed after a storage round-trip.
    ///
    /// Floats compare with `==`, except that two NaNs are equal.
    pub fn same_as(&self, other: &UniversalValue) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Canonical text rendering.
    ///
    /// Integral numbers render without a fractional part whatever their
    /// variant, so `Int(10)`, `Float(10.0)` and `Decimal(10.00)` all render
    /// as `10`.
    pub fn canonical_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Decimal(d) => d.normalize().to_string(),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Self::TimestampTz(dt) => dt.to_rfc3339(),
            Self::Uuid(u) => u.hyphenated().to_string(),
            Self::Json(v) => v.to_string(),
        }
    }

    fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            Self::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                let i = *f as i64;
                (i as f64 == *f).then_some(i)
            }
            Self::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    Decimal::from_str(s)
                        .ok()
                        .filter(|d| d.fract().is_zero())
                        .and_then(|d| i64::try_from(d).ok())
                })
            }
            _ => None,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Decimal(d) => f64::try_from(*d).ok(),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Int(i) => Some(Decimal::from(*i)),
            Self::Float(f) => Decimal::from_str(&format_float(*f)).ok(),
            Self::Text(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .ok()
                    .or_else(|| Decimal::from_scientific(s).ok())
            }
            _ => None,
        }
    }

    fn to_text(&self) -> Option<String> {
        match self {
            Self::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Bytes(b) => String::from_utf8(b.clone()).ok(),
            _ => Some(self.canonical_string()),
        }
    }

    fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::DateTime(dt) => Some(dt.date()),
            Self::TimestampTz(dt) => Some(dt.date_naive()),
            Self::Text(s) => parse_date(s),
            _ => None,
        }
    }

    fn to_time(&self) -> Option<NaiveTime> {
        match self {
            Self::Time(t) => Some(*t),
            Self::DateTime(dt) => Some(dt.time()),
            Self::Text(s) => {
                let s = s.trim();
                NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                    .ok()
            }
            _ => None,
        }
    }

    fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::TimestampTz(dt) => Some(dt.naive_utc()),
            Self::Date(d) => d.and_hms_opt(0, 0, 0),
            Self::Text(s) => parse_datetime(s).map(|dt| dt.naive_utc()),
            _ => None,
        }
    }

    fn to_utc_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampTz(dt) => Some(*dt),
            Self::DateTime(dt) => Some(dt.and_utc()),
            Self::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            Self::Text(s) => parse_datetime(s),
            _ => None,
        }
    }

    fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Json(v) => Some(v.clone()),
            Self::Text(s) => serde_json::from_str(s).ok(),
            Self::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Self::Int(i) => Some(serde_json::Value::from(*i)),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            _ => None,
        }
    }
}

impl PartialEq for UniversalValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::TimestampTz(a), Self::TimestampTz(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for UniversalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.canonical_string()),
        }
    }
}

impl From<&str> for UniversalValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for UniversalValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for UniversalValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for UniversalValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for UniversalValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for UniversalValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for UniversalValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Decimal> for UniversalValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<UniversalValue>> From<Option<T>> for UniversalValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Render a float with a single, stable format: integral values without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

/// Parse text as a calendar date, accepting plain dates and timestamps.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
}

/// Parse text as a timestamp. Naive timestamps are taken as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// A value together with the declared type of the column it is bound for.
///
/// Store adapters convert `TypedValue` into native parameters; the declared
/// type decides the native representation, including for nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    /// Declared type of the target column
    pub column_type: UniversalType,

    /// The value as supplied by the caller
    pub value: UniversalValue,
}

impl TypedValue {
    /// Create a new typed value.
    pub fn new(column_type: UniversalType, value: UniversalValue) -> Self {
        Self { column_type, value }
    }

    /// Create a typed null.
    pub fn null(column_type: UniversalType) -> Self {
        Self::new(column_type, UniversalValue::Null)
    }

    /// Check if the wrapped value is null.
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// The value conformed to the declared type, if representable.
    pub fn conformed(&self) -> Option<UniversalValue> {
        self.value.try_conform(&self.column_type)
    }
}

//! Declared column types.
//!
//! `UniversalType` is the semantic type of a column as declared by the
//! backing store. The diff engine uses it to decide how keys are normalized
//! and how incoming values are conformed before comparison; store adapters
//! use it to bind parameters with the right native type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Semantic type of a column.
///
/// # YAML Format
///
/// Simple types can be specified as strings:
/// ```yaml
/// type: int
/// type: date
/// ```
///
/// Parameterized types use object format:
/// ```yaml
/// type:
///   type: decimal
///   precision: 10
///   scale: 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniversalType {
    /// Boolean value
    Bool,

    /// 16-bit signed integer
    Int16,

    /// 32-bit signed integer
    Int32,

    /// 64-bit signed integer
    Int64,

    /// 32-bit IEEE 754 floating point
    Float32,

    /// 64-bit IEEE 754 floating point
    Float64,

    /// Exact decimal with specified precision and scale
    Decimal {
        /// Total number of digits
        precision: u8,
        /// Number of digits after the decimal point
        scale: u8,
    },

    /// Fixed-length, blank-padded character string
    Char {
        /// Declared length
        length: u16,
    },

    /// Variable-length character string with max length
    VarChar {
        /// Maximum length
        length: u16,
    },

    /// Unlimited text
    Text,

    /// Binary data
    Bytes,

    /// Date only (YYYY-MM-DD)
    Date,

    /// Time only (HH:MM:SS)
    Time,

    /// Timestamp without timezone
    LocalDateTime,

    /// Timestamp with timezone
    ZonedDateTime,

    /// UUID (128-bit)
    Uuid,

    /// JSON document
    Json,

    /// Binary JSON (PostgreSQL JSONB)
    Jsonb,
}

impl Serialize for UniversalType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Bool => serializer.serialize_str("bool"),
            Self::Int16 => serializer.serialize_str("small_int"),
            Self::Int32 => serializer.serialize_str("int"),
            Self::Int64 => serializer.serialize_str("big_int"),
            Self::Float32 => serializer.serialize_str("float"),
            Self::Float64 => serializer.serialize_str("double"),
            Self::Text => serializer.serialize_str("text"),
            Self::Bytes => serializer.serialize_str("bytes"),
            Self::Date => serializer.serialize_str("date"),
            Self::Time => serializer.serialize_str("time"),
            Self::LocalDateTime => serializer.serialize_str("date_time"),
            Self::ZonedDateTime => serializer.serialize_str("timestamp_tz"),
            Self::Uuid => serializer.serialize_str("uuid"),
            Self::Json => serializer.serialize_str("json"),
            Self::Jsonb => serializer.serialize_str("jsonb"),

            Self::Decimal { precision, scale } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "decimal")?;
                map.serialize_entry("precision", precision)?;
                map.serialize_entry("scale", scale)?;
                map.end()
            }
            Self::Char { length } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "char")?;
                map.serialize_entry("length", length)?;
                map.end()
            }
            Self::VarChar { length } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "var_char")?;
                map.serialize_entry("length", length)?;
                map.end()
            }
        }
    }
}

fn simple_type(name: &str) -> Option<UniversalType> {
    let ty = match name {
        "bool" | "boolean" => UniversalType::Bool,
        "small_int" | "smallint" => UniversalType::Int16,
        "int" | "integer" => UniversalType::Int32,
        "big_int" | "bigint" => UniversalType::Int64,
        "float" | "real" => UniversalType::Float32,
        "double" => UniversalType::Float64,
        "text" => UniversalType::Text,
        "bytes" => UniversalType::Bytes,
        "date" => UniversalType::Date,
        "time" => UniversalType::Time,
        "date_time" | "datetime" | "timestamp" => UniversalType::LocalDateTime,
        "timestamp_tz" | "timestamptz" => UniversalType::ZonedDateTime,
        "uuid" => UniversalType::Uuid,
        "json" => UniversalType::Json,
        "jsonb" => UniversalType::Jsonb,
        _ => return None,
    };
    Some(ty)
}

impl<'de> Deserialize<'de> for UniversalType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct UniversalTypeVisitor;

        impl<'de> Visitor<'de> for UniversalTypeVisitor {
            type Value = UniversalType;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or map representing a UniversalType")
            }

            // Handle string format: "int", "date", etc.
            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                simple_type(value).ok_or_else(|| E::custom(format!("unknown simple type: {value}")))
            }

            // Handle map format: {"type": "var_char", "length": 255}
            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut type_name: Option<String> = None;
                let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "type" {
                        type_name = Some(map.next_value()?);
                    } else {
                        fields.insert(key, map.next_value()?);
                    }
                }

                let type_name = type_name.ok_or_else(|| M::Error::missing_field("type"))?;

                if let Some(ty) = simple_type(&type_name) {
                    return Ok(ty);
                }

                match type_name.as_str() {
                    "decimal" | "numeric" => {
                        let precision = get_field(&fields, "precision").unwrap_or(38);
                        let scale = get_field(&fields, "scale").unwrap_or(10);
                        Ok(UniversalType::Decimal { precision, scale })
                    }
                    "char" => {
                        let length = get_field_required(&fields, "length")?;
                        Ok(UniversalType::Char { length })
                    }
                    "var_char" | "varchar" => {
                        let length = get_field_required(&fields, "length")?;
                        Ok(UniversalType::VarChar { length })
                    }
                    _ => Err(M::Error::custom(format!("unknown type: {type_name}"))),
                }
            }
        }

        deserializer.deserialize_any(UniversalTypeVisitor)
    }
}

fn get_field<T: for<'de> Deserialize<'de>>(
    fields: &HashMap<String, serde_yaml::Value>,
    key: &str,
) -> Option<T> {
    fields
        .get(key)
        .and_then(|v| serde_yaml::from_value(v.clone()).ok())
}

fn get_field_required<T: for<'de> Deserialize<'de>, E: serde::de::Error>(
    fields: &HashMap<String, serde_yaml::Value>,
    key: &'static str,
) -> Result<T, E> {
    let value = fields.get(key).ok_or_else(|| E::missing_field(key))?;
    serde_yaml::from_value(value.clone())
        .map_err(|e| E::custom(format!("invalid field '{key}': {e}")))
}

impl UniversalType {
    /// Create a new Decimal type with the given precision and scale.
    pub fn decimal(precision: u8, scale: u8) -> Self {
        Self::Decimal { precision, scale }
    }

    /// Create a new Char type with the given length.
    pub fn char(length: u16) -> Self {
        Self::Char { length }
    }

    /// Create a new VarChar type with the given length.
    pub fn varchar(length: u16) -> Self {
        Self::VarChar { length }
    }

    /// Check if this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Check if this type represents a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Float32
                | Self::Float64
                | Self::Decimal { .. }
        )
    }

    /// Check if this type represents a string type.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Char { .. } | Self::VarChar { .. } | Self::Text)
    }

    /// Check if this type carries a calendar date.
    ///
    /// Key columns of these types are compared by calendar date only.
    pub fn is_date_like(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::LocalDateTime | Self::ZonedDateTime
        )
    }

    /// Check if this type represents a temporal type.
    pub fn is_temporal(&self) -> bool {
        self.is_date_like() || matches!(self, Self::Time)
    }
}

impl std::fmt::Display for UniversalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int16 => write!(f, "small_int"),
            Self::Int32 => write!(f, "int"),
            Self::Int64 => write!(f, "big_int"),
            Self::Float32 => write!(f, "float"),
            Self::Float64 => write!(f, "double"),
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::Char { length } => write!(f, "char({length})"),
            Self::VarChar { length } => write!(f, "var_char({length})"),
            Self::Text => write!(f, "text"),
            Self::Bytes => write!(f, "bytes"),
            Self::Date => write!(f, "date"),
            Self::Time => write!(f, "time"),
            Self::LocalDateTime => write!(f, "date_time"),
            Self::ZonedDateTime => write!(f, "timestamp_tz"),
            Self::Uuid => write!(f, "uuid"),
            Self::Json => write!(f, "json"),
            Self::Jsonb => write!(f, "jsonb"),
        }
    }
}

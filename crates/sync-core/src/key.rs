//! Composite key normalization.
//!
//! Both snapshots are keyed the same way so that values which merely differ
//! in representation (a date stored as `DATE` vs the string `"2024-01-01"`,
//! an integer column vs a CSV text cell) produce the same key.

use crate::error::SyncError;
use crate::schema::TableDefinition;
use crate::types::UniversalType;
use crate::values::UniversalValue;
use chrono::NaiveDate;
use std::collections::HashSet;

/// One normalized component of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    /// Absent value
    Null,
    /// Calendar date, for date-like key columns
    Date(NaiveDate),
    /// Canonical text rendering, for every other key column
    Text(String),
}

impl std::fmt::Display for KeyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Ordered tuple of normalized key parts identifying a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(pub Vec<KeyPart>);

impl CompositeKey {
    /// Key parts in key column order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Whether any part is NULL. Such a key never matches another.
    pub fn has_null(&self) -> bool {
        self.0.contains(&KeyPart::Null)
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone)]
struct KeyColumn {
    name: String,
    position: usize,
    column_type: UniversalType,
}

/// Builds composite keys for rows laid out in a table's column order.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    columns: Vec<KeyColumn>,
}

impl KeyNormalizer {
    /// Validate `key_columns` against `table` and build a normalizer.
    ///
    /// The key list must be non-empty, free of repeats, and name only
    /// columns the table has.
    pub fn new(table: &TableDefinition, key_columns: &[String]) -> Result<Self, SyncError> {
        if key_columns.is_empty() {
            return Err(SyncError::invalid_key(
                &table.name,
                "at least one key column is required",
            ));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(key_columns.len());
        for name in key_columns {
            if !seen.insert(name.as_str()) {
                return Err(SyncError::invalid_key(
                    &table.name,
                    format!("column '{name}' is listed more than once"),
                ));
            }
            let position = table.column_index(name).ok_or_else(|| {
                SyncError::invalid_key(
                    &table.name,
                    format!("column '{name}' does not exist in the table"),
                )
            })?;
            columns.push(KeyColumn {
                name: name.clone(),
                position,
                column_type: table.columns[position].column_type.clone(),
            });
        }

        Ok(Self { columns })
    }

    /// Key column names in key order.
    pub fn key_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Positions of the key columns in table order.
    pub fn positions(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.position).collect()
    }

    /// Whether the column at `position` is part of the key.
    pub fn is_key_position(&self, position: usize) -> bool {
        self.columns.iter().any(|c| c.position == position)
    }

    /// Build the key of a row laid out in table column order.
    pub fn key_of(&self, row: &[UniversalValue]) -> CompositeKey {
        CompositeKey(
            self.columns
                .iter()
                .map(|c| {
                    row.get(c.position)
                        .map(|v| normalize_part(&c.column_type, v))
                        .unwrap_or(KeyPart::Null)
                })
                .collect(),
        )
    }
}

/// Normalize one key value according to the column's declared type.
///
/// Date-like columns normalize to a calendar date (timestamps are truncated
/// to their date); everything else is conformed to the declared type and
/// rendered as canonical text. Values that fail to conform keep their own
/// canonical rendering, so they only match identical input.
pub fn normalize_part(column_type: &UniversalType, value: &UniversalValue) -> KeyPart {
    if value.is_null() {
        return KeyPart::Null;
    }

    if column_type.is_date_like() {
        return match value.try_conform(&UniversalType::Date) {
            Some(UniversalValue::Date(d)) => KeyPart::Date(d),
            _ => KeyPart::Text(value.canonical_string()),
        };
    }

    match value.try_conform(column_type) {
        Some(UniversalValue::Null) => KeyPart::Null,
        Some(conformed) => KeyPart::Text(conformed.canonical_string()),
        None => KeyPart::Text(value.canonical_string()),
    }
}

//! Table and column definitions.
//!
//! A `TableDefinition` is discovered by reading the baseline from the store;
//! it fixes the ordered column set and declared types that incoming
//! snapshots are reduced to. The same types can also be loaded from a YAML
//! file to drive type-aware parsing of incoming files.

use crate::types::UniversalType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Error type for schema file operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Table not found in schema
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Column definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Declared column type
    #[serde(rename = "type")]
    pub column_type: UniversalType,

    /// Whether this column accepts nulls
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDefinition {
    /// Create a new nullable column definition.
    pub fn new(name: impl Into<String>, column_type: UniversalType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// Create a new NOT NULL column definition.
    pub fn not_null(name: impl Into<String>, column_type: UniversalType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }
}

/// Table definition: ordered columns plus the primary key, if the store
/// reports one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDefinition {
    /// Table name
    pub name: String,

    /// Column definitions in table order
    pub columns: Vec<ColumnDefinition>,

    /// Primary key column names, in key order (may be empty)
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl TableDefinition {
    /// Create a new table definition without a primary key.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: Vec::new(),
        }
    }

    /// Set the primary key column names.
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column in table order.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get the declared type of a column by name.
    pub fn get_column_type(&self, name: &str) -> Option<&UniversalType> {
        self.get_column(name).map(|c| &c.column_type)
    }

    /// All column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Map of column name to declared type.
    pub fn column_types(&self) -> HashMap<String, UniversalType> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.column_type.clone()))
            .collect()
    }
}

/// A set of table definitions loaded from YAML.
///
/// ```yaml
/// tables:
///   - name: PRECOS
///     columns:
///       - name: TICKER
///         type: text
///       - name: DATA
///         type: date
///       - name: PRECO
///         type: double
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    /// Table definitions
    pub tables: Vec<TableDefinition>,
}

impl SchemaFile {
    /// Parse a schema from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a schema from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Get a table definition by name.
    pub fn get_table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get a table definition by name, failing if absent.
    pub fn require_table(&self, name: &str) -> Result<&TableDefinition, SchemaError> {
        self.get_table(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> TableDefinition {
        TableDefinition::new(
            "PRECOS",
            vec![
                ColumnDefinition::not_null("TICKER", UniversalType::Text),
                ColumnDefinition::not_null("DATA", UniversalType::Date),
                ColumnDefinition::new("PRECO", UniversalType::Float64),
            ],
        )
        .with_primary_key(["TICKER", "DATA"])
    }

    #[test]
    fn test_column_lookup() {
        let table = prices();
        assert_eq!(table.column_index("DATA"), Some(1));
        assert_eq!(table.get_column_type("PRECO"), Some(&UniversalType::Float64));
        assert!(table.get_column("missing").is_none());
        assert_eq!(table.column_names(), vec!["TICKER", "DATA", "PRECO"]);
        assert_eq!(table.primary_key, vec!["TICKER", "DATA"]);
    }

    #[test]
    fn test_schema_file_from_yaml() {
        let yaml = r#"
tables:
  - name: PRECOS
    columns:
      - name: TICKER
        type: text
        nullable: false
      - name: DATA
        type: date
      - name: PRECO
        type:
          type: decimal
          precision: 12
          scale: 4
"#;
        let schema = SchemaFile::from_yaml(yaml).unwrap();
        let table = schema.require_table("PRECOS").unwrap();
        assert!(!table.columns[0].nullable);
        assert!(table.columns[1].nullable);
        assert_eq!(
            table.get_column_type("PRECO"),
            Some(&UniversalType::decimal(12, 4))
        );
        assert!(table.primary_key.is_empty());
        assert!(matches!(
            schema.require_table("ATIVOS"),
            Err(SchemaError::TableNotFound(_))
        ));
    }
}

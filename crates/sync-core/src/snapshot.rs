//! In-memory tabular snapshots.

use crate::schema::TableDefinition;
use crate::values::UniversalValue;
use std::collections::HashSet;

/// A row: one value per column, in column order.
pub type Row = Vec<UniversalValue>;

/// Errors raised while building a snapshot.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SnapshotError {
    /// Two columns share a name.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A row does not have one value per column.
    #[error("Row {row} has {actual} values but the snapshot has {expected} columns")]
    RowWidth {
        /// Zero-based row position
        row: usize,
        /// Number of columns
        expected: usize,
        /// Number of values in the row
        actual: usize,
    },
}

/// Records with a homogeneous, ordered column set.
///
/// This is the shape of an incoming snapshot: column names only, values as
/// produced by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Snapshot {
    /// Create an empty snapshot with the given columns.
    pub fn new<I, S>(columns: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SnapshotError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a snapshot from columns and rows.
    pub fn with_rows<I, S>(columns: I, rows: Vec<Row>) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut snapshot = Self::new(columns)?;
        for row in rows {
            snapshot.push_row(row)?;
        }
        Ok(snapshot)
    }

    /// Append a row, checking its width.
    pub fn push_row(&mut self, row: Row) -> Result<(), SnapshotError> {
        if row.len() != self.columns.len() {
            return Err(SnapshotError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the snapshot, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the snapshot has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of a named column in a given row.
    pub fn get(&self, row: usize, column: &str) -> Option<&UniversalValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Reduce and reorder the snapshot to exactly `columns`.
    ///
    /// Columns not listed are dropped. Fails with the list of requested
    /// columns the snapshot lacks.
    pub fn project(&self, columns: &[&str]) -> Result<Snapshot, Vec<String>> {
        let mut positions = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for column in columns {
            match self.column_index(column) {
                Some(idx) => positions.push(idx),
                None => missing.push(column.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }

        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&idx| row[idx].clone()).collect())
            .collect();

        Ok(Snapshot {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }
}

/// The full content of a table as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    /// Table definition discovered from the store
    pub table: TableDefinition,

    /// Rows in table column order
    pub rows: Vec<Row>,
}

impl TableSnapshot {
    /// Create a table snapshot, checking row widths against the definition.
    pub fn new(table: TableDefinition, rows: Vec<Row>) -> Result<Self, SnapshotError> {
        let expected = table.columns.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(SnapshotError::RowWidth {
                row: idx,
                expected,
                actual: row.len(),
            });
        }
        Ok(Self { table, rows })
    }

    /// Create an empty table snapshot.
    pub fn empty(table: TableDefinition) -> Self {
        Self {
            table,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// View as a plain snapshot (column names only).
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            columns: self.table.columns.iter().map(|c| c.name.clone()).collect(),
            rows: self.rows.clone(),
        }
    }
}

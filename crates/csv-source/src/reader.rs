//! CSV → Snapshot

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use sync_core::{Snapshot, UniversalType, UniversalValue};
use tracing::{debug, info};

/// Options for reading a CSV snapshot.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// CSV delimiter character (default: ',')
    pub delimiter: u8,

    /// Declared types for some columns. Cells of these columns are parsed
    /// strictly; all other cells are kept as text.
    pub column_types: HashMap<String, UniversalType>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            column_types: HashMap::new(),
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_column_type(mut self, column: impl Into<String>, ty: UniversalType) -> Self {
        self.column_types.insert(column.into(), ty);
        self
    }
}

/// Parse a CSV cell, strictly by type when one is given.
///
/// Without a type the cell stays text (empty cells are null). The baseline
/// column type conforms it later, so `00123` in a text key is not turned
/// into `123` here.
pub fn parse_cell(cell: &str, column_type: Option<&UniversalType>) -> Result<UniversalValue> {
    if cell.is_empty() {
        return Ok(UniversalValue::Null);
    }
    let Some(ty) = column_type else {
        return Ok(UniversalValue::text(cell));
    };
    UniversalValue::text(cell)
        .try_conform(ty)
        .with_context(|| format!("Failed to parse '{cell}' as {ty}"))
}

/// Read a snapshot from CSV data with a header row.
pub fn read_snapshot<R: std::io::Read>(reader: R, options: &CsvOptions) -> Result<Snapshot> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    debug!("CSV headers/columns: {headers:?}");

    let column_types: Vec<Option<&UniversalType>> = headers
        .iter()
        .map(|h| options.column_types.get(h))
        .collect();

    let mut snapshot = Snapshot::new(headers.clone())?;
    for (idx, result) in csv_reader.records().enumerate() {
        // Row 1 is the header
        let row_number = idx + 2;
        let record = result.with_context(|| format!("Failed to read CSV row {row_number}"))?;

        if record.len() != headers.len() {
            anyhow::bail!(
                "Column count mismatch in CSV row {}: expected {} columns ({}), but found {} columns",
                row_number,
                headers.len(),
                headers.join(", "),
                record.len()
            );
        }

        let row = record
            .iter()
            .zip(&column_types)
            .zip(&headers)
            .map(|((cell, ty), column)| {
                parse_cell(cell, *ty)
                    .with_context(|| format!("CSV row {row_number}, column '{column}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        snapshot.push_row(row)?;
    }

    Ok(snapshot)
}

/// Read a snapshot from a CSV file.
pub fn read_snapshot_from_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Snapshot> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    let snapshot = read_snapshot(file, options)
        .with_context(|| format!("Failed to read CSV file {}", path.display()))?;
    info!("Read {} rows from {}", snapshot.len(), path.display());
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn read(data: &str) -> Result<Snapshot> {
        read_snapshot(data.as_bytes(), &CsvOptions::default())
    }

    #[test]
    fn test_untyped_cells_stay_text() {
        assert_eq!(parse_cell("", None).unwrap(), UniversalValue::Null);
        assert_eq!(parse_cell("42", None).unwrap(), UniversalValue::text("42"));
        assert_eq!(parse_cell("00123", None).unwrap(), UniversalValue::text("00123"));
        assert_eq!(parse_cell("10.50", None).unwrap(), UniversalValue::text("10.50"));
        assert_eq!(parse_cell("TRUE", None).unwrap(), UniversalValue::text("TRUE"));
        assert_eq!(parse_cell("NaN", None).unwrap(), UniversalValue::text("NaN"));
    }

    #[test]
    fn test_read_snapshot() {
        let snapshot = read("TICKER,DATA,PRECO\nAAA,2024-01-01,10.5\nBBB,2024-01-02,\n").unwrap();

        assert_eq!(snapshot.columns(), ["TICKER", "DATA", "PRECO"]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(0, "PRECO"), Some(&UniversalValue::text("10.5")));
        assert_eq!(snapshot.get(1, "PRECO"), Some(&UniversalValue::Null));
    }

    #[test]
    fn test_header_only() {
        let snapshot = read("TICKER,DATA\n").unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.columns().len(), 2);
    }

    #[test]
    fn test_ragged_row_reports_row_number() {
        let err = read("A,B\n1,2\n3\n").unwrap_err();
        assert!(
            err.to_string().contains("CSV row 3"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn test_duplicate_header_is_rejected() {
        assert!(read("A,A\n1,2\n").is_err());
    }

    #[test]
    fn test_type_hints_parse_strictly() {
        let options = CsvOptions::default()
            .with_column_type("DATA", UniversalType::Date)
            .with_column_type("CODIGO", UniversalType::Text);
        let snapshot =
            read_snapshot("CODIGO,DATA\n0010,2024-01-01\n".as_bytes(), &options).unwrap();

        assert_eq!(snapshot.get(0, "CODIGO"), Some(&UniversalValue::text("0010")));
        assert_eq!(
            snapshot.get(0, "DATA"),
            Some(&UniversalValue::Date(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
            ))
        );

        let err = read_snapshot("CODIGO,DATA\nx,yesterday\n".as_bytes(), &options).unwrap_err();
        assert!(format!("{err:#}").contains("column 'DATA'"), "{err:#}");
    }

    #[test]
    fn test_semicolon_delimiter() {
        let options = CsvOptions::default().with_delimiter(b';');
        let snapshot = read_snapshot("A;B\n1;x\n".as_bytes(), &options).unwrap();
        assert_eq!(snapshot.rows()[0], vec!["1".into(), "x".into()]);
    }

    #[test]
    fn test_read_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "TICKER,PRECO").unwrap();
        writeln!(file, "AAA,10").unwrap();

        let snapshot = read_snapshot_from_path(file.path(), &CsvOptions::default()).unwrap();
        assert_eq!(snapshot.rows()[0], vec!["AAA".into(), "10".into()]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_snapshot_from_path(dir.path().join("nope.csv"), &CsvOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open CSV file"));
    }
}

//! Snapshot → JSON Lines

use crate::conversion::value_to_json;
use anyhow::Result;
use serde_json::{Map, Value};
use std::io::Write;
use sync_core::{Snapshot, UniversalValue};

/// Write one row as a JSON object line, keys in column order.
pub fn write_row<W: Write>(writer: &mut W, columns: &[String], row: &[UniversalValue]) -> Result<()> {
    let object: Map<String, Value> = columns
        .iter()
        .zip(row)
        .map(|(c, v)| (c.clone(), value_to_json(v)))
        .collect();
    serde_json::to_writer(&mut *writer, &object)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Write every row of a snapshot.
pub fn write_snapshot<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<()> {
    for row in snapshot.rows() {
        write_row(writer, snapshot.columns(), row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_snapshot;

    #[test]
    fn test_write_in_column_order() {
        let snapshot = Snapshot::with_rows(
            ["TICKER", "DATA", "PRECO"],
            vec![vec!["AAA".into(), "2024-01-01".into(), UniversalValue::Null]],
        )
        .unwrap();

        let mut out = Vec::new();
        write_snapshot(&mut out, &snapshot).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"TICKER\":\"AAA\",\"DATA\":\"2024-01-01\",\"PRECO\":null}\n"
        );
    }

    #[test]
    fn test_written_lines_read_back() {
        let snapshot = Snapshot::with_rows(
            ["B", "A"],
            vec![
                vec![UniversalValue::Int(1), "x".into()],
                vec![UniversalValue::Float(2.5), UniversalValue::Bool(true)],
            ],
        )
        .unwrap();

        let mut out = Vec::new();
        write_snapshot(&mut out, &snapshot).unwrap();
        let back = read_snapshot(out.as_slice()).unwrap();
        assert_eq!(back.columns(), snapshot.columns());
        assert_eq!(back.rows(), snapshot.rows());
    }
}

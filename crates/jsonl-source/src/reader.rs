//! JSON Lines → Snapshot

use crate::conversion::json_to_value;
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::io::{BufRead, BufReader};
use std::path::Path;
use sync_core::{Snapshot, UniversalValue};
use tracing::{debug, info};

/// Read a snapshot from JSON Lines.
pub fn read_snapshot<R: std::io::Read>(reader: R) -> Result<Snapshot> {
    let buf_reader = BufReader::new(reader);
    let mut columns: Vec<String> = Vec::new();
    let mut objects: Vec<Map<String, Value>> = Vec::new();

    for (line_count, line) in buf_reader.lines().enumerate() {
        let line = line?;
        let line_count = line_count + 1;

        if line.trim().is_empty() {
            continue;
        }

        let json_value: Value = serde_json::from_str(&line)
            .map_err(|e| anyhow!("Error parsing JSON at line {line_count}: {e}"))?;
        let Value::Object(object) = json_value else {
            anyhow::bail!("Expected a JSON object at line {line_count}");
        };

        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }
    debug!("JSONL columns: {columns:?}");

    let rows = objects
        .into_iter()
        .map(|mut object| {
            columns
                .iter()
                .map(|c| {
                    object
                        .remove(c)
                        .map(json_to_value)
                        .unwrap_or(UniversalValue::Null)
                })
                .collect()
        })
        .collect();

    Ok(Snapshot::with_rows(columns, rows)?)
}

/// Read a snapshot from a JSON Lines file.
pub fn read_snapshot_from_path(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open JSONL file {}", path.display()))?;
    let snapshot = read_snapshot(file)
        .with_context(|| format!("Failed to read JSONL file {}", path.display()))?;
    info!("Read {} rows from {}", snapshot.len(), path.display());
    Ok(snapshot)
}

//! Change detection between a baseline and an incoming snapshot.
//!
//! Keys are normalized on both sides with the same [`KeyNormalizer`]. An
//! incoming record whose key is absent from the baseline is an insert; one
//! whose key is present but with at least one differing non-key column is
//! an update; the rest are unchanged. Incoming records must have a value in
//! every key column, since NULL never matches a stored key. Baseline records
//! with a NULL key cannot be targeted and are left alone. Incoming values
//! are conformed to the
//! baseline's declared column types before comparison, so representation
//! drift (`10` vs `10.0`, `"2024-01-01"` vs a date) is not reported as a
//! change.

use crate::error::{SnapshotSide, SyncError};
use crate::key::{CompositeKey, KeyNormalizer, KeyPart};
use crate::schema::ColumnDefinition;
use crate::snapshot::{Row, Snapshot, TableSnapshot};
use crate::values::UniversalValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// What to do when a normalized key occurs more than once in one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the last occurrence and drop the earlier ones
    #[default]
    #[serde(alias = "keep_last")]
    KeepLast,
    /// Fail with [`SyncError::DuplicateKey`]
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep-last" | "keep_last" | "last" => Ok(Self::KeepLast),
            "reject" | "error" => Ok(Self::Reject),
            other => Err(format!(
                "Unknown duplicate policy '{other}'. Expected 'keep-last' or 'reject'"
            )),
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepLast => write!(f, "keep-last"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Result of comparing an incoming snapshot with a baseline.
///
/// `inserts` and `updates` hold incoming rows reduced to the baseline's
/// columns, in baseline column order, with values as supplied by the
/// source. The key columns of an update carry the stored values of the
/// baseline record it matched, so a date key collected as `2024-01-01`
/// still targets a record stored as `2024-01-01T10:00:00`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    /// Baseline column definitions the rows are laid out in
    pub columns: Vec<ColumnDefinition>,

    /// Records whose key is absent from the baseline
    pub inserts: Vec<Row>,

    /// Records whose key is present but whose non-key content differs
    pub updates: Vec<Row>,

    /// Number of incoming records identical to their baseline record
    pub unchanged: usize,

    /// Number of records dropped by [`DuplicatePolicy::KeepLast`], both sides
    pub duplicates_dropped: usize,
}

impl DiffResult {
    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Compare `incoming` with `baseline` on `key_columns`.
///
/// Fails before producing anything when the key is invalid, when an
/// incoming record has a NULL key value, when the incoming snapshot lacks
/// baseline columns, or when a duplicate key is found under
/// [`DuplicatePolicy::Reject`].
pub fn diff(
    baseline: &TableSnapshot,
    incoming: &Snapshot,
    key_columns: &[String],
    policy: DuplicatePolicy,
) -> Result<DiffResult, SyncError> {
    let entity = baseline.table.name.as_str();
    let normalizer = KeyNormalizer::new(&baseline.table, key_columns)?;

    let projected = incoming
        .project(&baseline.table.column_names())
        .map_err(|missing| SyncError::SchemaMismatch {
            entity: entity.to_string(),
            missing,
        })?;
    let dropped_columns = incoming.columns().len() - projected.columns().len();
    if dropped_columns > 0 {
        debug!(
            "Ignoring {} incoming column(s) not present in '{}'",
            dropped_columns, entity
        );
    }

    let baseline_keys: Vec<CompositeKey> =
        baseline.rows.iter().map(|r| normalizer.key_of(r)).collect();
    let (baseline_kept, baseline_dropped) =
        dedup_last(entity, SnapshotSide::Baseline, &baseline_keys, policy)?;
    let baseline_index: HashMap<&CompositeKey, &Row> = baseline_kept
        .iter()
        .map(|&i| (&baseline_keys[i], &baseline.rows[i]))
        .collect();

    let incoming_rows = projected.into_rows();
    let incoming_keys: Vec<CompositeKey> =
        incoming_rows.iter().map(|r| normalizer.key_of(r)).collect();
    let null_key = incoming_keys
        .iter()
        .enumerate()
        .find(|(_, k)| k.has_null());
    if let Some((record, key)) = null_key {
        let columns = normalizer.key_columns();
        let missing: Vec<&str> = key
            .parts()
            .iter()
            .zip(&columns)
            .filter(|(part, _)| **part == KeyPart::Null)
            .map(|(_, column)| *column)
            .collect();
        return Err(SyncError::invalid_key(
            entity,
            format!(
                "incoming record {} has no value for key column(s) {}",
                record + 1,
                missing.join(", ")
            ),
        ));
    }
    let (incoming_kept, incoming_dropped) =
        dedup_last(entity, SnapshotSide::Incoming, &incoming_keys, policy)?;

    let columns = baseline.table.columns.clone();
    let mut inserts = Vec::new();
    let mut updates = Vec::new();
    let mut unchanged = 0;

    for i in incoming_kept {
        let row = &incoming_rows[i];
        match baseline_index.get(&incoming_keys[i]) {
            None => inserts.push(row.clone()),
            Some(stored) => {
                if differs(&columns, &normalizer, stored, row) {
                    updates.push(targeting(&normalizer, stored, row));
                } else {
                    unchanged += 1;
                }
            }
        }
    }

    let duplicates_dropped = baseline_dropped + incoming_dropped;
    if duplicates_dropped > 0 {
        warn!(
            "Dropped {} record(s) with duplicate keys in '{}' ({} baseline, {} incoming)",
            duplicates_dropped, entity, baseline_dropped, incoming_dropped
        );
    }
    debug!(
        "Diff of '{}': {} insert(s), {} update(s), {} unchanged",
        entity,
        inserts.len(),
        updates.len(),
        unchanged
    );

    Ok(DiffResult {
        columns,
        inserts,
        updates,
        unchanged,
        duplicates_dropped,
    })
}

/// Indices of the rows to keep, in original order, plus the number dropped.
///
/// Keys containing NULL are neither kept nor counted as duplicates.
fn dedup_last(
    entity: &str,
    side: SnapshotSide,
    keys: &[CompositeKey],
    policy: DuplicatePolicy,
) -> Result<(Vec<usize>, usize), SyncError> {
    let mut last: HashMap<&CompositeKey, usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if key.has_null() {
            continue;
        }
        if last.insert(key, i).is_some() && policy == DuplicatePolicy::Reject {
            return Err(SyncError::DuplicateKey {
                entity: entity.to_string(),
                side,
                key: key.to_string(),
            });
        }
    }
    let kept: Vec<usize> = (0..keys.len())
        .filter(|&i| last.get(&keys[i]) == Some(&i))
        .collect();
    let with_value = keys.iter().filter(|k| !k.has_null()).count();
    let duplicates = with_value - kept.len();
    Ok((kept, duplicates))
}

/// The incoming row with its key columns replaced by the stored ones.
fn targeting(normalizer: &KeyNormalizer, stored: &[UniversalValue], incoming: &Row) -> Row {
    let mut row = incoming.clone();
    for idx in normalizer.positions() {
        row[idx] = stored[idx].clone();
    }
    row
}

fn differs(
    columns: &[ColumnDefinition],
    normalizer: &KeyNormalizer,
    stored: &[UniversalValue],
    incoming: &[UniversalValue],
) -> bool {
    columns.iter().enumerate().any(|(idx, column)| {
        if normalizer.is_key_position(idx) {
            return false;
        }
        let old = stored[idx].conform(&column.column_type);
        let new = incoming[idx].conform(&column.column_type);
        !old.same_as(&new)
    })
}

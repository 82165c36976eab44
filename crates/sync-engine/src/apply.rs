//! Transactional application of a change set.
//!
//! Inserts run first, then updates, each row as its own statement, all
//! inside one transaction. Any failure rolls the whole transaction back.

use crate::store::{Statement, Store};
use sync_core::{ApplyPhase, ColumnDefinition, DiffResult, Row, SyncError, TypedValue};
use tracing::{debug, info, warn};

/// Number of records written by [`apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyCounts {
    pub inserted: usize,
    pub updated: usize,
}

/// Build the insert statement for one row.
pub fn insert_statement(entity: &str, columns: &[ColumnDefinition], row: &Row) -> Statement {
    Statement::Insert {
        entity: entity.to_string(),
        values: columns
            .iter()
            .zip(row)
            .map(|(column, value)| {
                (
                    column.name.clone(),
                    TypedValue::new(column.column_type.clone(), value.clone()),
                )
            })
            .collect(),
    }
}

/// Build the update statement for one row.
///
/// Every non-key column is assigned; key columns become equality
/// predicates on the row's values, which [`sync_core::diff`] takes from
/// the matched baseline record.
pub fn update_statement(
    entity: &str,
    columns: &[ColumnDefinition],
    row: &Row,
    key_positions: &[usize],
) -> Statement {
    let mut assignments = Vec::with_capacity(columns.len().saturating_sub(key_positions.len()));
    for (idx, (column, value)) in columns.iter().zip(row).enumerate() {
        if !key_positions.contains(&idx) {
            assignments.push((
                column.name.clone(),
                TypedValue::new(column.column_type.clone(), value.clone()),
            ));
        }
    }

    let predicates = key_positions
        .iter()
        .map(|&idx| {
            let column = &columns[idx];
            (
                column.name.clone(),
                TypedValue::new(column.column_type.clone(), row[idx].clone()),
            )
        })
        .collect();

    Statement::Update {
        entity: entity.to_string(),
        assignments,
        predicates,
    }
}

/// Apply `diff` to `entity` in one transaction.
///
/// Returns the number of records written per phase; an update that matches
/// no record counts for nothing. Nothing is written
/// (and no transaction opened) when the change set is empty.
pub async fn apply<S>(
    store: &mut S,
    entity: &str,
    diff: &DiffResult,
    key_columns: &[String],
) -> Result<ApplyCounts, SyncError>
where
    S: Store + ?Sized,
{
    let key_positions = key_columns
        .iter()
        .map(|key| {
            diff.columns
                .iter()
                .position(|c| &c.name == key)
                .ok_or_else(|| {
                    SyncError::invalid_key(
                        entity,
                        format!("column '{key}' does not exist in the change set"),
                    )
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if diff.is_empty() {
        debug!("Nothing to apply to '{}'", entity);
        return Ok(ApplyCounts::default());
    }

    store
        .begin()
        .await
        .map_err(|e| SyncError::transaction(entity, ApplyPhase::Begin, e))?;

    let counts = match execute_phases(store, entity, diff, &key_positions).await {
        Ok(counts) => counts,
        Err(e) => {
            rollback(store, entity).await;
            return Err(e);
        }
    };

    if let Err(e) = store.commit().await {
        if store.in_transaction() {
            rollback(store, entity).await;
        }
        return Err(SyncError::transaction(entity, ApplyPhase::Commit, e));
    }

    info!(
        "Committed {} insert(s) and {} update(s) to '{}'",
        counts.inserted, counts.updated, entity
    );
    Ok(counts)
}

async fn execute_phases<S>(
    store: &mut S,
    entity: &str,
    diff: &DiffResult,
    key_positions: &[usize],
) -> Result<ApplyCounts, SyncError>
where
    S: Store + ?Sized,
{
    let mut counts = ApplyCounts::default();

    for row in &diff.inserts {
        let statement = insert_statement(entity, &diff.columns, row);
        store
            .execute(&statement)
            .await
            .map_err(|e| SyncError::transaction(entity, ApplyPhase::Insert, e))?;
        counts.inserted += 1;
    }
    debug!("Inserted {} row(s) into '{}'", counts.inserted, entity);

    for row in &diff.updates {
        let statement = update_statement(entity, &diff.columns, row, key_positions);
        let affected = store
            .execute(&statement)
            .await
            .map_err(|e| SyncError::transaction(entity, ApplyPhase::Update, e))?;
        if affected == 0 {
            warn!("Update on '{}' matched no record", entity);
        }
        counts.updated += affected as usize;
    }
    debug!("Updated {} row(s) in '{}'", counts.updated, entity);

    Ok(counts)
}

async fn rollback<S>(store: &mut S, entity: &str)
where
    S: Store + ?Sized,
{
    match store.rollback().await {
        Ok(()) => debug!("Rolled back transaction on '{}'", entity),
        Err(e) => warn!("Failed to roll back transaction on '{}': {e:#}", entity),
    }
}

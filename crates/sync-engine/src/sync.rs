//! Synchronization entry points.

use crate::apply::apply;
use crate::connection::ConnectionManager;
use crate::reader::read_baseline;
use crate::store::{Connector, Store};
use serde::{Deserialize, Serialize};
use sync_core::{diff, DiffResult, DuplicatePolicy, Snapshot, SyncError};
use tracing::info;

/// Options for a [`synchronize`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Compute and report the change set without writing it
    #[serde(default)]
    pub dry_run: bool,

    /// Handling of duplicate keys within a snapshot
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Outcome of a successful [`synchronize`] call.
///
/// With `dry_run`, `inserted` and `updated` count what would have been
/// written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub entity: String,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub dry_run: bool,
}

/// Bring `entity` in line with `incoming`.
///
/// Opens a store handle, reads the baseline, computes the change set and
/// applies it in one transaction. The handle is released on every exit
/// path. Errors are returned unchanged; no partial counts are reported.
pub async fn synchronize<C: Connector>(
    connector: &C,
    entity: &str,
    key_columns: &[String],
    incoming: &Snapshot,
    options: SyncOptions,
) -> Result<SyncResult, SyncError> {
    info!(
        "Synchronizing '{}' on key ({}) with {} incoming row(s)",
        entity,
        key_columns.join(", "),
        incoming.len()
    );

    let mut manager = ConnectionManager::new(connector);
    let result = run_sync(&mut manager, entity, key_columns, incoming, options).await;
    manager.release().await;
    result
}

async fn run_sync<C: Connector>(
    manager: &mut ConnectionManager<'_, C>,
    entity: &str,
    key_columns: &[String],
    incoming: &Snapshot,
    options: SyncOptions,
) -> Result<SyncResult, SyncError> {
    let store = manager.acquire().await?;
    let baseline = read_baseline(store, entity).await?;
    let changes = diff(&baseline, incoming, key_columns, options.duplicate_policy)?;

    if options.dry_run {
        info!(
            "Dry run for '{}': would insert {} and update {} row(s), {} unchanged",
            entity,
            changes.inserts.len(),
            changes.updates.len(),
            changes.unchanged
        );
        return Ok(SyncResult {
            entity: entity.to_string(),
            inserted: changes.inserts.len(),
            updated: changes.updates.len(),
            unchanged: changes.unchanged,
            dry_run: true,
        });
    }

    let counts = apply(store, entity, &changes, key_columns).await?;
    info!(
        "Synchronized '{}': {} inserted, {} updated, {} unchanged",
        entity, counts.inserted, counts.updated, changes.unchanged
    );

    Ok(SyncResult {
        entity: entity.to_string(),
        inserted: counts.inserted,
        updated: counts.updated,
        unchanged: changes.unchanged,
        dry_run: false,
    })
}

/// Compute the change set for `entity` without writing anything.
pub async fn plan<C: Connector>(
    connector: &C,
    entity: &str,
    key_columns: &[String],
    incoming: &Snapshot,
    policy: DuplicatePolicy,
) -> Result<DiffResult, SyncError> {
    let mut manager = ConnectionManager::new(connector);
    let result = async {
        let store = manager.acquire().await?;
        let baseline = read_baseline(store, entity).await?;
        diff(&baseline, incoming, key_columns, policy)
    }
    .await;
    manager.release().await;
    result
}

/// Primary key columns of `entity`, in key order.
///
/// Fails with [`SyncError::EntityNotFound`] when the entity doesn't exist
/// and with [`SyncError::InvalidKey`] when it has no primary key.
pub async fn primary_key<C: Connector>(
    connector: &C,
    entity: &str,
) -> Result<Vec<String>, SyncError> {
    let mut manager = ConnectionManager::new(connector);
    let result = async {
        let store = manager.acquire().await?;
        match store.table_definition(entity).await {
            Ok(Some(definition)) if definition.primary_key.is_empty() => Err(
                SyncError::invalid_key(entity, "no key columns given and the table has no primary key"),
            ),
            Ok(Some(definition)) => Ok(definition.primary_key),
            Ok(None) => Err(SyncError::EntityNotFound {
                entity: entity.to_string(),
            }),
            Err(e) => Err(SyncError::read(entity, e)),
        }
    }
    .await;
    manager.release().await;
    result
}

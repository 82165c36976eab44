//! Per-call connection lifecycle.

use crate::store::{Connector, Store};
use sync_core::SyncError;
use tracing::{debug, warn};

/// Owns at most one store handle for the duration of a synchronization call.
///
/// Callers must invoke [`ConnectionManager::release`] on every exit path;
/// closing is asynchronous, so it cannot happen in `Drop`.
pub struct ConnectionManager<'a, C: Connector> {
    connector: &'a C,
    handle: Option<C::Store>,
}

impl<'a, C: Connector> ConnectionManager<'a, C> {
    pub fn new(connector: &'a C) -> Self {
        Self {
            connector,
            handle: None,
        }
    }

    /// Return the open handle, opening one if needed.
    ///
    /// When an existing handle is reused with a transaction still open, the
    /// stale transaction is rolled back. A failed rollback is logged and
    /// otherwise ignored.
    pub async fn acquire(&mut self) -> Result<&mut C::Store, SyncError> {
        let store = match self.handle.take() {
            Some(mut store) => {
                if store.in_transaction() {
                    warn!("Reused store handle has an open transaction, rolling it back");
                    if let Err(e) = store.rollback().await {
                        warn!("Failed to roll back stale transaction: {e:#}");
                    }
                }
                store
            }
            None => {
                debug!("Opening store connection");
                self.connector
                    .connect()
                    .await
                    .map_err(SyncError::connection)?
            }
        };
        Ok(self.handle.insert(store))
    }

    /// Close the handle if one is open. Close failures are logged.
    pub async fn release(&mut self) {
        if let Some(mut store) = self.handle.take() {
            debug!("Closing store connection");
            if let Err(e) = store.close().await {
                warn!("Failed to close store connection: {e:#}");
            }
        }
    }

    /// Whether a handle is currently held.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

impl<C: Connector> Drop for ConnectionManager<'_, C> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Connection manager dropped without releasing its store handle");
        }
    }
}

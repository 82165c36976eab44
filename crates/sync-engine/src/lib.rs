//! Synchronization engine for asset-sync.
//!
//! Given an entity name, its key columns and an incoming snapshot,
//! [`synchronize`] reads the persisted baseline, computes the records to
//! insert and update, and applies them in a single transaction:
//!
//! ```text
//! synchronize(entity, keys, incoming)
//!    │
//!    ├── ConnectionManager::acquire   (one handle per call)
//!    ├── read_baseline                (full table read)
//!    ├── sync_core::diff              (key normalization, partition)
//!    ├── apply                        (BEGIN, inserts, updates, COMMIT)
//!    └── ConnectionManager::release   (on every exit path)
//! ```
//!
//! Store adapters implement [`Store`] and [`Connector`]. An in-memory
//! implementation is provided in [`memory`].
//!
//! Every step is awaited in sequence within the caller's task; the engine
//! never spawns work of its own.

pub mod apply;
pub mod connection;
pub mod memory;
pub mod reader;
pub mod store;
pub mod sync;

pub use apply::{apply, insert_statement, update_statement, ApplyCounts};
pub use connection::ConnectionManager;
pub use memory::{MemoryConnector, MemoryDatabase, MemoryStore};
pub use reader::read_baseline;
pub use store::{Connector, Statement, StatementKind, Store};
pub use sync::{plan, primary_key, synchronize, SyncOptions, SyncResult};

pub use sync_core;

//! Core types and change detection for asset-sync.
//!
//! This crate is independent of any store. It provides:
//!
//! - [`UniversalType`] - Declared column types
//! - [`UniversalValue`] - Cell values, and conformance to a declared type
//! - [`TableDefinition`] - Ordered columns and primary key of an entity
//! - [`Snapshot`] / [`TableSnapshot`] - Incoming records and persisted baselines
//! - [`CompositeKey`] - Normalized record identity
//! - [`diff`] - Partition of an incoming snapshot into inserts, updates and
//!   unchanged records
//! - [`SyncError`] - Error taxonomy shared by the engine and store adapters
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── sync-engine             (connection lifecycle, apply, synchronize)
//!    │       │
//!    │       └─── asset-sync-postgresql  (PostgreSQL store)
//!    │
//!    ├─── asset-sync-csv-source   (CSV files -> Snapshot)
//!    └─── asset-sync-jsonl-source (JSONL files <-> Snapshot)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{diff, ColumnDefinition, DuplicatePolicy, Snapshot, TableDefinition,
//!     TableSnapshot, UniversalType};
//!
//! let table = TableDefinition::new(
//!     "ATIVOS",
//!     vec![
//!         ColumnDefinition::not_null("TICKER", UniversalType::Text),
//!         ColumnDefinition::new("SETOR", UniversalType::Text),
//!     ],
//! );
//! let baseline = TableSnapshot::new(table, vec![vec!["AAA".into(), "Energia".into()]]).unwrap();
//! let incoming = Snapshot::with_rows(
//!     ["TICKER", "SETOR"],
//!     vec![vec!["AAA".into(), "Bancos".into()], vec!["BBB".into(), "Varejo".into()]],
//! )
//! .unwrap();
//!
//! let result = diff(&baseline, &incoming, &["TICKER".to_string()], DuplicatePolicy::KeepLast).unwrap();
//! assert_eq!(result.inserts.len(), 1);
//! assert_eq!(result.updates.len(), 1);
//! ```

pub mod diff;
pub mod error;
pub mod key;
pub mod schema;
pub mod snapshot;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use diff::{diff, DiffResult, DuplicatePolicy};
pub use error::{ApplyPhase, BoxError, SnapshotSide, SyncError};
pub use key::{normalize_part, CompositeKey, KeyNormalizer, KeyPart};
pub use schema::{ColumnDefinition, SchemaError, SchemaFile, TableDefinition};
pub use snapshot::{Row, Snapshot, SnapshotError, TableSnapshot};
pub use types::UniversalType;
pub use values::{format_float, parse_date, parse_datetime, TypedValue, UniversalValue};

//! Error taxonomy of a synchronization call.
//!
//! Every variant aborts the current call and is surfaced to the caller
//! unchanged. Causes coming from a store adapter are kept as the error
//! `source`.

use crate::snapshot::SnapshotError;

/// Boxed cause produced by a store adapter.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which snapshot a problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSide {
    /// The persisted table content
    Baseline,
    /// The freshly collected records
    Incoming,
}

impl std::fmt::Display for SnapshotSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

/// Step of the apply transaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    /// Opening the transaction
    Begin,
    /// Insert phase
    Insert,
    /// Update phase
    Update,
    /// Committing the transaction
    Commit,
}

impl std::fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Begin => write!(f, "begin"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Errors that abort a synchronization call.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The backing store could not be reached when acquiring a handle.
    #[error("Failed to connect to the backing store: {source}")]
    Connection {
        /// Adapter cause
        source: BoxError,
    },

    /// The named entity does not exist in the backing store.
    #[error("Entity '{entity}' does not exist")]
    EntityNotFound {
        /// Entity name
        entity: String,
    },

    /// Reading the baseline failed for a reason other than a missing entity.
    #[error("Failed to read entity '{entity}': {source}")]
    Read {
        /// Entity name
        entity: String,
        /// Adapter cause
        source: BoxError,
    },

    /// The incoming snapshot lacks columns present in the baseline.
    #[error(
        "Incoming snapshot for '{entity}' is missing column(s): {}",
        .missing.join(", ")
    )]
    SchemaMismatch {
        /// Entity name
        entity: String,
        /// Baseline columns absent from the incoming snapshot
        missing: Vec<String>,
    },

    /// The key column list is unusable for this entity.
    #[error("Invalid key columns for '{entity}': {reason}")]
    InvalidKey {
        /// Entity name
        entity: String,
        /// What is wrong with the key
        reason: String,
    },

    /// A normalized key occurs more than once in one snapshot and the
    /// duplicate policy rejects duplicates.
    #[error("Duplicate key {key} in {side} snapshot of '{entity}'")]
    DuplicateKey {
        /// Entity name
        entity: String,
        /// Snapshot containing the duplicate
        side: SnapshotSide,
        /// Rendered composite key
        key: String,
    },

    /// A statement of the apply transaction failed; the transaction was
    /// rolled back.
    #[error("Transaction on '{entity}' failed during {phase}: {source}")]
    Transaction {
        /// Entity name
        entity: String,
        /// Failed step
        phase: ApplyPhase,
        /// Adapter cause
        source: BoxError,
    },

    /// The incoming snapshot is malformed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl SyncError {
    /// Build a `Connection` error from an adapter cause.
    pub fn connection(source: impl Into<BoxError>) -> Self {
        Self::Connection {
            source: source.into(),
        }
    }

    /// Build a `Read` error from an adapter cause.
    pub fn read(entity: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Read {
            entity: entity.into(),
            source: source.into(),
        }
    }

    /// Build a `Transaction` error from an adapter cause.
    pub fn transaction(
        entity: impl Into<String>,
        phase: ApplyPhase,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Transaction {
            entity: entity.into(),
            phase,
            source: source.into(),
        }
    }

    /// Build an `InvalidKey` error.
    pub fn invalid_key(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was raised before the store was mutated.
    ///
    /// Only `Transaction` errors happen after mutation started, and those
    /// are rolled back.
    pub fn is_pre_mutation(&self) -> bool {
        !matches!(self, Self::Transaction { .. })
    }
}

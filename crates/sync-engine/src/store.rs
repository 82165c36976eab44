//! Backing-store collaborator traits.
//!
//! The engine only needs a full-table read and a handful of transactional
//! primitives. Adapters implement [`Store`] for an open handle and
//! [`Connector`] for whatever opens one.

use anyhow::Result;
use sync_core::{TableDefinition, TableSnapshot, TypedValue};

/// Kind of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
        }
    }
}

/// A single-row write statement.
///
/// Values carry the declared type of their target column so adapters can
/// bind them natively, nulls included.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Insert one record with all of its columns.
    Insert {
        entity: String,
        values: Vec<(String, TypedValue)>,
    },

    /// Set `assignments` on the records matching every predicate.
    ///
    /// Predicates are equalities joined with AND.
    Update {
        entity: String,
        assignments: Vec<(String, TypedValue)>,
        predicates: Vec<(String, TypedValue)>,
    },
}

impl Statement {
    /// Target entity.
    pub fn entity(&self) -> &str {
        match self {
            Self::Insert { entity, .. } | Self::Update { entity, .. } => entity,
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Insert { .. } => StatementKind::Insert,
            Self::Update { .. } => StatementKind::Update,
        }
    }
}

/// An open handle to a backing store.
///
/// A handle is used by one synchronization call at a time. Statements
/// executed between [`Store::begin`] and [`Store::commit`] are applied
/// atomically.
#[async_trait::async_trait]
pub trait Store: Send {
    /// Read the full content of an entity.
    ///
    /// Returns `None` if the entity doesn't exist.
    async fn read_table(&mut self, entity: &str) -> Result<Option<TableSnapshot>>;

    /// Read only the definition of an entity.
    ///
    /// Returns `None` if the entity doesn't exist. The default reads the
    /// whole table; adapters with a catalog should override it.
    async fn table_definition(&mut self, entity: &str) -> Result<Option<TableDefinition>> {
        Ok(self.read_table(entity).await?.map(|t| t.table))
    }

    /// Open a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Execute a write statement, returning the number of affected records.
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction is currently open on this handle.
    fn in_transaction(&self) -> bool;

    /// Close the handle. Further use is an error.
    async fn close(&mut self) -> Result<()>;
}

/// Opens handles to a backing store.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Handle type produced by this connector.
    type Store: Store;

    /// Open a new handle.
    async fn connect(&self) -> Result<Self::Store>;
}

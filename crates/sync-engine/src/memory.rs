//! In-process backing store.
//!
//! `MemoryDatabase` keeps tables in memory and hands out [`MemoryStore`]
//! handles through [`MemoryConnector`]. Transactions work on a staged copy
//! of all tables that replaces the shared state on commit. Writes enforce
//! NOT NULL and primary key uniqueness and conform values to the declared
//! column types, so the round-trip matches a typed SQL store.
//!
//! Connections are counted and statement, commit and rollback failures can
//! be injected, which makes this the store of choice for engine tests.

use crate::store::{Connector, Statement, StatementKind, Store};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use sync_core::{Row, TableDefinition, TableSnapshot, TypedValue, UniversalValue};
use tracing::debug;

#[derive(Debug, Clone)]
struct MemoryTable {
    definition: TableDefinition,
    rows: Vec<Row>,
}

type Tables = BTreeMap<String, MemoryTable>;

#[derive(Debug)]
struct InjectedFailure {
    kind: StatementKind,
    remaining: usize,
}

#[derive(Debug, Default)]
struct DatabaseState {
    tables: Tables,
    unavailable: bool,
    open_connections: usize,
    total_connections: usize,
    commits: usize,
    rollbacks: usize,
    fail_commits: bool,
    fail_rollbacks: bool,
    failures: Vec<InjectedFailure>,
    executed: Vec<Statement>,
}

/// Shared in-memory database. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DatabaseState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connector handing out handles to this database.
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { db: self.clone() }
    }

    /// Create (or replace) an empty table.
    pub fn create_table(&self, definition: TableDefinition) {
        self.lock().tables.insert(
            definition.name.clone(),
            MemoryTable {
                definition,
                rows: Vec::new(),
            },
        );
    }

    /// Insert rows in table column order, outside any transaction.
    pub fn insert_rows(&self, entity: &str, rows: Vec<Row>) -> Result<()> {
        let mut state = self.lock();
        let table = state
            .tables
            .get_mut(entity)
            .ok_or_else(|| anyhow!("relation \"{entity}\" does not exist"))?;
        for row in rows {
            let width = table.definition.columns.len();
            if row.len() != width {
                bail!(
                    "Row has {} values but \"{}\" has {} columns",
                    row.len(),
                    entity,
                    width
                );
            }
            let values = table
                .definition
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.name.clone(), TypedValue::new(c.column_type.clone(), v)))
                .collect::<Vec<_>>();
            insert(table, &values)?;
        }
        Ok(())
    }

    /// Current committed content of a table.
    pub fn table(&self, entity: &str) -> Option<TableSnapshot> {
        self.lock().tables.get(entity).map(|t| TableSnapshot {
            table: t.definition.clone(),
            rows: t.rows.clone(),
        })
    }

    /// Current committed rows of a table, empty if it doesn't exist.
    pub fn rows(&self, entity: &str) -> Vec<Row> {
        self.table(entity).map(|t| t.rows).unwrap_or_default()
    }

    /// Make new connections fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Fail the `occurrence`-th (1-based) statement of `kind` executed from
    /// now on. Failures of the same kind are armed one after another: a
    /// second one starts counting after the first has fired.
    pub fn fail_on(&self, kind: StatementKind, occurrence: usize) {
        self.lock().failures.push(InjectedFailure {
            kind,
            remaining: occurrence.max(1),
        });
    }

    /// Make every commit fail.
    pub fn fail_commits(&self, fail: bool) {
        self.lock().fail_commits = fail;
    }

    /// Make every rollback fail.
    pub fn fail_rollbacks(&self, fail: bool) {
        self.lock().fail_rollbacks = fail;
    }

    /// Number of handles currently open.
    pub fn open_connections(&self) -> usize {
        self.lock().open_connections
    }

    /// Number of handles opened so far.
    pub fn total_connections(&self) -> usize {
        self.lock().total_connections
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    /// Number of successful rollbacks.
    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    /// Statements executed successfully so far, committed or not.
    pub fn executed_statements(&self) -> Vec<Statement> {
        self.lock().executed.clone()
    }
}

/// Opens [`MemoryStore`] handles.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    db: MemoryDatabase,
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore> {
        let mut state = self.db.lock();
        if state.unavailable {
            bail!("connection refused: in-memory database is unavailable");
        }
        state.open_connections += 1;
        state.total_connections += 1;
        Ok(MemoryStore {
            db: self.db.clone(),
            staged: None,
            closed: false,
        })
    }
}

/// Handle to a [`MemoryDatabase`].
#[derive(Debug)]
pub struct MemoryStore {
    db: MemoryDatabase,
    staged: Option<Tables>,
    closed: bool,
}

impl MemoryStore {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            bail!("connection already closed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn read_table(&mut self, entity: &str) -> Result<Option<TableSnapshot>> {
        self.ensure_open()?;
        let state = self.db.lock();
        let tables = self.staged.as_ref().unwrap_or(&state.tables);
        Ok(tables.get(entity).map(|t| TableSnapshot {
            table: t.definition.clone(),
            rows: t.rows.clone(),
        }))
    }

    async fn begin(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.staged.is_some() {
            bail!("there is already a transaction in progress");
        }
        self.staged = Some(self.db.lock().tables.clone());
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        self.ensure_open()?;
        let mut state = self.db.lock();

        let kind = statement.kind();
        if let Some(pos) = state.failures.iter().position(|f| f.kind == kind) {
            state.failures[pos].remaining -= 1;
            if state.failures[pos].remaining == 0 {
                state.failures.remove(pos);
                bail!("injected failure on {kind} into \"{}\"", statement.entity());
            }
        }

        let tables = match self.staged.as_mut() {
            Some(staged) => staged,
            None => &mut state.tables,
        };
        let table = tables
            .get_mut(statement.entity())
            .ok_or_else(|| anyhow!("relation \"{}\" does not exist", statement.entity()))?;

        let affected = match statement {
            Statement::Insert { values, .. } => {
                insert(table, values)?;
                1
            }
            Statement::Update {
                assignments,
                predicates,
                ..
            } => update(table, assignments, predicates)?,
        };

        debug!("{} on \"{}\" affected {}", kind, statement.entity(), affected);
        state.executed.push(statement.clone());
        Ok(affected)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.db.lock();
        if self.staged.is_none() {
            bail!("there is no transaction in progress");
        }
        if state.fail_commits {
            bail!("injected commit failure");
        }
        if let Some(staged) = self.staged.take() {
            state.tables = staged;
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.db.lock();
        if self.staged.is_none() {
            bail!("there is no transaction in progress");
        }
        if state.fail_rollbacks {
            bail!("injected rollback failure");
        }
        self.staged = None;
        state.rollbacks += 1;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.staged = None;
        self.closed = true;
        let mut state = self.db.lock();
        state.open_connections = state.open_connections.saturating_sub(1);
        Ok(())
    }
}

/// Conform a value to its column, enforcing NOT NULL.
fn column_value(
    table: &MemoryTable,
    column: &str,
    value: &TypedValue,
) -> Result<(usize, UniversalValue)> {
    let idx = table.definition.column_index(column).ok_or_else(|| {
        anyhow!(
            "column \"{column}\" of relation \"{}\" does not exist",
            table.definition.name
        )
    })?;
    let definition = &table.definition.columns[idx];
    let conformed = value
        .value
        .try_conform(&definition.column_type)
        .with_context(|| {
            format!(
                "invalid input for type {}: \"{}\"",
                definition.column_type, value.value
            )
        })?;
    if conformed.is_null() && !definition.nullable {
        bail!(
            "null value in column \"{column}\" of relation \"{}\" violates not-null constraint",
            table.definition.name
        );
    }
    Ok((idx, conformed))
}

fn primary_key_positions(table: &MemoryTable) -> Vec<usize> {
    table
        .definition
        .primary_key
        .iter()
        .filter_map(|c| table.definition.column_index(c))
        .collect()
}

fn same_key(positions: &[usize], a: &Row, b: &Row) -> bool {
    positions.iter().all(|&i| a[i].same_as(&b[i]))
}

fn ensure_unique(table: &MemoryTable, candidate: &Row, skip: Option<usize>) -> Result<()> {
    let positions = primary_key_positions(table);
    if positions.is_empty() {
        return Ok(());
    }
    let clash = table
        .rows
        .iter()
        .enumerate()
        .any(|(i, row)| Some(i) != skip && same_key(&positions, row, candidate));
    if clash {
        bail!(
            "duplicate key value violates unique constraint \"{}_pkey\"",
            table.definition.name
        );
    }
    Ok(())
}

fn insert(table: &mut MemoryTable, values: &[(String, TypedValue)]) -> Result<()> {
    let mut row = vec![UniversalValue::Null; table.definition.columns.len()];
    for (column, value) in values {
        let (idx, conformed) = column_value(table, column, value)?;
        row[idx] = conformed;
    }
    for (column, value) in table.definition.columns.iter().zip(&row) {
        if value.is_null() && !column.nullable {
            bail!(
                "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                column.name,
                table.definition.name
            );
        }
    }
    ensure_unique(table, &row, None)?;
    table.rows.push(row);
    Ok(())
}

fn update(
    table: &mut MemoryTable,
    assignments: &[(String, TypedValue)],
    predicates: &[(String, TypedValue)],
) -> Result<u64> {
    let mut filters = Vec::with_capacity(predicates.len());
    for (column, value) in predicates {
        let idx = table.definition.column_index(column).ok_or_else(|| {
            anyhow!(
                "column \"{column}\" of relation \"{}\" does not exist",
                table.definition.name
            )
        })?;
        let column_type = &table.definition.columns[idx].column_type;
        filters.push((idx, value.value.conform(column_type)));
    }

    let mut sets = Vec::with_capacity(assignments.len());
    for (column, value) in assignments {
        sets.push(column_value(table, column, value)?);
    }

    let matching: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            filters
                .iter()
                .all(|(idx, v)| !v.is_null() && row[*idx].same_as(v))
        })
        .map(|(i, _)| i)
        .collect();

    for &i in &matching {
        let mut row = table.rows[i].clone();
        for (idx, value) in &sets {
            row[*idx] = value.clone();
        }
        ensure_unique(table, &row, Some(i))?;
        table.rows[i] = row;
    }
    Ok(matching.len() as u64)
}

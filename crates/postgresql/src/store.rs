//! PostgreSQL backing store.

use crate::forward::to_params;
use crate::reverse::convert_row;
use crate::schema::read_table_definition;
use crate::sql::{qualified_name, render_select, render_statement};
use anyhow::{bail, Context, Result};
use std::time::Duration;
use sync_core::{Snapshot, TableDefinition, TableSnapshot};
use sync_engine::{Connector, Statement, Store};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, warn};

/// Default schema tables are looked up in.
pub const DEFAULT_SCHEMA: &str = "public";

/// Connection settings.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// libpq-style connection string or `postgres://` URL
    pub connection_string: String,

    /// Schema holding the synchronized tables
    pub schema: String,

    /// Timeout for establishing the connection
    pub connect_timeout: Option<Duration>,
}

impl PostgresConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            connect_timeout: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Opens [`PostgresStore`] handles.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConfig,
}

impl PostgresConnector {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    async fn connect_client(&self) -> Result<Client> {
        let mut pg_config: tokio_postgres::Config = self
            .config
            .connection_string
            .parse()
            .context("Invalid PostgreSQL connection string")?;
        if let Some(timeout) = self.config.connect_timeout {
            pg_config.connect_timeout(timeout);
        }

        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .context("Failed to connect to PostgreSQL")?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {e}");
            }
        });

        Ok(client)
    }
}

#[async_trait::async_trait]
impl Connector for PostgresConnector {
    type Store = PostgresStore;

    async fn connect(&self) -> Result<PostgresStore> {
        let client = self.connect_client().await?;
        debug!("Connected to PostgreSQL (schema {})", self.config.schema);
        Ok(PostgresStore {
            client: Some(client),
            schema: self.config.schema.clone(),
            in_transaction: false,
        })
    }
}

/// An open PostgreSQL connection.
pub struct PostgresStore {
    client: Option<Client>,
    schema: String,
    in_transaction: bool,
}

impl PostgresStore {
    fn client(&self) -> Result<&Client> {
        match &self.client {
            Some(client) => Ok(client),
            None => bail!("PostgreSQL connection is closed"),
        }
    }

    /// Run a query in a read-only transaction and collect its result as a
    /// snapshot.
    pub async fn query_snapshot(&mut self, sql: &str) -> Result<Snapshot> {
        if self.in_transaction {
            bail!("Cannot run a query while a transaction is open");
        }
        let client = self.client()?;
        client.batch_execute("BEGIN READ ONLY").await?;
        let result = run_query(client, sql).await;
        if let Err(e) = client.batch_execute("ROLLBACK").await {
            warn!("Rollback after query failed: {e}");
        }
        result
    }
}

async fn run_query(client: &Client, sql: &str) -> Result<Snapshot> {
    debug!("Query: {sql}");
    let statement = client
        .prepare(sql)
        .await
        .context("Failed to prepare query")?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut snapshot = Snapshot::new(columns)?;
    for row in client.query(&statement, &[]).await.context("Query failed")? {
        snapshot.push_row(convert_row(&row)?)?;
    }
    Ok(snapshot)
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn read_table(&mut self, entity: &str) -> Result<Option<TableSnapshot>> {
        let client = self.client()?;
        let Some(definition) = read_table_definition(client, &self.schema, entity).await? else {
            return Ok(None);
        };

        let sql = render_select(&self.schema, entity, &definition.column_names());
        debug!("{sql}");
        let rows = client
            .query(&sql, &[])
            .await
            .with_context(|| format!("Failed to read {}", qualified_name(&self.schema, entity)))?;

        let rows = rows
            .iter()
            .map(convert_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(TableSnapshot::new(definition, rows)?))
    }

    async fn table_definition(&mut self, entity: &str) -> Result<Option<TableDefinition>> {
        read_table_definition(self.client()?, &self.schema, entity).await
    }

    async fn begin(&mut self) -> Result<()> {
        self.client()?.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let client = self.client()?;
        let (sql, values) = render_statement(&self.schema, statement);
        let params = to_params(&values)?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        debug!("{sql}");
        let affected = client.execute(&sql, &param_refs).await?;
        Ok(affected)
    }

    async fn commit(&mut self) -> Result<()> {
        self.client()?.batch_execute("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let result = self.client()?.batch_execute("ROLLBACK").await;
        self.in_transaction = false;
        result?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn close(&mut self) -> Result<()> {
        if self.in_transaction {
            if let Err(e) = self.rollback().await {
                warn!("Rollback on close failed: {e}");
            }
        }
        // Dropping the client ends the connection task
        self.client.take();
        Ok(())
    }
}

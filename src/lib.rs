//! asset-sync
//!
//! Incrementally synchronizes collected datasets (prices, rates, asset
//! registries) into PostgreSQL tables. Each run reads the table, inserts
//! the records whose key is new, updates the records whose content
//! changed, and leaves everything else alone, all in one transaction.
//!
//! # Crates
//!
//! - `sync_core` - column types, values, snapshots, key normalization and diff
//! - `sync_engine` - connection lifecycle, transactional apply, `synchronize`
//! - `asset_sync_postgresql` - the PostgreSQL backing store
//! - `asset_sync_csv_source` / `asset_sync_jsonl_source` - snapshot files
//!
//! # CLI Usage
//!
//! ```bash
//! # Synchronize one table from a CSV file
//! asset-sync sync --connection-string postgres://... \
//!   --table PRECOS --key TICKER,DATA --csv precos.csv
//!
//! # Run every job of a YAML file
//! asset-sync jobs --file jobs.yaml
//!
//! # Print a table or a query result as JSON Lines
//! asset-sync read --table PRECOS
//! asset-sync query --sql 'SELECT * FROM "PRECOS" WHERE "PRECO" > 10'
//! ```

use anyhow::Result;
use clap::Args;
use std::time::Duration;

pub mod commands;
pub mod config;

pub use asset_sync_csv_source as csv;
pub use asset_sync_jsonl_source as jsonl;
pub use asset_sync_postgresql as postgresql;

use postgresql::PostgresConfig;

/// PostgreSQL connection options.
#[derive(Args, Clone, Debug)]
pub struct PostgresOpts {
    /// PostgreSQL connection string
    #[arg(long, env = "DB_CONNECTION_STRING", hide_env_values = true, global = true)]
    pub connection_string: Option<String>,

    /// Schema holding the synchronized tables
    #[arg(long, env = "DB_SCHEMA", default_value = postgresql::DEFAULT_SCHEMA, global = true)]
    pub schema: String,

    /// Connection timeout ("30s", "2m", "1h" or plain seconds)
    #[arg(long, value_parser = config::parse_duration, global = true)]
    pub connect_timeout: Option<Duration>,
}

impl PostgresOpts {
    /// Build the adapter configuration.
    pub fn to_config(&self) -> Result<PostgresConfig> {
        self.to_config_with(None, None)
    }

    /// Build the adapter configuration, with a connection string and schema
    /// taking precedence over the command line when given.
    pub fn to_config_with(
        &self,
        connection_string: Option<&str>,
        schema: Option<&str>,
    ) -> Result<PostgresConfig> {
        let Some(connection_string) = connection_string.or(self.connection_string.as_deref())
        else {
            anyhow::bail!(
                "No connection string: pass --connection-string or set DB_CONNECTION_STRING"
            );
        };
        Ok(PostgresConfig::new(connection_string)
            .with_schema(schema.unwrap_or(&self.schema))
            .with_connect_timeout(self.connect_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(connection_string: Option<&str>) -> PostgresOpts {
        PostgresOpts {
            connection_string: connection_string.map(str::to_string),
            schema: "public".to_string(),
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }

    #[test]
    fn test_to_config() {
        let config = opts(Some("postgres://localhost/market")).to_config().unwrap();
        assert_eq!(config.connection_string, "postgres://localhost/market");
        assert_eq!(config.schema, "public");
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_job_file_values_take_precedence() {
        let config = opts(Some("postgres://cli"))
            .to_config_with(Some("postgres://file"), Some("mercado"))
            .unwrap();
        assert_eq!(config.connection_string, "postgres://file");
        assert_eq!(config.schema, "mercado");
    }

    #[test]
    fn test_missing_connection_string() {
        let err = opts(None).to_config().unwrap_err();
        assert!(err.to_string().contains("DB_CONNECTION_STRING"));
    }
}

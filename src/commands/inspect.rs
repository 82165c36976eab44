//! `read` and `query` commands.

use crate::jsonl::write_snapshot;
use crate::postgresql::PostgresConnector;
use crate::PostgresOpts;
use anyhow::Result;
use std::io::Write;
use sync_engine::{read_baseline, ConnectionManager, Connector, Store};

/// Write the full content of `table` as JSON Lines.
pub async fn read_table<C: Connector, W: Write>(
    connector: &C,
    table: &str,
    out: &mut W,
) -> Result<usize> {
    let mut manager = ConnectionManager::new(connector);
    let result = async {
        let store = manager.acquire().await?;
        read_baseline(store, table).await
    }
    .await;
    manager.release().await;

    let baseline = result?;
    write_snapshot(out, &baseline.to_snapshot())?;
    Ok(baseline.len())
}

pub async fn run_read(opts: &PostgresOpts, table: &str) -> Result<()> {
    let connector = PostgresConnector::new(opts.to_config()?);
    let stdout = std::io::stdout();
    read_table(&connector, table, &mut stdout.lock()).await?;
    Ok(())
}

pub async fn run_query(opts: &PostgresOpts, sql: &str) -> Result<()> {
    let connector = PostgresConnector::new(opts.to_config()?);
    let mut store = connector.connect().await?;
    let result = store.query_snapshot(sql).await;
    store.close().await?;

    let stdout = std::io::stdout();
    write_snapshot(&mut stdout.lock(), &result?)?;
    Ok(())
}

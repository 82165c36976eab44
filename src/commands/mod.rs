//! Command handlers.
//!
//! - `sync`: one table from one snapshot file
//! - `jobs`: several syncs from a YAML job file
//! - `inspect`: `read` and `query`, printing JSON Lines
//!
//! Handlers that only need the engine are generic over
//! [`sync_engine::Connector`]; the `run` functions bind them to PostgreSQL.

pub mod inspect;
pub mod jobs;
pub mod sync;

use anyhow::Result;
use sync_engine::SyncResult;

/// Print a sync result as one JSON line on stdout.
pub fn print_result(result: &SyncResult) -> Result<()> {
    println!("{}", serde_json::to_string(result)?);
    Ok(())
}

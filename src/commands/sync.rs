//! `sync` command.

use crate::config::{SnapshotSource, SyncJob};
use crate::postgresql::PostgresConnector;
use crate::PostgresOpts;
use anyhow::Result;
use clap::{ArgGroup, Args};
use std::path::PathBuf;
use sync_core::DuplicatePolicy;
use sync_engine::{primary_key, synchronize, Connector, SyncOptions, SyncResult};
use tracing::info;

#[derive(Args, Clone, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["csv", "jsonl"])))]
pub struct SyncArgs {
    /// Target table
    #[arg(long)]
    pub table: String,

    /// Key columns, comma separated (default: the table's primary key)
    #[arg(long = "key", value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Incoming snapshot as CSV with a header row
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Incoming snapshot as JSON Lines
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// CSV delimiter character
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// YAML table definitions used as CSV column type hints
    #[arg(long)]
    pub schema_file: Option<PathBuf>,

    /// Compute and report the changes without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// What to do with duplicate keys: keep-last or reject
    #[arg(long, default_value_t = DuplicatePolicy::KeepLast)]
    pub on_duplicate: DuplicatePolicy,
}

impl SyncArgs {
    pub fn to_job(&self) -> Result<SyncJob> {
        let source = match (&self.csv, &self.jsonl) {
            (Some(path), None) => SnapshotSource::Csv {
                path: path.clone(),
                delimiter: self.delimiter,
            },
            (None, Some(path)) => SnapshotSource::Jsonl { path: path.clone() },
            _ => anyhow::bail!("Exactly one of --csv and --jsonl is required"),
        };
        Ok(SyncJob {
            table: self.table.clone(),
            keys: self.keys.clone(),
            source,
            on_duplicate: self.on_duplicate,
            schema_file: self.schema_file.clone(),
        })
    }
}

/// Load the job's snapshot and synchronize its table.
pub async fn run_job<C: Connector>(
    connector: &C,
    job: &SyncJob,
    dry_run: bool,
) -> Result<SyncResult> {
    let incoming = job.source.load(job.column_types()?)?;

    let keys = if job.keys.is_empty() {
        let keys = primary_key(connector, &job.table).await?;
        info!("Using primary key ({}) of '{}'", keys.join(", "), job.table);
        keys
    } else {
        job.keys.clone()
    };

    let options = SyncOptions {
        dry_run,
        duplicate_policy: job.on_duplicate,
    };
    Ok(synchronize(connector, &job.table, &keys, &incoming, options).await?)
}

pub async fn run(opts: &PostgresOpts, args: SyncArgs) -> Result<()> {
    let connector = PostgresConnector::new(opts.to_config()?);
    if args.dry_run {
        info!("Running in dry-run mode - no data will be written");
    }
    let result = run_job(&connector, &args.to_job()?, args.dry_run).await?;
    super::print_result(&result)
}

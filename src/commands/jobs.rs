//! `jobs` command.

use super::sync::run_job;
use crate::config::{JobFile, SyncJob};
use crate::postgresql::PostgresConnector;
use crate::PostgresOpts;
use anyhow::{Context, Result};
use std::path::Path;
use sync_engine::{Connector, SyncResult};
use tracing::info;

/// Run jobs one after the other, stopping at the first failure.
pub async fn run_jobs<C: Connector>(
    connector: &C,
    jobs: &[SyncJob],
    dry_run: bool,
) -> Result<Vec<SyncResult>> {
    let mut results = Vec::with_capacity(jobs.len());
    for (idx, job) in jobs.iter().enumerate() {
        info!("Job {}/{}: '{}'", idx + 1, jobs.len(), job.table);
        let result = run_job(connector, job, dry_run)
            .await
            .with_context(|| format!("Job {} ('{}') failed", idx + 1, job.table))?;
        results.push(result);
    }
    Ok(results)
}

pub async fn run(opts: &PostgresOpts, file: &Path, dry_run: bool) -> Result<()> {
    let job_file = JobFile::from_file(file)?;
    let config =
        opts.to_config_with(job_file.connection_string.as_deref(), job_file.schema.as_deref())?;
    let connector = PostgresConnector::new(config);

    for result in run_jobs(&connector, &job_file.jobs, dry_run).await? {
        super::print_result(&result)?;
    }
    info!("Completed {} job(s)", job_file.jobs.len());
    Ok(())
}

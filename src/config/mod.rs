//! Configuration: command-line value parsing and YAML job files.

mod duration;
mod jobs;

pub use duration::{parse_duration, parse_duration_to_secs};
pub use jobs::{JobFile, SnapshotSource, SyncJob};

//! CSV snapshot source for asset-sync.
//!
//! Reads a CSV file with a header row into a [`sync_core::Snapshot`].

mod reader;

pub use reader::{parse_cell, read_snapshot, read_snapshot_from_path, CsvOptions};

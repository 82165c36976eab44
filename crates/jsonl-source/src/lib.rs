//! JSON Lines snapshot source for asset-sync.
//!
//! One JSON object per line. The snapshot's columns are the union of the
//! keys seen, in first-seen order; keys missing from a line read as null.
//! The writer emits the inverse, one object per row in column order, and
//! is what the CLI uses to print tables and query results.

mod conversion;
mod reader;
mod writer;

pub use conversion::{json_to_value, value_to_json};
pub use reader::{read_snapshot, read_snapshot_from_path};
pub use writer::{write_row, write_snapshot};

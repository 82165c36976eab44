//! PostgreSQL backing store for asset-sync.
//!
//! [`PostgresConnector`] opens [`PostgresStore`] handles that implement the
//! engine's [`sync_engine::Store`] trait: table definitions come from
//! `information_schema`, rows are converted cell by cell from their
//! PostgreSQL type, and writes are bound as native parameters of the
//! declared column type.

pub mod forward;
pub mod reverse;
pub mod schema;
pub mod sql;
pub mod store;

pub use forward::{pg_value_to_boxed, ConversionError, PostgreSQLValue};
pub use reverse::{convert_postgres_value, convert_row};
pub use schema::{get_primary_key_columns, postgresql_column_to_universal_type, read_table_definition};
pub use sql::{qualified_name, quote_ident};
pub use store::{PostgresConfig, PostgresConnector, PostgresStore, DEFAULT_SCHEMA};

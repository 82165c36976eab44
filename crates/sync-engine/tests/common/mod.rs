//! Shared fixtures for engine tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use sync_engine::sync_core::{
    ColumnDefinition, Row, Snapshot, TableDefinition, UniversalType, UniversalValue,
};
use sync_engine::MemoryDatabase;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const PRICES: &str = "PRECOS";

/// Initialize logging for tests
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub fn prices_table() -> TableDefinition {
    TableDefinition::new(
        PRICES,
        vec![
            ColumnDefinition::not_null("TICKER", UniversalType::Text),
            ColumnDefinition::not_null("DATA", UniversalType::Date),
            ColumnDefinition::not_null("PRECO", UniversalType::Float64),
        ],
    )
    .with_primary_key(["TICKER", "DATA"])
}

/// A database holding an empty prices table.
pub fn prices_database() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_table(prices_table());
    db
}

pub fn prices_key() -> Vec<String> {
    vec!["TICKER".to_string(), "DATA".to_string()]
}

pub fn date(s: &str) -> UniversalValue {
    UniversalValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
}

/// A stored prices row.
pub fn stored(ticker: &str, day: &str, price: f64) -> Row {
    vec![ticker.into(), date(day), price.into()]
}

/// An incoming prices row, with the date as text like a scraper produces.
pub fn collected(ticker: &str, day: &str, price: impl Into<UniversalValue>) -> Row {
    vec![ticker.into(), day.into(), price.into()]
}

pub fn incoming(rows: Vec<Row>) -> Snapshot {
    Snapshot::with_rows(["TICKER", "DATA", "PRECO"], rows).unwrap()
}

/// A funds table keyed by a text code. Without a primary key the code
/// column is nullable.
pub fn funds_database(key_nullable: bool) -> MemoryDatabase {
    let key = if key_nullable {
        ColumnDefinition::new("CODIGO", UniversalType::Text)
    } else {
        ColumnDefinition::not_null("CODIGO", UniversalType::Text)
    };
    let table = TableDefinition::new(
        "FUNDOS",
        vec![key, ColumnDefinition::new("COTA", UniversalType::Float64)],
    );
    let table = if key_nullable {
        table
    } else {
        table.with_primary_key(["CODIGO"])
    };
    let db = MemoryDatabase::new();
    db.create_table(table);
    db
}

pub fn funds_key() -> Vec<String> {
    vec!["CODIGO".to_string()]
}

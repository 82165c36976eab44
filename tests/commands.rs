//! Command handlers against the in-memory store.

use asset_sync::commands::inspect::read_table;
use asset_sync::commands::jobs::run_jobs;
use asset_sync::commands::sync::run_job;
use asset_sync::config::{JobFile, SnapshotSource, SyncJob};
use pretty_assertions::assert_eq;
use std::path::Path;
use sync_core::{
    ColumnDefinition, DuplicatePolicy, SyncError, TableDefinition, UniversalType, UniversalValue,
};
use sync_engine::MemoryDatabase;

fn prices_database() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_table(
        TableDefinition::new(
            "PRECOS",
            vec![
                ColumnDefinition::not_null("TICKER", UniversalType::Text),
                ColumnDefinition::not_null("DATA", UniversalType::Date),
                ColumnDefinition::not_null("PRECO", UniversalType::Float64),
            ],
        )
        .with_primary_key(["TICKER", "DATA"]),
    );
    db
}

fn csv_job(path: &Path, keys: &[&str]) -> SyncJob {
    SyncJob {
        table: "PRECOS".to_string(),
        keys: keys.iter().map(|k| k.to_string()).collect(),
        source: SnapshotSource::Csv {
            path: path.to_path_buf(),
            delimiter: ',',
        },
        on_duplicate: DuplicatePolicy::KeepLast,
        schema_file: None,
    }
}

#[tokio::test]
async fn test_csv_job_inserts_then_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("precos.csv");
    let db = prices_database();
    let connector = db.connector();

    std::fs::write(&path, "TICKER,DATA,PRECO\nAAA,2024-01-01,10\nBBB,2024-01-01,20\n").unwrap();
    let first = run_job(&connector, &csv_job(&path, &["TICKER", "DATA"]), false)
        .await
        .unwrap();
    assert_eq!((first.inserted, first.updated, first.unchanged), (2, 0, 0));

    std::fs::write(&path, "TICKER,DATA,PRECO\nAAA,2024-01-01,10.5\nBBB,2024-01-01,20\n").unwrap();
    let second = run_job(&connector, &csv_job(&path, &["TICKER", "DATA"]), false)
        .await
        .unwrap();
    assert_eq!((second.inserted, second.updated, second.unchanged), (0, 1, 1));
    assert_eq!(db.rows("PRECOS")[0][2], UniversalValue::Float(10.5));
}

#[tokio::test]
async fn test_csv_codes_with_leading_zeros_match_stored_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fundos.csv");
    std::fs::write(&path, "CODIGO,COTA\n00123,10.50\n00456,3\n").unwrap();

    let db = MemoryDatabase::new();
    db.create_table(
        TableDefinition::new(
            "FUNDOS",
            vec![
                ColumnDefinition::not_null("CODIGO", UniversalType::Text),
                ColumnDefinition::new("COTA", UniversalType::Float64),
            ],
        )
        .with_primary_key(["CODIGO"]),
    );
    db.insert_rows("FUNDOS", vec![vec!["00123".into(), 10.5.into()]])
        .unwrap();

    let job = SyncJob {
        table: "FUNDOS".to_string(),
        keys: vec![],
        source: SnapshotSource::Csv {
            path,
            delimiter: ',',
        },
        on_duplicate: DuplicatePolicy::Reject,
        schema_file: None,
    };
    let result = run_job(&db.connector(), &job, false).await.unwrap();

    assert_eq!((result.inserted, result.updated, result.unchanged), (1, 0, 1));
    assert_eq!(
        db.rows("FUNDOS"),
        vec![
            vec![UniversalValue::text("00123"), UniversalValue::Float(10.5)],
            vec![UniversalValue::text("00456"), UniversalValue::Float(3.0)],
        ]
    );
}

#[tokio::test]
async fn test_keys_default_to_primary_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("precos.csv");
    std::fs::write(&path, "TICKER,DATA,PRECO\nAAA,2024-01-01,10\n").unwrap();
    let db = prices_database();

    let result = run_job(&db.connector(), &csv_job(&path, &[]), false)
        .await
        .unwrap();
    assert_eq!(result.inserted, 1);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("precos.csv");
    std::fs::write(&path, "TICKER,DATA,PRECO\nAAA,2024-01-01,10\n").unwrap();
    let db = prices_database();

    let result = run_job(&db.connector(), &csv_job(&path, &["TICKER", "DATA"]), true)
        .await
        .unwrap();
    assert!(result.dry_run);
    assert_eq!(result.inserted, 1);
    assert!(db.rows("PRECOS").is_empty());
}

#[tokio::test]
async fn test_job_file_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("precos.jsonl"),
        "{\"TICKER\": \"AAA\", \"DATA\": \"2024-01-01\", \"PRECO\": 10}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("jobs.yaml"),
        r#"
jobs:
  - table: PRECOS
    keys: [TICKER, DATA]
    source: { format: jsonl, path: precos.jsonl }
  - table: COTACOES
    keys: [TICKER]
    source: { format: jsonl, path: precos.jsonl }
  - table: PRECOS
    source: { format: jsonl, path: precos.jsonl }
"#,
    )
    .unwrap();
    let file = JobFile::from_file(dir.path().join("jobs.yaml")).unwrap();
    let db = prices_database();

    let err = run_jobs(&db.connector(), &file.jobs, false)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Job 2 ('COTACOES') failed"), "{err:#}");
    assert!(matches!(
        err.root_cause().downcast_ref::<SyncError>(),
        Some(SyncError::EntityNotFound { .. })
    ));
    // The first job committed, the third never ran
    assert_eq!(db.rows("PRECOS").len(), 1);
    assert_eq!(db.commits(), 1);
    assert_eq!(db.open_connections(), 0);
}

#[tokio::test]
async fn test_missing_snapshot_file_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let db = prices_database();

    let err = run_job(
        &db.connector(),
        &csv_job(&dir.path().join("missing.csv"), &["TICKER", "DATA"]),
        false,
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("Failed to open CSV file"));
    assert_eq!(db.total_connections(), 0);
}

#[tokio::test]
async fn test_read_table_as_json_lines() {
    let db = prices_database();
    db.insert_rows(
        "PRECOS",
        vec![vec![
            "AAA".into(),
            UniversalValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            10.5.into(),
        ]],
    )
    .unwrap();

    let mut out = Vec::new();
    let count = read_table(&db.connector(), "PRECOS", &mut out).await.unwrap();

    assert_eq!(count, 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "{\"TICKER\":\"AAA\",\"DATA\":\"2024-01-01\",\"PRECO\":10.5}\n"
    );
    assert_eq!(db.open_connections(), 0);
}

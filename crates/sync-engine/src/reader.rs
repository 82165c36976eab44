//! Baseline reads.

use crate::store::Store;
use sync_core::{SyncError, TableSnapshot};
use tracing::{debug, info};

/// Load the full current content of `entity`.
///
/// A missing entity is [`SyncError::EntityNotFound`]; any other adapter
/// failure is [`SyncError::Read`].
pub async fn read_baseline<S>(store: &mut S, entity: &str) -> Result<TableSnapshot, SyncError>
where
    S: Store + ?Sized,
{
    debug!("Reading baseline of '{}'", entity);
    match store.read_table(entity).await {
        Ok(Some(baseline)) => {
            info!(
                "Read {} baseline row(s) from '{}' ({} columns)",
                baseline.len(),
                entity,
                baseline.table.columns.len()
            );
            Ok(baseline)
        }
        Ok(None) => Err(SyncError::EntityNotFound {
            entity: entity.to_string(),
        }),
        Err(e) => Err(SyncError::read(entity, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use crate::store::Connector;
    use sync_core::{ColumnDefinition, TableDefinition, UniversalType};

    #[tokio::test]
    async fn test_missing_entity() {
        let db = MemoryDatabase::new();
        let mut store = db.connector().connect().await.unwrap();
        let err = read_baseline(&mut store, "PRECOS").await.unwrap_err();
        assert!(matches!(err, SyncError::EntityNotFound { entity } if entity == "PRECOS"));
    }

    #[tokio::test]
    async fn test_reads_rows_in_column_order() {
        let db = MemoryDatabase::new();
        db.create_table(TableDefinition::new(
            "ATIVOS",
            vec![
                ColumnDefinition::not_null("TICKER", UniversalType::Text),
                ColumnDefinition::new("SETOR", UniversalType::Text),
            ],
        ));
        db.insert_rows("ATIVOS", vec![vec!["AAA".into(), "Energia".into()]])
            .unwrap();

        let mut store = db.connector().connect().await.unwrap();
        let baseline = read_baseline(&mut store, "ATIVOS").await.unwrap();
        assert_eq!(baseline.table.column_names(), vec!["TICKER", "SETOR"]);
        assert_eq!(baseline.rows, vec![vec!["AAA".into(), "Energia".into()]]);
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::application::ports::outbound::{
    ContentRecord, ContentStoreError, ContentStorePort, RecordLocation, RecordMetadata,
};
use crate::domain::entities::{ContentKind, ProposalPayload};
use crate::domain::value_objects::ProposalId;

type RecordRow = (
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<i64>,
    Option<String>,
);

/// Published content records, one row per `(kind, id)`
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_records (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                payload TEXT NOT NULL,
                proposal_id TEXT,
                generated_at TIMESTAMP NOT NULL,
                published_at TIMESTAMP NOT NULL,
                seed INTEGER,
                flavor TEXT,
                PRIMARY KEY (kind, id)
            )
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

fn record_from_row(row: RecordRow) -> Result<ContentRecord, ContentStoreError> {
    let (kind, id, payload, proposal_id, generated_at, published_at, seed, flavor) = row;
    let kind: ContentKind = kind
        .parse()
        .map_err(|e: anyhow::Error| ContentStoreError::Serialization(e.to_string()))?;
    let payload: ProposalPayload = serde_json::from_str(&payload)
        .map_err(|e| ContentStoreError::Serialization(e.to_string()))?;
    let proposal_id = proposal_id
        .map(|raw| raw.parse::<ProposalId>())
        .transpose()
        .map_err(|e| ContentStoreError::Serialization(e.to_string()))?;

    Ok(ContentRecord {
        kind,
        id,
        payload,
        metadata: RecordMetadata {
            proposal_id,
            generated_at,
            published_at,
            seed: seed.map(|s| s as u64),
            flavor,
        },
    })
}

const SELECT_RECORD: &str = "SELECT kind, id, payload, proposal_id, generated_at, published_at, seed, flavor FROM content_records";

#[async_trait]
impl ContentStorePort for SqliteContentStore {
    async fn write_record(&self, record: &ContentRecord) -> Result<RecordLocation, ContentStoreError> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| ContentStoreError::Serialization(e.to_string()))?;

        sqlx::query(
            "INSERT OR REPLACE INTO content_records (kind, id, payload, proposal_id, generated_at, published_at, seed, flavor) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.kind.as_str())
        .bind(&record.id)
        .bind(payload)
        .bind(record.metadata.proposal_id.map(|id| id.to_string()))
        .bind(record.metadata.generated_at)
        .bind(record.metadata.published_at)
        .bind(record.metadata.seed.map(|s| s as i64))
        .bind(record.metadata.flavor.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| ContentStoreError::Database(e.to_string()))?;

        Ok(record.location())
    }

    async fn read_record(
        &self,
        kind: ContentKind,
        id: &str,
    ) -> Result<Option<ContentRecord>, ContentStoreError> {
        let row: Option<RecordRow> =
            sqlx::query_as(&format!("{} WHERE kind = ? AND id = ?", SELECT_RECORD))
                .bind(kind.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ContentStoreError::Database(e.to_string()))?;

        row.map(record_from_row).transpose()
    }

    async fn list_records(&self, kind: ContentKind) -> Result<Vec<ContentRecord>, ContentStoreError> {
        let rows: Vec<RecordRow> =
            sqlx::query_as(&format!("{} WHERE kind = ? ORDER BY published_at, id", SELECT_RECORD))
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ContentStoreError::Database(e.to_string()))?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn delete_record(&self, kind: ContentKind, id: &str) -> Result<bool, ContentStoreError> {
        let result = sqlx::query("DELETE FROM content_records WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ContentStoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ItemDefinition;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteContentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteContentStore::new(pool).await.unwrap()
    }

    fn item_record(id: &str, value: i64) -> ContentRecord {
        let item: ItemDefinition = serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Lantern",
            "description": "A brass lantern",
            "item_type": "tool",
            "rarity": "common",
            "value": value,
        }))
        .unwrap();
        ContentRecord {
            kind: ContentKind::Item,
            id: id.to_string(),
            payload: ProposalPayload::Item(item),
            metadata: RecordMetadata {
                proposal_id: Some(ProposalId::new()),
                seed: Some(42),
                flavor: Some("warm".to_string()),
                ..RecordMetadata::manual()
            },
        }
    }

    #[tokio::test]
    async fn test_write_replaces_at_same_address() {
        let store = store().await;
        let location = store.write_record(&item_record("item_lantern", 10)).await.unwrap();
        assert_eq!(location.to_string(), "item/item_lantern");

        store.write_record(&item_record("item_lantern", 25)).await.unwrap();
        let records = store.list_records(ContentKind::Item).await.unwrap();
        assert_eq!(records.len(), 1);
        match &records[0].payload {
            ProposalPayload::Item(item) => assert_eq!(item.value, 25),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(records[0].metadata.seed, Some(42));
    }

    #[tokio::test]
    async fn test_read_and_delete() {
        let store = store().await;
        let record = item_record("item_rope", 3);
        store.write_record(&record).await.unwrap();

        let loaded = store.read_record(ContentKind::Item, "item_rope").await.unwrap().unwrap();
        assert_eq!(loaded.payload, record.payload);
        assert_eq!(loaded.metadata.proposal_id, record.metadata.proposal_id);
        assert!(store.read_record(ContentKind::Character, "item_rope").await.unwrap().is_none());
        assert!(store.delete_record(ContentKind::Item, "item_rope").await.unwrap());
        assert!(!store.delete_record(ContentKind::Item, "item_rope").await.unwrap());
    }
}

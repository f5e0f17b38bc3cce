use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::application::ports::outbound::{SnapshotError, SnapshotRepositoryPort};
use crate::domain::entities::{SnapshotSummary, WorldSnapshot};
use crate::domain::value_objects::SnapshotId;

/// Snapshots stored whole as JSON, with the summary columns kept alongside for listing
pub struct SqliteSnapshotRepository {
    pool: SqlitePool,
}

impl SqliteSnapshotRepository {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS world_snapshots (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                entity_count INTEGER NOT NULL,
                event_count INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL,
                data TEXT NOT NULL
            )
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SnapshotRepositoryPort for SqliteSnapshotRepository {
    async fn save(&self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        let data = serde_json::to_string(snapshot)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        let summary = snapshot.summary();

        sqlx::query(
            "INSERT OR REPLACE INTO world_snapshots (id, label, created_at, entity_count, event_count, chunk_count, data) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(summary.id.to_string())
        .bind(&summary.label)
        .bind(summary.created_at)
        .bind(summary.entity_count as i64)
        .bind(summary.event_count as i64)
        .bind(summary.chunk_count as i64)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| SnapshotError::Database(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, id: SnapshotId) -> Result<Option<WorldSnapshot>, SnapshotError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM world_snapshots WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SnapshotError::Database(e.to_string()))?;

        row.map(|(data,)| {
            serde_json::from_str(&data).map_err(|e| SnapshotError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn list(&self) -> Result<Vec<SnapshotSummary>, SnapshotError> {
        let rows: Vec<(String, String, DateTime<Utc>, i64, i64, i64)> = sqlx::query_as(
            "SELECT id, label, created_at, entity_count, event_count, chunk_count FROM world_snapshots ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SnapshotError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(id, label, created_at, entities, events, chunks)| {
                let id = id
                    .parse::<SnapshotId>()
                    .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
                Ok(SnapshotSummary {
                    id,
                    label,
                    created_at,
                    entity_count: entities as usize,
                    event_count: events as usize,
                    chunk_count: chunks as usize,
                })
            })
            .collect()
    }

    async fn delete(&self, id: SnapshotId) -> Result<bool, SnapshotError> {
        let result = sqlx::query("DELETE FROM world_snapshots WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| SnapshotError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

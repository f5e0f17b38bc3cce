//! In-memory content and snapshot stores
//!
//! Used when running without a database and by tests throughout the crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::outbound::{
    ContentRecord, ContentStoreError, ContentStorePort, RecordLocation, SnapshotError,
    SnapshotRepositoryPort,
};
use crate::domain::entities::{ContentKind, SnapshotSummary, WorldSnapshot};
use crate::domain::value_objects::SnapshotId;

#[derive(Default)]
pub struct InMemoryContentStore {
    records: RwLock<BTreeMap<(ContentKind, String), ContentRecord>>,
}

#[async_trait]
impl ContentStorePort for InMemoryContentStore {
    async fn write_record(&self, record: &ContentRecord) -> Result<RecordLocation, ContentStoreError> {
        self.records
            .write()
            .await
            .insert((record.kind, record.id.clone()), record.clone());
        Ok(record.location())
    }

    async fn read_record(
        &self,
        kind: ContentKind,
        id: &str,
    ) -> Result<Option<ContentRecord>, ContentStoreError> {
        Ok(self.records.read().await.get(&(kind, id.to_string())).cloned())
    }

    async fn list_records(&self, kind: ContentKind) -> Result<Vec<ContentRecord>, ContentStoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn delete_record(&self, kind: ContentKind, id: &str) -> Result<bool, ContentStoreError> {
        Ok(self
            .records
            .write()
            .await
            .remove(&(kind, id.to_string()))
            .is_some())
    }
}

#[derive(Default)]
pub struct InMemorySnapshotRepository {
    snapshots: RwLock<Vec<WorldSnapshot>>,
}

#[async_trait]
impl SnapshotRepositoryPort for InMemorySnapshotRepository {
    async fn save(&self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.retain(|s| s.id != snapshot.id);
        snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: SnapshotId) -> Result<Option<WorldSnapshot>, SnapshotError> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<SnapshotSummary>, SnapshotError> {
        let mut summaries: Vec<SnapshotSummary> = self
            .snapshots
            .read()
            .await
            .iter()
            .map(WorldSnapshot::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn delete(&self, id: SnapshotId) -> Result<bool, SnapshotError> {
        let mut snapshots = self.snapshots.write().await;
        let before = snapshots.len();
        snapshots.retain(|s| s.id != id);
        Ok(snapshots.len() != before)
    }
}

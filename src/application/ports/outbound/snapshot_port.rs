use async_trait::async_trait;

use crate::domain::entities::{SnapshotSummary, WorldSnapshot};
use crate::domain::value_objects::SnapshotId;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot not found: {0}")]
    NotFound(SnapshotId),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait SnapshotRepositoryPort: Send + Sync {
    async fn save(&self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError>;
    async fn load(&self, id: SnapshotId) -> Result<Option<WorldSnapshot>, SnapshotError>;
    /// Newest first
    async fn list(&self) -> Result<Vec<SnapshotSummary>, SnapshotError>;
    async fn delete(&self, id: SnapshotId) -> Result<bool, SnapshotError>;
}

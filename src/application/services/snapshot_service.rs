//! Snapshot manager - full backups of director-visible world state

use std::sync::Arc;

use chrono::Utc;

use crate::application::ports::outbound::{SnapshotError, SnapshotRepositoryPort, WorldModelPort};
use crate::application::services::chunk_tracker::ChunkTracker;
use crate::application::services::event_manager::EventManager;
use crate::domain::entities::{Proposal, SnapshotSummary, WorldSnapshot};
use crate::domain::value_objects::SnapshotId;

pub struct SnapshotService {
    repository: Arc<dyn SnapshotRepositoryPort>,
}

impl SnapshotService {
    pub fn new(repository: Arc<dyn SnapshotRepositoryPort>) -> Self {
        Self { repository }
    }

    pub async fn capture(
        &self,
        label: impl Into<String>,
        world: &dyn WorldModelPort,
        events: &EventManager,
        chunks: &ChunkTracker,
        pending_proposals: Vec<Proposal>,
    ) -> Result<WorldSnapshot, SnapshotError> {
        let snapshot = WorldSnapshot {
            id: SnapshotId::new(),
            label: label.into(),
            created_at: Utc::now(),
            entities: world.all_entities(),
            active_events: events.active_events().await,
            chunks: chunks.generated_chunks().await,
            pending_proposals,
        };
        self.repository.save(&snapshot).await?;

        tracing::info!(
            "Snapshot {} '{}' captured ({} entities, {} events)",
            snapshot.id,
            snapshot.label,
            snapshot.entities.len(),
            snapshot.active_events.len()
        );
        Ok(snapshot)
    }

    /// Put the world back to a snapshot; pending proposals are returned for the caller to swap in
    pub async fn restore(
        &self,
        id: SnapshotId,
        world: &dyn WorldModelPort,
        events: &EventManager,
        chunks: &ChunkTracker,
    ) -> Result<WorldSnapshot, SnapshotError> {
        let snapshot = self
            .repository
            .load(id)
            .await?
            .ok_or(SnapshotError::NotFound(id))?;

        for entity in world.all_entities() {
            if let Err(e) = world.remove_entity(entity.id) {
                tracing::warn!("Failed to remove entity {} during restore: {}", entity.id, e);
            }
        }
        let mut restored = 0;
        for entity in snapshot.entities.iter().cloned() {
            let entity_id = entity.id;
            match world.add_entity(entity) {
                Ok(_) => restored += 1,
                Err(e) => tracing::warn!("Failed to restore entity {}: {}", entity_id, e),
            }
        }

        events.replace_all(snapshot.active_events.clone()).await;
        chunks.restore(snapshot.chunks.clone()).await;

        tracing::info!(
            "Snapshot {} restored ({} of {} entities)",
            snapshot.id,
            restored,
            snapshot.entities.len()
        );
        Ok(snapshot)
    }

    pub async fn list(&self) -> Result<Vec<SnapshotSummary>, SnapshotError> {
        self.repository.list().await
    }

    pub async fn delete(&self, id: SnapshotId) -> Result<bool, SnapshotError> {
        self.repository.delete(id).await
    }
}

//! World snapshots taken before risky autonomous actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActiveEvent, Proposal, WorldEntity};
use crate::domain::value_objects::{ChunkCoord, SnapshotId};

/// Full copy of the director-visible world state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub id: SnapshotId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub entities: Vec<WorldEntity>,
    pub active_events: Vec<ActiveEvent>,
    pub chunks: Vec<ChunkCoord>,
    pub pending_proposals: Vec<Proposal>,
}

impl WorldSnapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            label: self.label.clone(),
            created_at: self.created_at,
            entity_count: self.entities.len(),
            event_count: self.active_events.len(),
            chunk_count: self.chunks.len(),
        }
    }
}

/// Listing entry without the heavy payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub entity_count: usize,
    pub event_count: usize,
    pub chunk_count: usize,
}

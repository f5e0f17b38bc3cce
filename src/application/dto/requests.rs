//! Request and status shapes for the control-panel surface

use serde::{Deserialize, Serialize};

use crate::application::services::generation::GenerationContext;
use crate::domain::entities::{Originator, WorldEventType};

/// Manual generation request; the kind comes from the route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    #[serde(default)]
    pub context: GenerationContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEventRequest {
    pub event_type: WorldEventType,
    /// Bypass the approval gate
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub originator: Option<Originator>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotRequest {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStatusDto {
    pub cx: i64,
    pub cy: i64,
    pub generated: bool,
    /// Ids of persisted locations inside the chunk bounds
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorStatusDto {
    pub paused: bool,
    pub pending_proposals: usize,
    pub active_events: usize,
    pub generated_chunks: usize,
    pub require_approval: bool,
    pub restricted_mode: bool,
}

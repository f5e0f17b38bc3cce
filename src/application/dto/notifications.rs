//! Push notifications sent to control-panel subscribers
//!
//! Every long-running command finishes with one of these on the director's
//! broadcast channel; the WebSocket adapter forwards them verbatim as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{ContentKind, Proposal, WorldEventType};
use crate::domain::value_objects::{ChunkCoord, EventId, ProposalId, SnapshotId};

/// Why an active event ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventEndReason {
    Expired,
    Stopped,
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DirectorNotification {
    /// A proposal is waiting for human review
    ProposalQueued { proposal: Box<Proposal> },
    ProposalPublished {
        proposal_id: ProposalId,
        kind: ContentKind,
        location: String,
    },
    ProposalRejected { proposal_id: ProposalId },
    ProposalFailed {
        proposal_id: ProposalId,
        error: String,
    },
    /// Approved proposal bounced back to draft with the validator's messages
    ValidationFailed {
        proposal_id: ProposalId,
        errors: Vec<String>,
    },
    GenerationFailed {
        kind: ContentKind,
        error: String,
    },
    EventStarted {
        event_id: EventId,
        event_type: WorldEventType,
        entity_count: usize,
        expires_at: DateTime<Utc>,
    },
    EventEnded {
        event_id: EventId,
        event_type: WorldEventType,
        reason: EventEndReason,
    },
    ChunkDeleted {
        chunk: ChunkCoord,
        removed_records: usize,
    },
    ContentUpdated { kind: ContentKind, id: String },
    ContentDeleted { kind: ContentKind, id: String },
    GuardrailsUpdated,
    PersonalityUpdated,
    EventConfigUpdated,
    Paused,
    Resumed,
    /// Chaos fired; downstream systems decide what to do with it
    ChaosSignal { roll: f64 },
    SnapshotCreated { snapshot_id: SnapshotId, label: String },
    SnapshotRestored { snapshot_id: SnapshotId },
}

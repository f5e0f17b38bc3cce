//! Domain entities - Core director objects with identity

mod active_event;
mod content;
mod proposal;
mod snapshot;
mod world_entity;

pub use active_event::{ActiveEvent, WorldEventType};
pub use content::{
    CharacterDefinition, Definition, ItemDefinition, LocationDefinition, QuestDefinition,
    QuestType, Rarity,
};
pub use proposal::{
    ContentKind, EventPayload, Originator, Proposal, ProposalError, ProposalPayload,
    ProposalStatus,
};
pub use snapshot::{SnapshotSummary, WorldSnapshot};
pub use world_entity::{
    CombatStats, EntityKind, WorldEntity, TAG_ACTOR, TAG_EVENT, TAG_HOSTILE, TAG_LOCATION,
    TAG_MERCHANT, TAG_QUEST,
};

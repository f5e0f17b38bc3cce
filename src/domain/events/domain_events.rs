//! Domain events - gameplay occurrences the director observes
//!
//! The world model reports these; the activity tracker turns them into
//! per-region interaction weight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// An actor moved to a new position
    ActorMoved {
        entity_id: EntityId,
        position: Position,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },

    /// Combat began between two entities
    CombatStarted {
        attacker: EntityId,
        defender: EntityId,
        position: Position,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn actor_moved(entity_id: EntityId, position: Position) -> Self {
        DomainEvent::ActorMoved {
            entity_id,
            position,
            at: Utc::now(),
        }
    }

    pub fn combat_started(attacker: EntityId, defender: EntityId, position: Position) -> Self {
        DomainEvent::CombatStarted {
            attacker,
            defender,
            position,
            at: Utc::now(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            DomainEvent::ActorMoved { position, .. } => *position,
            DomainEvent::CombatStarted { position, .. } => *position,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ActorMoved { at, .. } => *at,
            DomainEvent::CombatStarted { at, .. } => *at,
        }
    }
}

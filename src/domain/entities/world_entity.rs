//! World entities as the director sees them through the world-model port

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::content::Rarity;
use crate::domain::value_objects::{EntityId, Position};

/// Capability tags queried through the world port
pub const TAG_ACTOR: &str = "actor";
pub const TAG_HOSTILE: &str = "hostile";
pub const TAG_LOCATION: &str = "location";
pub const TAG_MERCHANT: &str = "merchant";
pub const TAG_EVENT: &str = "event";
pub const TAG_QUEST: &str = "quest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Actor,
    Npc,
    Mob,
    Boss,
    Item,
    Location,
    QuestMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub health: i64,
    pub attack: i64,
    pub defense: i64,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEntity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub position: Option<Position>,
    pub stats: Option<CombatStats>,
    pub value: Option<i64>,
    pub rarity: Option<Rarity>,
    #[serde(default)]
    pub stationary: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Entities this one carries or refers to (inventory, quest items)
    #[serde(default)]
    pub linked_entities: Vec<EntityId>,
    /// Registry definition the entity was instantiated from
    pub definition_id: Option<String>,
}

impl WorldEntity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        let mut tags = BTreeSet::new();
        match kind {
            EntityKind::Actor => {
                tags.insert(TAG_ACTOR.to_string());
            }
            EntityKind::Mob | EntityKind::Boss => {
                tags.insert(TAG_HOSTILE.to_string());
            }
            EntityKind::Location => {
                tags.insert(TAG_LOCATION.to_string());
            }
            EntityKind::QuestMarker => {
                tags.insert(TAG_QUEST.to_string());
            }
            EntityKind::Npc | EntityKind::Item => {}
        }

        Self {
            id: EntityId::new(),
            name: name.into(),
            description: String::new(),
            kind,
            tags,
            position: None,
            stats: None,
            value: None,
            rarity: None,
            stationary: false,
            hidden: false,
            linked_entities: Vec::new(),
            definition_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_stats(mut self, stats: CombatStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_value(mut self, value: i64, rarity: Rarity) -> Self {
        self.value = Some(value);
        self.rarity = Some(rarity);
        self
    }

    pub fn stationary(mut self) -> Self {
        self.stationary = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn linked_to(mut self, entity_id: EntityId) -> Self {
        self.linked_entities.push(entity_id);
        self
    }

    pub fn from_definition(mut self, definition_id: impl Into<String>) -> Self {
        self.definition_id = Some(definition_id.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

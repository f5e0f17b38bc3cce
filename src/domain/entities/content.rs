//! Content definitions - characters, items, quests and locations
//!
//! A definition is both the payload of a proposal and, once published, a registry
//! entry. Static content shipped with the world and generated content share these
//! shapes so the registries can merge them.

use serde::{Deserialize, Serialize};

use super::proposal::{ContentKind, ProposalPayload};

/// Common behaviour of definitions that live in a registry
pub trait Definition: Clone + Send + Sync + 'static {
    const KIND: ContentKind;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn aliases(&self) -> &[String];
    fn from_payload(payload: ProposalPayload) -> Option<Self>;
    fn into_payload(self) -> ProposalPayload;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub archetype: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub health: i64,
    pub attack: i64,
    pub defense: i64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub currency_drop: i64,
    #[serde(default)]
    pub hostile: bool,
    #[serde(default)]
    pub portrait_url: Option<String>,
}

fn default_level() -> u32 {
    1
}

/// Item rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Stat multiplier applied to archetype baselines
    pub fn multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.3,
            Rarity::Rare => 1.7,
            Rarity::Epic => 2.2,
            Rarity::Legendary => 3.0,
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub item_type: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub damage: i64,
    #[serde(default)]
    pub defense: i64,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub portrait_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    Fetch,
    Delivery,
    Collection,
    Slay,
    Explore,
}

impl std::fmt::Display for QuestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuestType::Fetch => "fetch",
            QuestType::Delivery => "delivery",
            QuestType::Collection => "collection",
            QuestType::Slay => "slay",
            QuestType::Explore => "explore",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub quest_type: QuestType,
    pub objective: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub reward_currency: i64,
    #[serde(default)]
    pub reward_item_id: Option<String>,
    #[serde(default)]
    pub giver_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub biome: String,
    /// World coordinates of the location anchor
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Ids of locations reachable from here
    #[serde(default)]
    pub connections: Vec<String>,
}

impl Definition for CharacterDefinition {
    const KIND: ContentKind = ContentKind::Character;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn from_payload(payload: ProposalPayload) -> Option<Self> {
        match payload {
            ProposalPayload::Character(def) => Some(def),
            _ => None,
        }
    }

    fn into_payload(self) -> ProposalPayload {
        ProposalPayload::Character(self)
    }
}

impl Definition for ItemDefinition {
    const KIND: ContentKind = ContentKind::Item;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn from_payload(payload: ProposalPayload) -> Option<Self> {
        match payload {
            ProposalPayload::Item(def) => Some(def),
            _ => None,
        }
    }

    fn into_payload(self) -> ProposalPayload {
        ProposalPayload::Item(self)
    }
}

impl Definition for LocationDefinition {
    const KIND: ContentKind = ContentKind::Location;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn from_payload(payload: ProposalPayload) -> Option<Self> {
        match payload {
            ProposalPayload::Location(def) => Some(def),
            _ => None,
        }
    }

    fn into_payload(self) -> ProposalPayload {
        ProposalPayload::Location(self)
    }
}

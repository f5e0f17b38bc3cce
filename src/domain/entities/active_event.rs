//! Active world events - time-bounded occurrences that own spawned entities

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, EventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEventType {
    Invasion,
    Boss,
    TravelingMerchant,
    TimedDelivery,
    TreasureHunt,
}

impl WorldEventType {
    pub const ALL: [WorldEventType; 5] = [
        WorldEventType::Invasion,
        WorldEventType::Boss,
        WorldEventType::TravelingMerchant,
        WorldEventType::TimedDelivery,
        WorldEventType::TreasureHunt,
    ];

    pub const HOSTILE: [WorldEventType; 2] = [WorldEventType::Invasion, WorldEventType::Boss];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorldEventType::Invasion => "invasion",
            WorldEventType::Boss => "boss",
            WorldEventType::TravelingMerchant => "traveling_merchant",
            WorldEventType::TimedDelivery => "timed_delivery",
            WorldEventType::TreasureHunt => "treasure_hunt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorldEventType::Invasion => "Invasion",
            WorldEventType::Boss => "Boss Encounter",
            WorldEventType::TravelingMerchant => "Traveling Merchant",
            WorldEventType::TimedDelivery => "Timed Delivery",
            WorldEventType::TreasureHunt => "Treasure Hunt",
        }
    }

    pub fn is_hostile(&self) -> bool {
        Self::HOSTILE.contains(self)
    }
}

impl std::fmt::Display for WorldEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorldEventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "invasion" => Ok(WorldEventType::Invasion),
            "boss" => Ok(WorldEventType::Boss),
            "traveling_merchant" | "merchant" => Ok(WorldEventType::TravelingMerchant),
            "timed_delivery" | "delivery" => Ok(WorldEventType::TimedDelivery),
            "treasure_hunt" | "treasure" => Ok(WorldEventType::TreasureHunt),
            _ => Err(anyhow::anyhow!("Invalid world event type: {}", s)),
        }
    }
}

/// A running world event and the entities it exclusively owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub id: EventId,
    pub event_type: WorldEventType,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub entity_ids: Vec<EntityId>,
}

impl ActiveEvent {
    pub fn new(
        event_type: WorldEventType,
        label: impl Into<String>,
        duration_secs: u64,
        entity_ids: Vec<EntityId>,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            label: label.into(),
            started_at: Utc::now(),
            duration_secs,
            entity_ids,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.duration_secs).unwrap_or(i64::MAX);
        self.started_at
            .checked_add_signed(Duration::seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Expired once the current time is strictly past start + duration
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_strict() {
        let mut event = ActiveEvent::new(WorldEventType::Invasion, "Raid", 60, vec![]);
        event.started_at = Utc::now() - Duration::seconds(120);
        assert!(event.is_expired(Utc::now()));

        let at_boundary = event.expires_at();
        assert!(!event.is_expired(at_boundary));
    }

    #[test]
    fn test_event_type_parsing() {
        assert_eq!(
            "traveling-merchant".parse::<WorldEventType>().unwrap(),
            WorldEventType::TravelingMerchant
        );
        assert!(WorldEventType::Boss.is_hostile());
        assert!(!WorldEventType::TreasureHunt.is_hostile());
    }
}

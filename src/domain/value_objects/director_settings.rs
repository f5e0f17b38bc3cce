//! Hot-configurable director settings: personality weights and event spawn tuning

use serde::{Deserialize, Serialize};

use crate::domain::entities::WorldEventType;

/// One personality trait: a weight multiplying a base probability, and its switch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityTrait {
    pub weight: f64,
    pub enabled: bool,
}

impl Default for PersonalityTrait {
    fn default() -> Self {
        Self {
            weight: 0.1,
            enabled: true,
        }
    }
}

impl PersonalityTrait {
    pub fn new(weight: f64, enabled: bool) -> Self {
        Self { weight, enabled }
    }

    /// Probability of firing this tick, or zero while disabled
    pub fn chance(&self, scalar: f64) -> f64 {
        if self.enabled {
            (self.weight * scalar).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Personality of the autonomous director
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    pub aggression: PersonalityTrait,
    pub expansion: PersonalityTrait,
    pub chaos: PersonalityTrait,
    pub intervention_enabled: bool,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            aggression: PersonalityTrait::new(0.1, true),
            expansion: PersonalityTrait::new(0.05, true),
            chaos: PersonalityTrait::new(0.02, true),
            intervention_enabled: true,
        }
    }
}

/// Per-type event switch and default time-to-live
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventTypeSettings {
    pub enabled: bool,
    pub duration_secs: u64,
}

impl EventTypeSettings {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            enabled: true,
            duration_secs,
        }
    }
}

/// Largest accepted scatter radius, in world units
pub const MAX_SPAWN_RADIUS: f64 = 512.0;
/// Largest accepted invasion party
pub const MAX_INVASION_SIZE: u32 = 32;
/// Largest accepted merchant inventory
pub const MAX_MERCHANT_INVENTORY: u32 = 16;

/// Tuning for world event spawns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSpawnConfig {
    pub invasion: EventTypeSettings,
    pub boss: EventTypeSettings,
    pub traveling_merchant: EventTypeSettings,
    pub timed_delivery: EventTypeSettings,
    pub treasure_hunt: EventTypeSettings,
    /// Number of hostile mobs in an invasion
    pub invasion_size: u32,
    /// Number of generated items a traveling merchant carries
    pub merchant_inventory_size: u32,
    /// Scatter radius around the anchor position, in world units
    pub spawn_radius: f64,
}

impl Default for EventSpawnConfig {
    fn default() -> Self {
        Self {
            invasion: EventTypeSettings::new(600),
            boss: EventTypeSettings::new(1800),
            traveling_merchant: EventTypeSettings::new(1200),
            timed_delivery: EventTypeSettings::new(900),
            treasure_hunt: EventTypeSettings::new(1800),
            invasion_size: 4,
            merchant_inventory_size: 3,
            spawn_radius: 8.0,
        }
    }
}

impl EventSpawnConfig {
    /// Every reason this config cannot be used for spawning
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.spawn_radius.is_finite() || !(0.0..=MAX_SPAWN_RADIUS).contains(&self.spawn_radius) {
            problems.push(format!(
                "spawn_radius must be between 0 and {}, got {}",
                MAX_SPAWN_RADIUS, self.spawn_radius
            ));
        }
        if self.invasion_size > MAX_INVASION_SIZE {
            problems.push(format!(
                "invasion_size must be at most {}, got {}",
                MAX_INVASION_SIZE, self.invasion_size
            ));
        }
        if self.merchant_inventory_size > MAX_MERCHANT_INVENTORY {
            problems.push(format!(
                "merchant_inventory_size must be at most {}, got {}",
                MAX_MERCHANT_INVENTORY, self.merchant_inventory_size
            ));
        }
        problems
    }

    pub fn settings(&self, event_type: WorldEventType) -> EventTypeSettings {
        match event_type {
            WorldEventType::Invasion => self.invasion,
            WorldEventType::Boss => self.boss,
            WorldEventType::TravelingMerchant => self.traveling_merchant,
            WorldEventType::TimedDelivery => self.timed_delivery,
            WorldEventType::TreasureHunt => self.treasure_hunt,
        }
    }
}

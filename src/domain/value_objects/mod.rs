//! Value objects - Immutable objects defined by their attributes

mod director_settings;
mod guardrails;
mod ids;
mod spatial;

pub use director_settings::{
    EventSpawnConfig, PersonalityConfig, PersonalityTrait, MAX_INVASION_SIZE,
    MAX_MERCHANT_INVENTORY,
};
pub use guardrails::{BudgetedStat, Budgets, GuardrailConfig, RoutingProfile};
pub use ids::*;
pub use spatial::{BucketCoord, ChunkCoord, Position};

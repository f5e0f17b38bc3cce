//! Domain layer - Core director logic with no I/O
//!
//! This layer contains:
//! - Entities: Proposal, content definitions, ActiveEvent, WorldEntity, WorldSnapshot
//! - Value Objects: ids, positions and chunks, guardrails, personality and event tuning
//! - Domain Events: gameplay occurrences fed to the activity tracker

pub mod entities;
pub mod events;
pub mod value_objects;

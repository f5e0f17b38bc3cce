//! Application services - the director and the services it orchestrates
//!
//! Each service takes its collaborators as ports so the same code runs against
//! SQLite and an HTTP backend in production and in-memory adapters in tests.

pub mod activity_tracker;
pub mod automation;
pub mod chunk_tracker;
pub mod director;
pub mod event_manager;
pub mod generation;
pub mod guardrail_service;
pub mod proposal_validator;
pub mod publisher;
pub mod registry;
pub mod snapshot_service;

pub use automation::AutomationLoop;
pub use director::{Director, DirectorDeps, DirectorError, TriggerOutcome};
pub use guardrail_service::GuardrailService;
pub use registry::StaticContent;

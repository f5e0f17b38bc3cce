//! Outbound ports - Interfaces that the director requires from external systems

mod content_store_port;
mod generation_port;
mod guardrail_port;
mod snapshot_port;
mod world_port;

pub use content_store_port::{
    ContentRecord, ContentStoreError, ContentStorePort, RecordLocation, RecordMetadata,
};
pub use generation_port::{
    BackendError, ChatResponse, GeneratedImage, GenerationBackendPort, GenerationRole, TokenUsage,
};
pub use guardrail_port::{GuardrailError, GuardrailRepositoryPort};
pub use snapshot_port::{SnapshotError, SnapshotRepositoryPort};
pub use world_port::{WorldError, WorldModelPort};

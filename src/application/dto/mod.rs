//! Data Transfer Objects - For API boundaries
//!
//! DTOs live in the application layer so infrastructure (HTTP/WebSocket) can
//! serialize them without reaching into service internals.

pub mod notifications;
pub mod requests;

pub use notifications::{DirectorNotification, EventEndReason};
pub use requests::{
    ChunkStatusDto, DirectorStatusDto, GenerateContentRequest, SnapshotRequest,
    TriggerEventRequest,
};

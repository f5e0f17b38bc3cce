//! Persistence adapters
//!
//! SQLite stores for published content and snapshots, the encrypted guardrail
//! file, static definitions on disk, and in-memory stand-ins.

mod content_store;
mod guardrail_file;
mod memory;
mod snapshot_repository;
mod static_content;

pub use content_store::SqliteContentStore;
pub use guardrail_file::FileGuardrailRepository;
pub use memory::{InMemoryContentStore, InMemorySnapshotRepository};
pub use snapshot_repository::SqliteSnapshotRepository;
pub use static_content::load_static_content;

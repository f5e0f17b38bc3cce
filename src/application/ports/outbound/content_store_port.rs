//! Content store port - permanent storage for published content records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{ContentKind, ProposalPayload};
use crate::domain::value_objects::ProposalId;

/// Provenance kept alongside every published record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub proposal_id: Option<ProposalId>,
    pub generated_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub seed: Option<u64>,
    pub flavor: Option<String>,
}

impl RecordMetadata {
    /// Metadata for a record edited directly by an operator
    pub fn manual() -> Self {
        let now = Utc::now();
        Self {
            proposal_id: None,
            generated_at: now,
            published_at: now,
            seed: None,
            flavor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub kind: ContentKind,
    pub id: String,
    pub payload: ProposalPayload,
    pub metadata: RecordMetadata,
}

impl ContentRecord {
    pub fn location(&self) -> RecordLocation {
        RecordLocation {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// Address of a record, displayed as `<kind>/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordLocation {
    pub kind: ContentKind,
    pub id: String,
}

impl std::fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait ContentStorePort: Send + Sync {
    /// Insert or replace the record at its `(kind, id)` address
    async fn write_record(&self, record: &ContentRecord) -> Result<RecordLocation, ContentStoreError>;

    async fn read_record(
        &self,
        kind: ContentKind,
        id: &str,
    ) -> Result<Option<ContentRecord>, ContentStoreError>;

    async fn list_records(&self, kind: ContentKind) -> Result<Vec<ContentRecord>, ContentStoreError>;

    /// Returns whether a record was removed
    async fn delete_record(&self, kind: ContentKind, id: &str) -> Result<bool, ContentStoreError>;
}

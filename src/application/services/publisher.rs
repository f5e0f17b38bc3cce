//! Publisher - turns approved proposals into permanent content records

use std::sync::Arc;

use chrono::Utc;

use crate::application::ports::outbound::{
    ContentRecord, ContentStoreError, ContentStorePort, RecordLocation, RecordMetadata,
};
use crate::domain::entities::{ContentKind, Proposal, ProposalError, ProposalStatus};
use crate::domain::value_objects::ProposalId;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Proposal {id} is {status}, only approved proposals can be published")]
    WorkflowState { id: ProposalId, status: ProposalStatus },
    #[error("{0} proposals are applied to the world, not published")]
    NotPublishable(ContentKind),
    #[error("Failed to persist record: {0}")]
    Persistence(#[from] ContentStoreError),
    #[error(transparent)]
    Transition(#[from] ProposalError),
}

pub struct Publisher {
    store: Arc<dyn ContentStorePort>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ContentStorePort>) -> Self {
        Self { store }
    }

    /// Write the proposal's payload as a record and mark it published
    ///
    /// Nothing is written unless the proposal is approved. On a store failure the
    /// proposal stays approved.
    pub async fn publish(&self, proposal: &mut Proposal) -> Result<RecordLocation, PublishError> {
        if proposal.status != ProposalStatus::Approved {
            return Err(PublishError::WorkflowState {
                id: proposal.id,
                status: proposal.status,
            });
        }
        let kind = proposal.kind();
        if kind == ContentKind::Event {
            return Err(PublishError::NotPublishable(kind));
        }

        let record = ContentRecord {
            kind,
            id: proposal.payload.content_id(),
            payload: proposal.payload.clone(),
            metadata: RecordMetadata {
                proposal_id: Some(proposal.id),
                generated_at: proposal.created_at,
                published_at: Utc::now(),
                seed: Some(proposal.seed),
                flavor: proposal.flavor.clone(),
            },
        };

        let location = self.store.write_record(&record).await?;
        proposal.mark_published()?;

        tracing::info!("Published proposal {} as {}", proposal.id, location);
        Ok(location)
    }
}

//! Proposal entity - a draft unit of generated content awaiting approval
//!
//! The payload is a tagged union keyed by [`ContentKind`]; the kind of a proposal
//! is always read off its payload variant so the two cannot disagree. Status
//! changes go through the transition methods, which reject illegal moves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::active_event::WorldEventType;
use super::content::{CharacterDefinition, ItemDefinition, LocationDefinition, QuestDefinition};
use crate::domain::value_objects::{Position, ProposalId};

/// Kind of content a proposal carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Character,
    Item,
    Quest,
    Location,
    Event,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Character => "character",
            ContentKind::Item => "item",
            ContentKind::Quest => "quest",
            ContentKind::Location => "location",
            ContentKind::Event => "event",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "character" | "npc" => Ok(ContentKind::Character),
            "item" => Ok(ContentKind::Item),
            "quest" => Ok(ContentKind::Quest),
            "location" => Ok(ContentKind::Location),
            "event" => Ok(ContentKind::Event),
            _ => Err(anyhow::anyhow!("Invalid content kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Approved,
    Rejected,
    Published,
    Failed,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Published => "published",
            ProposalStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Who asked for the proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Originator {
    Automation,
    #[default]
    Manual,
    Event,
}

/// A world event held back by the approval gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event_type: WorldEventType,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub note: Option<String>,
    /// Where to center the spawn; chosen at spawn time when absent
    #[serde(default)]
    pub anchor: Option<Position>,
}

/// Kind-specific proposal content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ProposalPayload {
    Character(CharacterDefinition),
    Item(ItemDefinition),
    Quest(QuestDefinition),
    Location(LocationDefinition),
    Event(EventPayload),
}

impl ProposalPayload {
    pub fn kind(&self) -> ContentKind {
        match self {
            ProposalPayload::Character(_) => ContentKind::Character,
            ProposalPayload::Item(_) => ContentKind::Item,
            ProposalPayload::Quest(_) => ContentKind::Quest,
            ProposalPayload::Location(_) => ContentKind::Location,
            ProposalPayload::Event(_) => ContentKind::Event,
        }
    }

    /// Identifier of the content this payload would publish
    pub fn content_id(&self) -> String {
        match self {
            ProposalPayload::Character(def) => def.id.clone(),
            ProposalPayload::Item(def) => def.id.clone(),
            ProposalPayload::Quest(def) => def.id.clone(),
            ProposalPayload::Location(def) => def.id.clone(),
            ProposalPayload::Event(payload) => payload.event_type.as_str().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProposalPayload::Character(def) => &def.name,
            ProposalPayload::Item(def) => &def.name,
            ProposalPayload::Quest(def) => &def.name,
            ProposalPayload::Location(def) => &def.name,
            ProposalPayload::Event(payload) => payload.event_type.label(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ProposalPayload::Character(def) => &def.description,
            ProposalPayload::Item(def) => &def.description,
            ProposalPayload::Quest(def) => &def.description,
            ProposalPayload::Location(def) => &def.description,
            ProposalPayload::Event(payload) => payload.note.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProposalError {
    #[error("Proposal {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: ProposalId,
        from: ProposalStatus,
        to: ProposalStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub status: ProposalStatus,
    pub payload: ProposalPayload,
    /// Seed that reproduces the deterministic parts of generation
    pub seed: u64,
    pub originator: Originator,
    pub created_at: DateTime<Utc>,
    /// Rationale or lore accompanying the content
    pub flavor: Option<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    pub score: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Proposal {
    pub fn new(payload: ProposalPayload, seed: u64, originator: Originator) -> Self {
        Self {
            id: ProposalId::new(),
            status: ProposalStatus::Draft,
            payload,
            seed,
            originator,
            created_at: Utc::now(),
            flavor: None,
            validation_errors: Vec::new(),
            score: None,
            tags: Vec::new(),
        }
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        let flavor = flavor.into();
        if !flavor.trim().is_empty() {
            self.flavor = Some(flavor);
        }
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, ProposalStatus::Draft | ProposalStatus::Approved)
    }

    fn transition(
        &mut self,
        allowed_from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<(), ProposalError> {
        if !allowed_from.contains(&self.status) {
            return Err(ProposalError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn approve(&mut self) -> Result<(), ProposalError> {
        self.transition(&[ProposalStatus::Draft], ProposalStatus::Approved)?;
        self.validation_errors.clear();
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), ProposalError> {
        self.transition(
            &[ProposalStatus::Draft, ProposalStatus::Approved],
            ProposalStatus::Rejected,
        )
    }

    /// One-way: only an approved proposal can be published
    pub fn mark_published(&mut self) -> Result<(), ProposalError> {
        self.transition(&[ProposalStatus::Approved], ProposalStatus::Published)
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), ProposalError> {
        self.transition(
            &[ProposalStatus::Draft, ProposalStatus::Approved],
            ProposalStatus::Failed,
        )?;
        self.validation_errors.push(reason.into());
        Ok(())
    }

    /// Send an approved proposal back for correction with the validator's messages
    pub fn return_to_draft(&mut self, errors: Vec<String>) -> Result<(), ProposalError> {
        self.transition(&[ProposalStatus::Approved], ProposalStatus::Draft)?;
        self.validation_errors = errors;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest_payload() -> ProposalPayload {
        ProposalPayload::Quest(QuestDefinition {
            id: "quest_test".to_string(),
            name: "Lost Ledger".to_string(),
            description: "Recover the ledger".to_string(),
            quest_type: super::super::content::QuestType::Fetch,
            objective: "Find the ledger".to_string(),
            target: None,
            reward_currency: 20,
            reward_item_id: None,
            giver_id: None,
        })
    }

    #[test]
    fn test_kind_follows_payload() {
        let proposal = Proposal::new(quest_payload(), 7, Originator::Manual);
        assert_eq!(proposal.kind(), ContentKind::Quest);
        assert_eq!(proposal.status, ProposalStatus::Draft);
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(quest_payload()).unwrap();
        assert_eq!(json["kind"], "quest");
        assert_eq!(json["data"]["name"], "Lost Ledger");
    }

    #[test]
    fn test_publish_only_from_approved() {
        let mut proposal = Proposal::new(quest_payload(), 7, Originator::Manual);
        assert!(proposal.mark_published().is_err());

        proposal.approve().unwrap();
        proposal.mark_published().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Published);

        // Published is terminal
        assert!(proposal.mark_published().is_err());
        assert!(proposal.reject().is_err());
    }

    #[test]
    fn test_return_to_draft_keeps_errors() {
        let mut proposal = Proposal::new(quest_payload(), 7, Originator::Automation);
        proposal.approve().unwrap();
        proposal
            .return_to_draft(vec!["Quest reward 900 exceeds budget 500".to_string()])
            .unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        assert_eq!(proposal.validation_errors.len(), 1);
    }

    #[test]
    fn test_content_kind_from_str() {
        assert_eq!("NPC".parse::<ContentKind>().unwrap(), ContentKind::Character);
        assert!("dragon".parse::<ContentKind>().is_err());
    }
}

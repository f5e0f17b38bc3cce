//! Location generator
//!
//! Locations sit on an integer grid; the coordinates come from the request and
//! are never changed by a pass. Only the creative pass applies to locations.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::archetypes::{self, BIOMES};
use super::{
    draft_summary, merge_text, pass_report, prompts, request_structured, skipped,
    ContentGenerator, CreativeFields, GenerationContext, GenerationOutcome, PassError, PassKind,
    NO_BACKEND,
};
use crate::application::ports::outbound::{GenerationBackendPort, GenerationRole};
use crate::domain::entities::{ContentKind, LocationDefinition, Proposal, ProposalPayload};
use crate::domain::value_objects::{content_id, GuardrailConfig};

pub struct LocationGenerator;

impl LocationGenerator {
    pub fn fallback(seed: u64, context: &GenerationContext) -> (LocationDefinition, String) {
        let mut rng = StdRng::seed_from_u64(seed);
        let target = context.location.clone().unwrap_or_default();
        let biome = archetypes::pick(&mut rng, BIOMES);
        let name = context
            .hint_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{} {}",
                    archetypes::pick(&mut rng, biome.adjectives),
                    archetypes::pick(&mut rng, biome.nouns)
                )
            });

        let mut description = biome.description.to_string();
        if let Some(neighbor) = target.neighbor_name.as_deref() {
            description.push_str(&format!(" The road from {} runs through it.", neighbor));
        }

        let definition = LocationDefinition {
            id: content_id("loc"),
            name,
            description,
            biome: biome.key.to_string(),
            x: target.x,
            y: target.y,
            aliases: Vec::new(),
            connections: target.neighbor_id.into_iter().collect(),
        };
        let flavor = format!("Newly charted {} at ({}, {}).", biome.key, target.x, target.y);
        (definition, flavor)
    }

    async fn creative_pass(
        backend: &dyn GenerationBackendPort,
        guardrails: &GuardrailConfig,
        context: &GenerationContext,
        definition: &mut LocationDefinition,
        flavor: &mut String,
    ) -> Result<Vec<String>, PassError> {
        let prompt = prompts::creative_prompt(
            ContentKind::Location,
            &draft_summary(definition),
            context.theme.as_deref(),
            &guardrails.banned_terms,
        );
        let fields: CreativeFields = request_structured(
            backend,
            GenerationRole::Creative,
            prompts::CREATIVE_SYSTEM,
            &prompt,
        )
        .await?;

        let mut applied = Vec::new();
        if context.hint_name.is_none() {
            merge_text(&mut definition.name, fields.name, "name", guardrails, &mut applied);
        }
        merge_text(
            &mut definition.description,
            fields.description,
            "description",
            guardrails,
            &mut applied,
        );
        merge_text(
            &mut definition.biome,
            fields.biome.map(|b| b.to_lowercase()),
            "biome",
            guardrails,
            &mut applied,
        );
        merge_text(flavor, fields.flavor, "flavor", guardrails, &mut applied);
        Ok(applied)
    }
}

#[async_trait]
impl ContentGenerator for LocationGenerator {
    fn kind(&self) -> ContentKind {
        ContentKind::Location
    }

    async fn generate(
        &self,
        guardrails: &GuardrailConfig,
        backend: Option<&dyn GenerationBackendPort>,
        context: &GenerationContext,
    ) -> GenerationOutcome {
        let seed = context.resolve_seed();
        let (mut definition, mut flavor) = Self::fallback(seed, context);

        let passes = match backend {
            None => skipped(&[PassKind::Creative], NO_BACKEND),
            Some(backend) => {
                let result =
                    Self::creative_pass(backend, guardrails, context, &mut definition, &mut flavor)
                        .await;
                vec![pass_report(self.kind(), PassKind::Creative, result)]
            }
        };

        let proposal = Proposal::new(
            ProposalPayload::Location(definition),
            seed,
            context.originator,
        )
        .with_flavor(flavor);

        GenerationOutcome::new(proposal, passes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::MockBackend;
    use super::super::LocationContext;
    use super::*;

    fn location(outcome: &GenerationOutcome) -> &LocationDefinition {
        match &outcome.proposal.payload {
            ProposalPayload::Location(def) => def,
            other => panic!("expected location payload, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_coordinates_and_neighbor_come_from_context() {
        let guardrails = GuardrailConfig::default();
        let context = GenerationContext::default()
            .with_seed(21)
            .with_location(LocationContext {
                x: 3,
                y: -2,
                neighbor_id: Some("loc_town".to_string()),
                neighbor_name: Some("Millbrook".to_string()),
            });
        let outcome = LocationGenerator.generate(&guardrails, None, &context).await;
        let def = location(&outcome);

        assert_eq!((def.x, def.y), (3, -2));
        assert_eq!(def.connections, vec!["loc_town".to_string()]);
        assert!(def.description.contains("Millbrook"));
    }

    #[tokio::test]
    async fn test_banned_name_from_backend_is_discarded() {
        let guardrails = GuardrailConfig::default();
        let backend = MockBackend::default().reply(
            GenerationRole::Creative,
            r#"<think>pick a name</think>{"name": "Lorem Ipsum Vale", "description": "A green vale under the cliffs."}"#,
        );
        let context = GenerationContext::default().with_seed(21);
        let fallback = LocationGenerator.generate(&guardrails, None, &context).await;
        let outcome = LocationGenerator
            .generate(&guardrails, Some(&backend), &context)
            .await;

        assert_eq!(location(&outcome).name, location(&fallback).name);
        assert_eq!(location(&outcome).description, "A green vale under the cliffs.");
    }
}

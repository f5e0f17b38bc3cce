//! Item generator

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::archetypes::{self, ITEM_ARCHETYPES};
use super::{
    apply_stat, clamp_stat, draft_summary, merge_text, pass_report, portrait_pass, prompts,
    request_structured, skipped, ContentGenerator, CreativeFields, GenerationContext,
    GenerationOutcome, PassError, PassKind, StatFields, NO_BACKEND,
};
use crate::application::ports::outbound::{GenerationBackendPort, GenerationRole};
use crate::domain::entities::{ContentKind, ItemDefinition, Proposal, ProposalPayload};
use crate::domain::value_objects::{content_id, BudgetedStat, Budgets, GuardrailConfig};

pub struct ItemGenerator;

impl ItemGenerator {
    pub fn fallback(
        seed: u64,
        context: &GenerationContext,
        budgets: &Budgets,
    ) -> (ItemDefinition, String) {
        let mut rng = StdRng::seed_from_u64(seed);
        let archetype = context
            .archetype
            .as_deref()
            .and_then(archetypes::item_archetype)
            .unwrap_or_else(|| archetypes::pick(&mut rng, &ITEM_ARCHETYPES[..4]));
        let rarity = context
            .rarity
            .unwrap_or_else(|| archetypes::roll_rarity(&mut rng));
        let name = context
            .hint_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| archetypes::pick(&mut rng, archetype.names).to_string());
        let scaled = |base: i64| (base as f64 * rarity.multiplier()).round() as i64;

        let damage = if archetype.damage > 0 {
            clamp_stat(None, BudgetedStat::Damage, budgets, scaled(archetype.damage))
        } else {
            0
        };
        let definition = ItemDefinition {
            id: content_id("item"),
            name,
            description: archetype.description.to_string(),
            item_type: archetype.item_type.to_string(),
            rarity,
            damage,
            defense: clamp_stat(None, BudgetedStat::Defense, budgets, scaled(archetype.defense)),
            value: clamp_stat(None, BudgetedStat::ItemValue, budgets, scaled(archetype.value)),
            aliases: Vec::new(),
            portrait_url: None,
        };
        let flavor = format!("A {} {} of the kind traders carry.", rarity, archetype.key);
        (definition, flavor)
    }

    async fn creative_pass(
        backend: &dyn GenerationBackendPort,
        guardrails: &GuardrailConfig,
        context: &GenerationContext,
        definition: &mut ItemDefinition,
        flavor: &mut String,
    ) -> Result<Vec<String>, PassError> {
        let prompt = prompts::creative_prompt(
            ContentKind::Item,
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
        merge_text(flavor, fields.flavor, "flavor", guardrails, &mut applied);
        Ok(applied)
    }

    async fn logic_pass(
        backend: &dyn GenerationBackendPort,
        budgets: &Budgets,
        definition: &mut ItemDefinition,
    ) -> Result<Vec<String>, PassError> {
        // Zero damage marks a non-weapon; the damage floor would turn it into one
        let armed = definition.damage > 0;
        let mut bounds = Vec::with_capacity(3);
        if armed {
            bounds.push(("damage", BudgetedStat::Damage.floor(), budgets.max_damage));
        }
        bounds.push(("defense", BudgetedStat::Defense.floor(), budgets.max_defense));
        bounds.push(("value", BudgetedStat::ItemValue.floor(), budgets.max_item_value));
        let prompt = prompts::logic_prompt(ContentKind::Item, &draft_summary(definition), &bounds);
        let stats: StatFields =
            request_structured(backend, GenerationRole::Logic, prompts::LOGIC_SYSTEM, &prompt)
                .await?;

        let mut applied = Vec::new();
        if armed {
            apply_stat(&mut definition.damage, &stats, "damage", BudgetedStat::Damage, budgets, &mut applied);
        }
        apply_stat(&mut definition.defense, &stats, "defense", BudgetedStat::Defense, budgets, &mut applied);
        apply_stat(&mut definition.value, &stats, "value", BudgetedStat::ItemValue, budgets, &mut applied);
        Ok(applied)
    }
}

#[async_trait]
impl ContentGenerator for ItemGenerator {
    fn kind(&self) -> ContentKind {
        ContentKind::Item
    }

    async fn generate(
        &self,
        guardrails: &GuardrailConfig,
        backend: Option<&dyn GenerationBackendPort>,
        context: &GenerationContext,
    ) -> GenerationOutcome {
        let seed = context.resolve_seed();
        let budgets = guardrails.effective_budgets();
        let (mut definition, mut flavor) = Self::fallback(seed, context, &budgets);

        let passes = match backend {
            None => skipped(&[PassKind::Creative, PassKind::Logic, PassKind::Portrait], NO_BACKEND),
            Some(backend) => {
                let mut passes = Vec::with_capacity(3);

                let result =
                    Self::creative_pass(backend, guardrails, context, &mut definition, &mut flavor)
                        .await;
                passes.push(pass_report(self.kind(), PassKind::Creative, result));

                let result = Self::logic_pass(backend, &budgets, &mut definition).await;
                passes.push(pass_report(self.kind(), PassKind::Logic, result));

                let result = portrait_pass(backend, &definition.name, &definition.description)
                    .await
                    .map(|url| {
                        definition.portrait_url = Some(url);
                        vec!["portrait_url".to_string()]
                    });
                passes.push(pass_report(self.kind(), PassKind::Portrait, result));

                passes
            }
        };

        let proposal = Proposal::new(ProposalPayload::Item(definition), seed, context.originator)
            .with_flavor(flavor);

        GenerationOutcome::new(proposal, passes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::MockBackend;
    use super::*;
    use crate::domain::entities::Rarity;

    fn item(outcome: &GenerationOutcome) -> &ItemDefinition {
        match &outcome.proposal.payload {
            ProposalPayload::Item(def) => def,
            other => panic!("expected item payload, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_rarity_hint_is_honoured() {
        let guardrails = GuardrailConfig::default();
        let context = GenerationContext::default()
            .with_seed(1)
            .with_rarity(Rarity::Legendary)
            .with_archetype("blade");
        let outcome = ItemGenerator.generate(&guardrails, None, &context).await;
        let def = item(&outcome);
        assert_eq!(def.rarity, Rarity::Legendary);
        assert_eq!(def.item_type, "weapon");
        assert!(def.damage >= 1 && def.damage <= guardrails.budgets.max_damage);
    }

    #[tokio::test]
    async fn test_restricted_mode_lowers_clamp_ceiling() {
        let mut guardrails = GuardrailConfig::default();
        guardrails.features.restricted_mode = true;
        let backend = MockBackend::default()
            .reply(GenerationRole::Creative, "{}")
            .reply(GenerationRole::Logic, r#"{"damage": 45, "value": 999999}"#);
        let context = GenerationContext::default().with_seed(2).with_archetype("blade");
        let outcome = ItemGenerator.generate(&guardrails, Some(&backend), &context).await;

        let def = item(&outcome);
        assert_eq!(def.damage, guardrails.budgets.max_damage / 2);
        assert_eq!(def.value, guardrails.budgets.max_item_value / 2);
    }

    #[tokio::test]
    async fn test_logic_pass_keeps_non_weapon_harmless() {
        let guardrails = GuardrailConfig::default();
        let backend = MockBackend::default()
            .reply(GenerationRole::Creative, "{}")
            .reply(GenerationRole::Logic, r#"{"damage": 0, "defense": 12, "value": 30}"#);
        let context = GenerationContext::default().with_seed(3).with_archetype("armor");
        let outcome = ItemGenerator.generate(&guardrails, Some(&backend), &context).await;

        let def = item(&outcome);
        assert_eq!(def.damage, 0);
        assert_eq!(def.defense, 12);
        assert_eq!(def.value, 30);
    }

    #[tokio::test]
    async fn test_unparseable_logic_response_is_a_failed_pass() {
        let guardrails = GuardrailConfig::default();
        let backend = MockBackend::default()
            .reply(GenerationRole::Creative, r#"{"name": "Dawnpiercer"}"#)
            .reply(GenerationRole::Logic, "Damage should be about twelve.");
        let context = GenerationContext::default().with_seed(4);
        let fallback = ItemGenerator.generate(&guardrails, None, &context).await;
        let outcome = ItemGenerator.generate(&guardrails, Some(&backend), &context).await;

        assert_eq!(item(&outcome).name, "Dawnpiercer");
        assert_eq!(item(&outcome).damage, item(&fallback).damage);
        assert_eq!(outcome.failed_passes().count(), 2);
    }
}

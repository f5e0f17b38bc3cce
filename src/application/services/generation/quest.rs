//! Quest generator
//!
//! Event spawns pass a [`super::QuestContext`] to request a specific quest type,
//! target and giver; manual requests usually leave it empty.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::archetypes::{self, QUEST_TEMPLATES};
use super::{
    apply_stat, clamp_stat, draft_summary, merge_text, pass_report, prompts, request_structured,
    skipped, ContentGenerator, CreativeFields, GenerationContext, GenerationOutcome, PassError,
    PassKind, StatFields, NO_BACKEND,
};
use crate::application::ports::outbound::{GenerationBackendPort, GenerationRole};
use crate::domain::entities::{ContentKind, Proposal, ProposalPayload, QuestDefinition};
use crate::domain::value_objects::{content_id, BudgetedStat, Budgets, GuardrailConfig};

pub struct QuestGenerator;

impl QuestGenerator {
    pub fn fallback(
        seed: u64,
        context: &GenerationContext,
        budgets: &Budgets,
    ) -> (QuestDefinition, String) {
        let mut rng = StdRng::seed_from_u64(seed);
        let quest_context = context.quest.clone().unwrap_or_default();
        let template = match quest_context.quest_type {
            Some(quest_type) => archetypes::quest_template(quest_type),
            None => archetypes::pick(&mut rng, QUEST_TEMPLATES),
        };
        let target = quest_context
            .target
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| template.default_target.to_string());
        let name = context
            .hint_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| archetypes::pick(&mut rng, template.names).to_string());
        let reward = template.base_reward + rng.gen_range(0..=template.base_reward / 2);

        let definition = QuestDefinition {
            id: content_id("quest"),
            name,
            description: format!("Word is spreading: {}", template.objective.replace("{target}", &target)),
            quest_type: template.quest_type,
            objective: template.objective.replace("{target}", &target),
            target: Some(target),
            reward_currency: clamp_stat(None, BudgetedStat::QuestReward, budgets, reward),
            reward_item_id: quest_context.reward_item_id,
            giver_id: quest_context.giver_id,
        };
        let flavor = format!("A {} quest for anyone willing to take it.", template.quest_type);
        (definition, flavor)
    }

    async fn creative_pass(
        backend: &dyn GenerationBackendPort,
        guardrails: &GuardrailConfig,
        context: &GenerationContext,
        definition: &mut QuestDefinition,
        flavor: &mut String,
    ) -> Result<Vec<String>, PassError> {
        let prompt = prompts::creative_prompt(
            ContentKind::Quest,
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
            &mut definition.objective,
            fields.objective,
            "objective",
            guardrails,
            &mut applied,
        );
        merge_text(flavor, fields.flavor, "flavor", guardrails, &mut applied);
        Ok(applied)
    }

    async fn logic_pass(
        backend: &dyn GenerationBackendPort,
        budgets: &Budgets,
        definition: &mut QuestDefinition,
    ) -> Result<Vec<String>, PassError> {
        let bounds = [(
            "reward_currency",
            BudgetedStat::QuestReward.floor(),
            budgets.max_quest_reward,
        )];
        let prompt = prompts::logic_prompt(ContentKind::Quest, &draft_summary(definition), &bounds);
        let stats: StatFields =
            request_structured(backend, GenerationRole::Logic, prompts::LOGIC_SYSTEM, &prompt)
                .await?;

        let mut applied = Vec::new();
        apply_stat(
            &mut definition.reward_currency,
            &stats,
            "reward_currency",
            BudgetedStat::QuestReward,
            budgets,
            &mut applied,
        );
        Ok(applied)
    }
}

#[async_trait]
impl ContentGenerator for QuestGenerator {
    fn kind(&self) -> ContentKind {
        ContentKind::Quest
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

        // Quests have no portrait
        let passes = match backend {
            None => skipped(&[PassKind::Creative, PassKind::Logic], NO_BACKEND),
            Some(backend) => {
                let mut passes = Vec::with_capacity(2);

                let result =
                    Self::creative_pass(backend, guardrails, context, &mut definition, &mut flavor)
                        .await;
                passes.push(pass_report(self.kind(), PassKind::Creative, result));

                let result = Self::logic_pass(backend, &budgets, &mut definition).await;
                passes.push(pass_report(self.kind(), PassKind::Logic, result));

                passes
            }
        };

        let proposal = Proposal::new(ProposalPayload::Quest(definition), seed, context.originator)
            .with_flavor(flavor);

        GenerationOutcome::new(proposal, passes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::MockBackend;
    use super::super::QuestContext;
    use super::*;
    use crate::domain::entities::QuestType;

    fn quest(outcome: &GenerationOutcome) -> &QuestDefinition {
        match &outcome.proposal.payload {
            ProposalPayload::Quest(def) => def,
            other => panic!("expected quest payload, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_delivery_context_is_respected() {
        let guardrails = GuardrailConfig::default();
        let context = GenerationContext::default().with_seed(8).with_quest(QuestContext {
            quest_type: Some(QuestType::Delivery),
            target: Some("Sealed Parcel".to_string()),
            giver_id: Some("char_courier".to_string()),
            reward_item_id: Some("item_parcel".to_string()),
        });
        let outcome = QuestGenerator.generate(&guardrails, None, &context).await;
        let def = quest(&outcome);

        assert_eq!(def.quest_type, QuestType::Delivery);
        assert!(def.objective.contains("Sealed Parcel"));
        assert_eq!(def.giver_id.as_deref(), Some("char_courier"));
        assert_eq!(def.reward_item_id.as_deref(), Some("item_parcel"));
        assert_eq!(outcome.passes.len(), 2);
    }

    #[tokio::test]
    async fn test_reward_clamped_to_budget() {
        let guardrails = GuardrailConfig::default();
        let backend = MockBackend::default()
            .reply(
                GenerationRole::Creative,
                r#"```json
{"objective": "Slay the wyrm of Fenmoor."}
```"#,
            )
            .reply(GenerationRole::Logic, r#"{"reward_currency": 1e9}"#);
        let context = GenerationContext::default().with_seed(8);
        let outcome = QuestGenerator.generate(&guardrails, Some(&backend), &context).await;

        let def = quest(&outcome);
        assert_eq!(def.objective, "Slay the wyrm of Fenmoor.");
        assert_eq!(def.reward_currency, guardrails.budgets.max_quest_reward);
        assert_eq!(outcome.failed_passes().count(), 0);
    }
}

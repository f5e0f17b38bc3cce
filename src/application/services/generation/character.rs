//! Character generator

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::archetypes::{self, CharacterArchetype, CHARACTER_ARCHETYPES};
use super::{
    apply_stat, clamp_level, clamp_stat, draft_summary, merge_text, pass_report, portrait_pass,
    prompts, request_structured, skipped, ContentGenerator, CreativeFields, GenerationContext,
    GenerationOutcome, PassError, PassKind, StatFields, NO_BACKEND,
};
use crate::application::ports::outbound::{GenerationBackendPort, GenerationRole};
use crate::domain::entities::{CharacterDefinition, ContentKind, Proposal, ProposalPayload};
use crate::domain::value_objects::{content_id, BudgetedStat, Budgets, GuardrailConfig};

pub struct CharacterGenerator;

impl CharacterGenerator {
    fn choose_archetype(rng: &mut StdRng, context: &GenerationContext) -> &'static CharacterArchetype {
        if let Some(found) = context
            .archetype
            .as_deref()
            .and_then(archetypes::character_archetype)
        {
            return found;
        }
        match context.hostile {
            Some(hostile) => {
                let matching: Vec<&CharacterArchetype> = CHARACTER_ARCHETYPES
                    .iter()
                    .filter(|a| a.hostile == hostile)
                    .collect();
                if matching.is_empty() {
                    archetypes::pick(rng, CHARACTER_ARCHETYPES)
                } else {
                    *archetypes::pick(rng, &matching)
                }
            }
            None => archetypes::pick(rng, CHARACTER_ARCHETYPES),
        }
    }

    /// Seeded definition built only from curated archetypes
    pub fn fallback(
        seed: u64,
        context: &GenerationContext,
        budgets: &Budgets,
    ) -> (CharacterDefinition, String) {
        let mut rng = StdRng::seed_from_u64(seed);
        let archetype = Self::choose_archetype(&mut rng, context);
        let name = context
            .hint_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| archetypes::pick(&mut rng, archetype.names).to_string());
        let level: u32 = rng.gen_range(1..=5);
        let scale = 1.0 + 0.15 * (level - 1) as f64;
        let scaled = |base: i64| (base as f64 * scale).round() as i64;

        let definition = CharacterDefinition {
            id: content_id("char"),
            name,
            description: archetype.description.to_string(),
            archetype: archetype.key.to_string(),
            aliases: Vec::new(),
            health: clamp_stat(None, BudgetedStat::CharacterHealth, budgets, scaled(archetype.health)),
            attack: clamp_stat(None, BudgetedStat::CharacterAttack, budgets, scaled(archetype.attack)),
            defense: clamp_stat(None, BudgetedStat::CharacterDefense, budgets, scaled(archetype.defense)),
            level,
            currency_drop: clamp_stat(
                None,
                BudgetedStat::CurrencyDrop,
                budgets,
                scaled(archetype.currency_drop),
            ),
            hostile: archetype.hostile,
            portrait_url: None,
        };
        let flavor = format!("A {} drawn from the world's usual cast.", archetype.key);
        (definition, flavor)
    }

    async fn creative_pass(
        backend: &dyn GenerationBackendPort,
        guardrails: &GuardrailConfig,
        context: &GenerationContext,
        definition: &mut CharacterDefinition,
        flavor: &mut String,
    ) -> Result<Vec<String>, PassError> {
        let prompt = prompts::creative_prompt(
            ContentKind::Character,
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
        definition: &mut CharacterDefinition,
    ) -> Result<Vec<String>, PassError> {
        let bounds = [
            ("health", BudgetedStat::CharacterHealth.floor(), budgets.max_character_health),
            ("attack", BudgetedStat::CharacterAttack.floor(), budgets.max_character_attack),
            ("defense", BudgetedStat::CharacterDefense.floor(), budgets.max_character_defense),
            ("currency_drop", BudgetedStat::CurrencyDrop.floor(), budgets.max_currency_drop),
            ("level", 1, super::MAX_LEVEL as i64),
        ];
        let prompt = prompts::logic_prompt(ContentKind::Character, &draft_summary(definition), &bounds);
        let stats: StatFields =
            request_structured(backend, GenerationRole::Logic, prompts::LOGIC_SYSTEM, &prompt)
                .await?;

        let mut applied = Vec::new();
        apply_stat(&mut definition.health, &stats, "health", BudgetedStat::CharacterHealth, budgets, &mut applied);
        apply_stat(&mut definition.attack, &stats, "attack", BudgetedStat::CharacterAttack, budgets, &mut applied);
        apply_stat(&mut definition.defense, &stats, "defense", BudgetedStat::CharacterDefense, budgets, &mut applied);
        apply_stat(
            &mut definition.currency_drop,
            &stats,
            "currency_drop",
            BudgetedStat::CurrencyDrop,
            budgets,
            &mut applied,
        );
        if let Some(level) = stats.number("level") {
            definition.level = clamp_level(Some(level), definition.level);
            applied.push("level".to_string());
        }
        Ok(applied)
    }
}

#[async_trait]
impl ContentGenerator for CharacterGenerator {
    fn kind(&self) -> ContentKind {
        ContentKind::Character
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

        let proposal = Proposal::new(
            ProposalPayload::Character(definition),
            seed,
            context.originator,
        )
        .with_flavor(flavor);

        GenerationOutcome::new(proposal, passes)
    }
}

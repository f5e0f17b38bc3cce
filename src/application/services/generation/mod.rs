//! Content generation pipeline
//!
//! Each generator builds a deterministic fallback from a seeded `StdRng` first,
//! then runs up to three independent enrichment passes against the generation
//! backend. A pass that fails is recorded in its [`PassReport`] and the fields it
//! would have touched keep their fallback values, so generation itself never fails.

pub mod archetypes;
pub mod character;
pub mod item;
pub mod location;
pub mod prompts;
pub mod quest;
pub mod response_parser;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::ports::outbound::{BackendError, GenerationBackendPort, GenerationRole};
use crate::domain::entities::{ContentKind, Originator, Proposal, QuestType, Rarity};
use crate::domain::value_objects::{BudgetedStat, Budgets, GuardrailConfig};

pub use character::CharacterGenerator;
pub use item::ItemGenerator;
pub use location::LocationGenerator;
pub use quest::QuestGenerator;
pub use response_parser::{parse_structured, ParseError};

/// Highest level the balancing pass may assign
pub const MAX_LEVEL: u32 = 20;

/// Quest specifics requested by event spawns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestContext {
    pub quest_type: Option<QuestType>,
    /// Display name of what the quest is about
    pub target: Option<String>,
    pub giver_id: Option<String>,
    pub reward_item_id: Option<String>,
}

/// Target grid cell for a new location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationContext {
    pub x: i64,
    pub y: i64,
    pub neighbor_id: Option<String>,
    pub neighbor_name: Option<String>,
}

/// Inputs shared by every generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationContext {
    pub seed: Option<u64>,
    pub theme: Option<String>,
    /// Name to use instead of a curated one
    pub hint_name: Option<String>,
    /// Archetype key, such as `merchant` or `blade`
    pub archetype: Option<String>,
    pub rarity: Option<Rarity>,
    pub hostile: Option<bool>,
    pub quest: Option<QuestContext>,
    pub location: Option<LocationContext>,
    pub originator: Originator,
}

impl GenerationContext {
    pub fn new(originator: Originator) -> Self {
        Self {
            originator,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_archetype(mut self, archetype: impl Into<String>) -> Self {
        self.archetype = Some(archetype.into());
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    pub fn with_hostile(mut self, hostile: bool) -> Self {
        self.hostile = Some(hostile);
        self
    }

    pub fn with_quest(mut self, quest: QuestContext) -> Self {
        self.quest = Some(quest);
        self
    }

    pub fn with_location(mut self, location: LocationContext) -> Self {
        self.location = Some(location);
        self
    }

    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Creative,
    Logic,
    Portrait,
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PassKind::Creative => "creative",
            PassKind::Logic => "logic",
            PassKind::Portrait => "portrait",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Applied { fields: Vec<String> },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub pass: PassKind,
    #[serde(flatten)]
    pub outcome: PassOutcome,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub proposal: Proposal,
    pub passes: Vec<PassReport>,
}

impl GenerationOutcome {
    fn new(mut proposal: Proposal, passes: Vec<PassReport>) -> Self {
        let applied = passes
            .iter()
            .filter(|p| matches!(p.outcome, PassOutcome::Applied { .. }))
            .count();
        if !passes.is_empty() {
            proposal.score = Some(applied as f32 / passes.len() as f32);
        }
        if applied == 0 {
            proposal.tags.push("fallback".to_string());
        }
        if passes
            .iter()
            .any(|p| matches!(p.outcome, PassOutcome::Failed { .. }))
        {
            proposal.tags.push("degraded".to_string());
        }
        Self { proposal, passes }
    }

    pub fn failed_passes(&self) -> impl Iterator<Item = &PassReport> {
        self.passes
            .iter()
            .filter(|p| matches!(p.outcome, PassOutcome::Failed { .. }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Backend returned an empty response")]
    Empty,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn kind(&self) -> ContentKind;

    /// Produce a draft proposal; never fails, degrading to the seeded fallback
    async fn generate(
        &self,
        guardrails: &GuardrailConfig,
        backend: Option<&dyn GenerationBackendPort>,
        context: &GenerationContext,
    ) -> GenerationOutcome;
}

/// One generator per content kind that has a generation pipeline
pub fn default_generators() -> HashMap<ContentKind, Arc<dyn ContentGenerator>> {
    let generators: [Arc<dyn ContentGenerator>; 4] = [
        Arc::new(CharacterGenerator),
        Arc::new(ItemGenerator),
        Arc::new(QuestGenerator),
        Arc::new(LocationGenerator),
    ];
    generators
        .into_iter()
        .map(|generator| (generator.kind(), generator))
        .collect()
}

/// Fields the creative pass may return
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CreativeFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub flavor: Option<String>,
    pub objective: Option<String>,
    pub biome: Option<String>,
}

/// Numbers returned by the balancing pass; numeric strings are accepted too
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub(crate) struct StatFields(serde_json::Map<String, serde_json::Value>);

impl StatFields {
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Clamp a returned value into `[floor, ceiling]` for the stat
///
/// Missing or non-finite values fall back to `fallback`, which is clamped as well.
pub fn clamp_stat(raw: Option<f64>, stat: BudgetedStat, budgets: &Budgets, fallback: i64) -> i64 {
    let floor = stat.floor();
    let ceiling = budgets.ceiling(stat).max(floor);
    let value = match raw {
        Some(v) if v.is_finite() => v.round() as i64,
        _ => fallback,
    };
    value.clamp(floor, ceiling)
}

pub(crate) fn clamp_level(raw: Option<f64>, fallback: u32) -> u32 {
    let value = match raw {
        Some(v) if v.is_finite() => v.round().clamp(1.0, MAX_LEVEL as f64) as u32,
        _ => fallback,
    };
    value.clamp(1, MAX_LEVEL)
}

/// Apply one balancing field if the response carried it
pub(crate) fn apply_stat(
    target: &mut i64,
    stats: &StatFields,
    key: &str,
    stat: BudgetedStat,
    budgets: &Budgets,
    applied: &mut Vec<String>,
) {
    if let Some(raw) = stats.number(key) {
        *target = clamp_stat(Some(raw), stat, budgets, *target);
        applied.push(key.to_string());
    }
}

/// Merge a creative field when it is non-empty and free of banned terms
pub(crate) fn merge_text(
    target: &mut String,
    candidate: Option<String>,
    field: &str,
    guardrails: &GuardrailConfig,
    applied: &mut Vec<String>,
) {
    let Some(candidate) = candidate else {
        return;
    };
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return;
    }
    if let Some(term) = guardrails.banned_term_in(candidate) {
        tracing::debug!(field, term, "Discarding generated field with banned term");
        return;
    }
    *target = candidate.to_string();
    applied.push(field.to_string());
}

pub(crate) async fn request_structured<T: serde::de::DeserializeOwned>(
    backend: &dyn GenerationBackendPort,
    role: GenerationRole,
    system_prompt: &str,
    prompt: &str,
) -> Result<T, PassError> {
    let response = backend.chat(prompt, system_prompt, role).await?;
    if let Some(usage) = response.usage {
        tracing::debug!(
            role = %role,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Generation backend usage"
        );
    }
    if response.text.trim().is_empty() {
        return Err(PassError::Empty);
    }
    Ok(parse_structured(&response.text)?)
}

/// Image description followed by image generation; yields the image URL
pub(crate) async fn portrait_pass(
    backend: &dyn GenerationBackendPort,
    subject: &str,
    description: &str,
) -> Result<String, PassError> {
    let prompt = prompts::portrait_prompt(subject, description);
    let response = backend
        .chat(&prompt, prompts::PORTRAIT_SYSTEM, GenerationRole::Portrait)
        .await?;
    let image_prompt = response_parser::strip_reasoning(&response.text)
        .trim()
        .to_string();
    if image_prompt.is_empty() {
        return Err(PassError::Empty);
    }
    let image = backend.generate_image(&image_prompt).await?;
    tracing::debug!(model = %image.model, "Portrait generated for {}", subject);
    Ok(image.url)
}

pub(crate) fn pass_report(
    kind: ContentKind,
    pass: PassKind,
    result: Result<Vec<String>, PassError>,
) -> PassReport {
    let outcome = match result {
        Ok(fields) if fields.is_empty() => PassOutcome::Skipped {
            reason: "response carried no usable fields".to_string(),
        },
        Ok(fields) => PassOutcome::Applied { fields },
        Err(e @ PassError::Backend(BackendError::Unconfigured(_))) => {
            tracing::debug!("{} {} pass has no endpoint, keeping fallback: {}", kind, pass, e);
            PassOutcome::Failed {
                error: e.to_string(),
            }
        }
        Err(e) => {
            tracing::warn!("{} {} pass failed, keeping fallback: {}", kind, pass, e);
            PassOutcome::Failed {
                error: e.to_string(),
            }
        }
    };
    PassReport { pass, outcome }
}

pub(crate) fn skipped(passes: &[PassKind], reason: &str) -> Vec<PassReport> {
    passes
        .iter()
        .map(|pass| PassReport {
            pass: *pass,
            outcome: PassOutcome::Skipped {
                reason: reason.to_string(),
            },
        })
        .collect()
}

pub(crate) const NO_BACKEND: &str = "no generation backend configured";

/// Pretty JSON of a draft for inclusion in prompts
pub(crate) fn draft_summary<T: Serialize>(draft: &T) -> String {
    serde_json::to_string_pretty(draft).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::ports::outbound::{ChatResponse, GeneratedImage};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend answering from a script per role; an exhausted script is an error
    #[derive(Default)]
    pub(crate) struct MockBackend {
        pub scripts: Mutex<HashMap<GenerationRole, VecDeque<Result<String, String>>>>,
        pub image_url: Option<String>,
        pub calls: Mutex<Vec<GenerationRole>>,
    }

    impl MockBackend {
        pub fn reply(self, role: GenerationRole, text: &str) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .entry(role)
                .or_default()
                .push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, role: GenerationRole, error: &str) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .entry(role)
                .or_default()
                .push_back(Err(error.to_string()));
            self
        }

        pub fn with_image(mut self, url: &str) -> Self {
            self.image_url = Some(url.to_string());
            self
        }
    }

    #[async_trait]
    impl GenerationBackendPort for MockBackend {
        async fn chat(
            &self,
            _prompt: &str,
            _system_prompt: &str,
            role: GenerationRole,
        ) -> Result<ChatResponse, BackendError> {
            self.calls.lock().unwrap().push(role);
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&role)
                .and_then(|script| script.pop_front());
            match next {
                Some(Ok(text)) => Ok(ChatResponse::text(text)),
                Some(Err(e)) => Err(BackendError::Request(e)),
                None => Err(BackendError::Unconfigured(role)),
            }
        }

        async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, BackendError> {
            match &self.image_url {
                Some(url) => Ok(GeneratedImage {
                    url: url.clone(),
                    model: "mock-image".to_string(),
                }),
                None => Err(BackendError::Unconfigured(GenerationRole::Image)),
            }
        }
    }

    #[test]
    fn test_clamp_stays_within_floor_and_ceiling() {
        let budgets = Budgets::default();
        let max = budgets.max_damage;
        assert_eq!(clamp_stat(Some(9_999.0), BudgetedStat::Damage, &budgets, 5), max);
        assert_eq!(clamp_stat(Some(-40.0), BudgetedStat::Damage, &budgets, 5), 1);
        assert_eq!(clamp_stat(Some(f64::NAN), BudgetedStat::Damage, &budgets, 5), 5);
        assert_eq!(clamp_stat(None, BudgetedStat::Damage, &budgets, 9_999), max);
        for raw in [-1e12, -3.5, 0.0, 0.4, 17.6, 49.5, 1e18, f64::INFINITY] {
            let value = clamp_stat(Some(raw), BudgetedStat::QuestReward, &budgets, 10);
            assert!((0..=budgets.max_quest_reward).contains(&value));
        }
    }

    #[test]
    fn test_ceiling_below_floor_yields_floor() {
        let budgets = Budgets {
            max_character_health: 0,
            ..Default::default()
        };
        assert_eq!(
            clamp_stat(Some(100.0), BudgetedStat::CharacterHealth, &budgets, 10),
            1
        );
    }

    #[test]
    fn test_stat_fields_accept_numeric_strings() {
        let stats: StatFields = serde_json::from_str(r#"{"damage": "14", "value": 9.5, "x": []}"#).unwrap();
        assert_eq!(stats.number("damage"), Some(14.0));
        assert_eq!(stats.number("value"), Some(9.5));
        assert_eq!(stats.number("x"), None);
        assert_eq!(stats.number("missing"), None);
    }

    #[test]
    fn test_default_generators_cover_content_kinds() {
        let generators = default_generators();
        for kind in [
            ContentKind::Character,
            ContentKind::Item,
            ContentKind::Quest,
            ContentKind::Location,
        ] {
            assert_eq!(generators[&kind].kind(), kind);
        }
        assert!(!generators.contains_key(&ContentKind::Event));
    }
}

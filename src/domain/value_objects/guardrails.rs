//! Guardrail configuration value object
//!
//! Guardrails are the numeric ceilings, throttles and feature switches that bound
//! everything the director generates or does on its own. The document is persisted
//! as JSON and edited from the control panel, so every struct backfills missing
//! fields from hard defaults on deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::ContentKind;

/// Substring used in the display form of a secret
pub const SECRET_MASK: &str = "****";

/// Numeric fields that are bounded by a budget ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetedStat {
    Damage,
    Defense,
    CurrencyDrop,
    ItemValue,
    CharacterHealth,
    CharacterAttack,
    CharacterDefense,
    QuestReward,
}

impl BudgetedStat {
    /// Smallest value any generated content may carry for this stat
    pub fn floor(self) -> i64 {
        match self {
            BudgetedStat::Damage => 1,
            BudgetedStat::Defense => 0,
            BudgetedStat::CurrencyDrop => 0,
            BudgetedStat::ItemValue => 1,
            BudgetedStat::CharacterHealth => 1,
            BudgetedStat::CharacterAttack => 0,
            BudgetedStat::CharacterDefense => 0,
            BudgetedStat::QuestReward => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BudgetedStat::Damage => "Item damage",
            BudgetedStat::Defense => "Item defense",
            BudgetedStat::CurrencyDrop => "Currency drop",
            BudgetedStat::ItemValue => "Item value",
            BudgetedStat::CharacterHealth => "Character health",
            BudgetedStat::CharacterAttack => "Character attack",
            BudgetedStat::CharacterDefense => "Character defense",
            BudgetedStat::QuestReward => "Quest reward",
        }
    }
}

/// Budget ceilings per resource kind plus probability scalars for autonomous behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    pub max_damage: i64,
    pub max_defense: i64,
    pub max_currency_drop: i64,
    pub max_item_value: i64,
    pub max_character_health: i64,
    pub max_character_attack: i64,
    pub max_character_defense: i64,
    pub max_quest_reward: i64,
    pub aggression_scalar: f64,
    pub expansion_scalar: f64,
    pub chaos_scalar: f64,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_damage: 50,
            max_defense: 40,
            max_currency_drop: 200,
            max_item_value: 1000,
            max_character_health: 500,
            max_character_attack: 60,
            max_character_defense: 50,
            max_quest_reward: 500,
            aggression_scalar: 0.5,
            expansion_scalar: 0.5,
            chaos_scalar: 0.5,
        }
    }
}

impl Budgets {
    pub fn ceiling(&self, stat: BudgetedStat) -> i64 {
        match stat {
            BudgetedStat::Damage => self.max_damage,
            BudgetedStat::Defense => self.max_defense,
            BudgetedStat::CurrencyDrop => self.max_currency_drop,
            BudgetedStat::ItemValue => self.max_item_value,
            BudgetedStat::CharacterHealth => self.max_character_health,
            BudgetedStat::CharacterAttack => self.max_character_attack,
            BudgetedStat::CharacterDefense => self.max_character_defense,
            BudgetedStat::QuestReward => self.max_quest_reward,
        }
    }

    /// Halved ceilings and scalars used while restricted mode is on
    pub fn restricted(&self) -> Self {
        let half = |v: i64| (v / 2).max(1);
        Self {
            max_damage: half(self.max_damage),
            max_defense: half(self.max_defense),
            max_currency_drop: half(self.max_currency_drop),
            max_item_value: half(self.max_item_value),
            max_character_health: half(self.max_character_health),
            max_character_attack: half(self.max_character_attack),
            max_character_defense: half(self.max_character_defense),
            max_quest_reward: half(self.max_quest_reward),
            aggression_scalar: self.aggression_scalar / 2.0,
            expansion_scalar: self.expansion_scalar / 2.0,
            chaos_scalar: self.chaos_scalar / 2.0,
        }
    }
}

/// Rate limits on generation and world growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Throttles {
    pub generations_per_minute: u32,
    pub max_concurrent_expansions: u32,
}

impl Default for Throttles {
    fn default() -> Self {
        Self {
            generations_per_minute: 30,
            max_concurrent_expansions: 2,
        }
    }
}

/// Boolean feature switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub require_approval: bool,
    pub auto_snapshot_on_risk: bool,
    pub enable_characters: bool,
    pub enable_items: bool,
    pub enable_quests: bool,
    pub enable_locations: bool,
    pub enable_events: bool,
    pub restricted_mode: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            require_approval: true,
            auto_snapshot_on_risk: true,
            enable_characters: true,
            enable_items: true,
            enable_quests: true,
            enable_locations: true,
            enable_events: true,
            restricted_mode: false,
        }
    }
}

impl Features {
    pub fn allows(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Character => self.enable_characters,
            ContentKind::Item => self.enable_items,
            ContentKind::Quest => self.enable_quests,
            ContentKind::Location => self.enable_locations,
            ContentKind::Event => self.enable_events,
        }
    }
}

/// Backend endpoint selected for a generation role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingProfile {
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
}

/// The complete guardrail document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub budgets: Budgets,
    pub throttles: Throttles,
    pub features: Features,
    /// Generation role name (`creative`, `logic`, `portrait`, `image`, `default`) to profile
    pub routing: BTreeMap<String, RoutingProfile>,
    pub banned_terms: Vec<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            budgets: Budgets::default(),
            throttles: Throttles::default(),
            features: Features::default(),
            routing: BTreeMap::new(),
            banned_terms: vec![
                "as an ai".to_string(),
                "language model".to_string(),
                "lorem ipsum".to_string(),
            ],
        }
    }
}

impl GuardrailConfig {
    /// Budgets after applying restricted mode
    pub fn effective_budgets(&self) -> Budgets {
        if self.features.restricted_mode {
            self.budgets.restricted()
        } else {
            self.budgets.clone()
        }
    }

    /// First banned term contained in `text`, compared case-insensitively
    pub fn banned_term_in(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.banned_terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .find(|term| haystack.contains(&term.to_lowercase()))
    }

    /// Copy of the config with every routing secret replaced by its display form
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        for profile in masked.routing.values_mut() {
            if let Some(key) = profile.api_key.as_mut() {
                *key = mask_secret(key);
            }
        }
        masked
    }

    /// Replace masked secrets with the real values held in `previous`
    ///
    /// Only an exact echo of the stored secret's display form counts as masked, so a
    /// new secret that happens to contain the mask characters is kept as entered.
    pub fn restore_masked_secrets(&mut self, previous: &GuardrailConfig) {
        for (role, profile) in self.routing.iter_mut() {
            let Some(stored) = previous.routing.get(role).and_then(|p| p.api_key.as_deref()) else {
                continue;
            };
            if profile.api_key.as_deref() == Some(mask_secret(stored).as_str()) {
                profile.api_key = Some(stored.to_string());
            }
        }
    }
}

/// Display form of a secret: first and last four characters around the mask
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return SECRET_MASK.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, SECRET_MASK, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_backfills_defaults() {
        let json = r#"{"budgets": {"max_damage": 12}, "features": {"require_approval": false}}"#;
        let config: GuardrailConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.budgets.max_damage, 12);
        assert_eq!(config.budgets.max_item_value, Budgets::default().max_item_value);
        assert!(!config.features.require_approval);
        assert!(config.features.enable_events);
        assert_eq!(config.throttles, Throttles::default());
        assert!(!config.banned_terms.is_empty());
    }

    #[test]
    fn test_mask_secret_keeps_edges() {
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-1****abcd");
        assert_eq!(mask_secret("short"), SECRET_MASK);
        assert!(mask_secret("anything-long-enough").contains(SECRET_MASK));
    }

    #[test]
    fn test_restore_masked_secrets_uses_previous_value() {
        let mut previous = GuardrailConfig::default();
        previous.routing.insert(
            "creative".to_string(),
            RoutingProfile {
                model: "writer".to_string(),
                api_key: Some("sk-real-secret-value".to_string()),
                ..Default::default()
            },
        );

        let mut incoming = previous.masked();
        incoming.routing.get_mut("creative").unwrap().model = "writer-v2".to_string();
        incoming.restore_masked_secrets(&previous);

        let profile = &incoming.routing["creative"];
        assert_eq!(profile.model, "writer-v2");
        assert_eq!(profile.api_key.as_deref(), Some("sk-real-secret-value"));
    }

    #[test]
    fn test_new_secret_containing_mask_is_kept() {
        let mut previous = GuardrailConfig::default();
        previous.routing.insert(
            "logic".to_string(),
            RoutingProfile {
                api_key: Some("sk-old-secret-value".to_string()),
                ..Default::default()
            },
        );

        let mut incoming = previous.clone();
        incoming.routing.get_mut("logic").unwrap().api_key = Some("pa****word-rotated".to_string());
        incoming.restore_masked_secrets(&previous);

        assert_eq!(
            incoming.routing["logic"].api_key.as_deref(),
            Some("pa****word-rotated")
        );
    }

    #[test]
    fn test_banned_term_is_case_insensitive() {
        let config = GuardrailConfig {
            banned_terms: vec!["Forbidden".to_string()],
            ..Default::default()
        };
        assert_eq!(config.banned_term_in("a FORBIDDEN relic"), Some("Forbidden"));
        assert_eq!(config.banned_term_in("a quiet relic"), None);
    }

    #[test]
    fn test_restricted_mode_halves_ceilings() {
        let mut config = GuardrailConfig::default();
        config.features.restricted_mode = true;
        let budgets = config.effective_budgets();
        assert_eq!(budgets.max_damage, config.budgets.max_damage / 2);
        assert!(budgets.aggression_scalar < config.budgets.aggression_scalar);
    }
}

//! Proposal validation against guardrails
//!
//! Pure checks: banned terms in player-facing text and numeric fields against the
//! effective budget ceilings. The proposal is never modified.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Proposal, ProposalPayload};
use crate::domain::value_objects::{BudgetedStat, Budgets, GuardrailConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

pub fn validate(proposal: &Proposal, guardrails: &GuardrailConfig) -> ValidationReport {
    let budgets = guardrails.effective_budgets();
    let mut errors = Vec::new();

    if proposal.payload.name().trim().is_empty() {
        errors.push("Name must not be empty".to_string());
    }

    let mut texts: Vec<(&str, &str)> = vec![
        ("name", proposal.payload.name()),
        ("description", proposal.payload.description()),
    ];
    if let Some(flavor) = proposal.flavor.as_deref() {
        texts.push(("flavor", flavor));
    }
    if let ProposalPayload::Quest(quest) = &proposal.payload {
        texts.push(("objective", &quest.objective));
    }
    for (field, text) in texts {
        if let Some(term) = guardrails.banned_term_in(text) {
            errors.push(format!("{} contains banned term \"{}\"", capitalize(field), term));
        }
    }

    let mut check = |stat: BudgetedStat, value: i64| check_stat(&mut errors, &budgets, stat, value);
    match &proposal.payload {
        ProposalPayload::Character(def) => {
            check(BudgetedStat::CharacterHealth, def.health);
            check(BudgetedStat::CharacterAttack, def.attack);
            check(BudgetedStat::CharacterDefense, def.defense);
            check(BudgetedStat::CurrencyDrop, def.currency_drop);
        }
        ProposalPayload::Item(def) => {
            // Non-weapons legitimately carry zero damage
            if def.damage != 0 {
                check(BudgetedStat::Damage, def.damage);
            }
            check(BudgetedStat::Defense, def.defense);
            check(BudgetedStat::ItemValue, def.value);
        }
        ProposalPayload::Quest(def) => {
            check(BudgetedStat::QuestReward, def.reward_currency);
        }
        ProposalPayload::Location(_) | ProposalPayload::Event(_) => {}
    }

    ValidationReport::from_errors(errors)
}

fn check_stat(errors: &mut Vec<String>, budgets: &Budgets, stat: BudgetedStat, value: i64) {
    let ceiling = budgets.ceiling(stat);
    if value > ceiling {
        errors.push(format!("{} {} exceeds budget {}", stat.label(), value, ceiling));
    } else if value < stat.floor() {
        errors.push(format!("{} {} is below minimum {}", stat.label(), value, stat.floor()));
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

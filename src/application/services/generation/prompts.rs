//! Prompt building for the generation passes

use crate::domain::entities::ContentKind;

pub const CREATIVE_SYSTEM: &str = "You are the lore writer for a persistent fantasy world. \
Write vivid, concise content that fits a grounded medieval setting. \
Never mention that you are an assistant and never break the fiction.";

pub const LOGIC_SYSTEM: &str = "You are the balance designer for a persistent fantasy world. \
You assign numeric values to game content. Stay strictly inside the bounds you are given.";

pub const PORTRAIT_SYSTEM: &str = "You write short visual descriptions for an illustrator. \
Describe appearance, pose and lighting in one paragraph. Do not use JSON.";

/// Prompt for the creative pass: name, description and flavor under a rubric
pub fn creative_prompt(
    kind: ContentKind,
    draft: &str,
    theme: Option<&str>,
    banned_terms: &[String],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Improve the following {} for the world.\n\n",
        kind.as_str()
    ));
    prompt.push_str("CURRENT DRAFT:\n");
    prompt.push_str(draft);
    prompt.push_str("\n\n");

    if let Some(theme) = theme.filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("THEME: {}\n\n", theme));
    }

    prompt.push_str("RUBRIC:\n");
    prompt.push_str("  - The name is short, memorable and not a pun.\n");
    prompt.push_str("  - The description is two or three sentences a player would read.\n");
    prompt.push_str("  - The flavor is one sentence of lore or rationale for the world keeper.\n");
    if kind == ContentKind::Quest {
        prompt.push_str("  - The objective is one imperative sentence.\n");
    }

    if !banned_terms.is_empty() {
        prompt.push_str(&format!(
            "  - Never use any of these terms: {}\n",
            banned_terms.join(", ")
        ));
    }
    prompt.push('\n');

    prompt.push_str("Respond with a single JSON object with the keys ");
    if kind == ContentKind::Quest {
        prompt.push_str("\"name\", \"description\", \"flavor\" and \"objective\".");
    } else if kind == ContentKind::Location {
        prompt.push_str("\"name\", \"description\", \"flavor\" and \"biome\".");
    } else {
        prompt.push_str("\"name\", \"description\" and \"flavor\".");
    }
    prompt
}

/// Prompt for the balancing pass with explicit inclusive bounds per field
pub fn logic_prompt(kind: ContentKind, draft: &str, bounds: &[(&str, i64, i64)]) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Assign balanced numeric values to this {}.\n\n",
        kind.as_str()
    ));
    prompt.push_str("CONTENT:\n");
    prompt.push_str(draft);
    prompt.push_str("\n\nBOUNDS (inclusive):\n");
    for (field, min, max) in bounds {
        prompt.push_str(&format!("  - {}: between {} and {}\n", field, min, max));
    }
    prompt.push_str("\nRespond with a single JSON object containing exactly these numeric keys.");
    prompt
}

pub fn portrait_prompt(subject: &str, description: &str) -> String {
    format!(
        "Describe a portrait of {} for an illustrator.\n\nDESCRIPTION: {}\n\nRespond with the visual description only.",
        subject, description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logic_prompt_lists_bounds() {
        let prompt = logic_prompt(ContentKind::Item, "Ember Edge", &[("damage", 1, 50)]);
        assert!(prompt.contains("damage: between 1 and 50"));
    }

    #[test]
    fn test_quest_creative_prompt_asks_for_objective() {
        let prompt = creative_prompt(ContentKind::Quest, "A quest", None, &[]);
        assert!(prompt.contains("\"objective\""));
        let prompt = creative_prompt(ContentKind::Item, "An item", Some("winter"), &[]);
        assert!(!prompt.contains("\"objective\""));
        assert!(prompt.contains("THEME: winter"));
    }
}

//! Structured-record extraction from backend text
//!
//! Assistants wrap their answer in reasoning blocks and markdown fences more often
//! than not. The parser strips both, takes everything from the first `{` to the
//! last `}` and decodes that as JSON.

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No structured object found in response")]
    NoStructuredObject,
    #[error("Failed to decode structured object: {0}")]
    Decode(String),
}

const REASONING_TAGS: [(&str, &str); 3] = [
    ("<think>", "</think>"),
    ("<thinking>", "</thinking>"),
    ("<reasoning>", "</reasoning>"),
];

/// Remove reasoning blocks; an unterminated block swallows the rest of the text
pub fn strip_reasoning(input: &str) -> String {
    let mut output = input.to_string();
    for (start, end) in REASONING_TAGS {
        while let Some(start_idx) = output.find(start) {
            let Some(relative_end) = output[start_idx + start.len()..].find(end) else {
                output.truncate(start_idx);
                break;
            };
            let end_idx = start_idx + start.len() + relative_end + end.len();
            output.replace_range(start_idx..end_idx, "");
        }
    }
    output
}

/// Remove markdown fence markers together with any language word after them
pub fn strip_code_fences(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find("```") {
        output.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        let lang_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[lang_len..];
    }
    output.push_str(rest);
    output
}

/// The span from the first `{` to the last `}`
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end >= start {
        Some(&text[start..=end])
    } else {
        None
    }
}

pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let cleaned = strip_code_fences(&strip_reasoning(text));
    let object = extract_object(&cleaned).ok_or(ParseError::NoStructuredObject)?;
    serde_json::from_str(object).map_err(|e| ParseError::Decode(e.to_string()))
}

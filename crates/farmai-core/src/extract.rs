//! Recovery of a JSON object embedded in free-form model output.
//!
//! Generative providers answer in prose that usually wraps the requested
//! object in a fenced ```` ```json ```` block. The fenced block wins when
//! present; otherwise the widest `{ ... }` span is tried.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*\n(.*?)\n\s*```").expect("fenced json pattern is valid")
});

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object found in model output")]
    NoJsonFound,
    #[error("embedded JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Return the candidate JSON text inside `text`, without parsing it.
pub fn embedded_json(text: &str) -> Option<&str> {
    if let Some(block) = FENCED_JSON.captures(text).and_then(|caps| caps.get(1)) {
        return Some(block.as_str().trim());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Locate and deserialize the JSON object embedded in `text`.
pub fn parse_embedded<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let json = embedded_json(text).ok_or(ExtractError::NoJsonFound)?;
    Ok(serde_json::from_str(json)?)
}

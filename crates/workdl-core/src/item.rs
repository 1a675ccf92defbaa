//! Workshop item identifiers and identifier extraction from free-form text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::EngineError;

/// Steam application id of the game whose workshop items are fetched.
pub const STEAM_APP_ID: u32 = 311_210;

/// Identifier of a remotely hosted workshop item.
///
/// Always a non-empty string of ASCII digits. Construct with
/// [`WorkshopItemId::parse`] or [`extract_workshop_id`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkshopItemId(String);

impl WorkshopItemId {
    /// Parse a bare numeric identifier (surrounding whitespace allowed).
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EngineError::validation("workshop item id is empty"));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EngineError::validation(format!(
                "workshop item id must be numeric, got '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkshopItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkshopItemId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WorkshopItemId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WorkshopItemId> for String {
    fn from(id: WorkshopItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for WorkshopItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn id_param_regex() -> &'static Regex {
    static ID_PARAM_RE: OnceLock<Regex> = OnceLock::new();
    ID_PARAM_RE.get_or_init(|| Regex::new(r"id=(\d+)").expect("id parameter regex is valid"))
}

/// Extract a workshop item id from a bare id or a link containing `id=<digits>`.
///
/// Pure function; returns `None` when nothing id-like is present.
pub fn extract_workshop_id(text: &str) -> Option<WorkshopItemId> {
    let trimmed = text.trim();
    if let Ok(id) = WorkshopItemId::parse(trimmed) {
        return Some(id);
    }
    id_param_regex()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| WorkshopItemId(m.as_str().to_string()))
}

/// Extract every workshop item id from batch text.
///
/// Tokens are separated by newlines, commas or whitespace. Tokens that carry
/// no id are ignored; order of first appearance is preserved and repeats are
/// kept so the queue can apply its own duplicate policy.
///
/// Fails with a validation error when the text contains no id at all.
pub fn extract_workshop_ids(text: &str) -> Result<Vec<WorkshopItemId>, EngineError> {
    if text.trim().is_empty() {
        return Err(EngineError::validation("no workshop items provided"));
    }

    let ids: Vec<WorkshopItemId> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(extract_workshop_id)
        .collect();

    if ids.is_empty() {
        return Err(EngineError::validation(
            "no workshop item ids or links found in input",
        ));
    }
    Ok(ids)
}

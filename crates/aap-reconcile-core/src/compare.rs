//! Semantic comparison of textual attribute values.
//!
//! Free-text attributes (`extra_vars`, `variables`, tags, limits) are sent
//! to the platform as strings but often hold JSON or YAML documents. The
//! platform may hand them back reformatted, so a byte comparison would
//! report drift on every read. This module decides whether two texts carry
//! the same content.
//!
//! Rules, applied in order:
//! 1. Both sides parse as JSON: compare the parsed documents. Object key
//!    order is ignored, array order is not, scalars compare exactly.
//! 2. Otherwise both sides parse as a YAML mapping or sequence: same rules.
//!    A YAML scalar does not count, since YAML accepts nearly any text.
//! 3. One side structured and the other not: never equal.
//! 4. Neither structured: compare the texts with surrounding whitespace
//!    trimmed.

use serde::{Deserialize, Serialize};

/// Format a value was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Json,
    Yaml,
    Text,
}

/// A textual attribute whose format is inferred at comparison time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagedValue {
    raw: String,
}

impl ManagedValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The text exactly as declared or observed.
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Format this value parses as on its own.
    pub fn format(&self) -> ValueFormat {
        if serde_json::from_str::<serde_json::Value>(&self.raw).is_ok() {
            ValueFormat::Json
        } else if parse_yaml(&self.raw).is_some() {
            ValueFormat::Yaml
        } else {
            ValueFormat::Text
        }
    }

    /// Whether `other` carries the same content as `self`.
    pub fn semantic_eq(&self, other: &ManagedValue) -> bool {
        semantic_equal(&self.raw, &other.raw)
    }
}

impl From<&str> for ManagedValue {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ManagedValue {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for ManagedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse as YAML, keeping only mappings and sequences.
fn parse_yaml(text: &str) -> Option<serde_yaml::Value> {
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(value @ (serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_))) => Some(value),
        Ok(serde_yaml::Value::Tagged(tagged))
            if matches!(
                tagged.value,
                serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_)
            ) =>
        {
            Some(serde_yaml::Value::Tagged(tagged))
        }
        _ => None,
    }
}

/// Decide whether `prior` and `proposed` represent the same content.
///
/// Pure and deterministic; malformed input is never an error, it simply
/// falls through to the next rule.
pub fn semantic_equal(prior: &str, proposed: &str) -> bool {
    if prior == proposed {
        return true;
    }

    let prior_json = serde_json::from_str::<serde_json::Value>(prior);
    let proposed_json = serde_json::from_str::<serde_json::Value>(proposed);
    if let (Ok(a), Ok(b)) = (&prior_json, &proposed_json) {
        return a == b;
    }

    // A side that parsed as JSON is structured data even if it is a bare
    // JSON scalar; promote it so the YAML pass compares like with like.
    let prior_doc = structured(prior, prior_json.ok());
    let proposed_doc = structured(proposed, proposed_json.ok());

    match (prior_doc, proposed_doc) {
        (Some(a), Some(b)) => a == b,
        (None, None) => prior.trim() == proposed.trim(),
        _ => false,
    }
}

fn structured(text: &str, json: Option<serde_json::Value>) -> Option<serde_yaml::Value> {
    match json {
        Some(value) => serde_yaml::to_value(value).ok(),
        None => parse_yaml(text),
    }
}

//! Product requirements document input.
//!
//! A PRD is a loosely structured JSON document. Loading never fails: every
//! field is optional, unknown fields are ignored, and malformed entries are
//! skipped. Planners apply their own defaults for missing values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Title used when the PRD has none.
pub const DEFAULT_TITLE: &str = "Project";
/// Domain used when the PRD has none.
pub const DEFAULT_DOMAIN: &str = "general";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prd {
    pub title: String,
    pub domain: String,
    pub objectives: Vec<PrdObjective>,
    pub success_criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrdObjective {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_of_done: Option<String>,
}

impl PrdObjective {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            definition_of_done: None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self::new(s.trim(), "")),
            Value::Object(_) => {
                let title = first_str(value, &["title", "name"]);
                let description = first_str(value, &["description", "summary"]);
                let definition_of_done =
                    text_or_list(value, &["definition_of_done", "dod", "acceptance_criteria"]);
                Some(Self {
                    title,
                    description,
                    definition_of_done,
                })
            }
            _ => None,
        }
    }
}

impl Prd {
    /// Extract a PRD from arbitrary JSON. Non-object input yields an empty
    /// PRD.
    pub fn from_value(value: &Value) -> Self {
        let objectives = match value.get("objectives") {
            Some(Value::Array(items)) => items.iter().filter_map(PrdObjective::from_value).collect(),
            _ => Vec::new(),
        };
        let success_criteria = match value.get("success_criteria") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_owned()],
            _ => Vec::new(),
        };
        Self {
            title: first_str(value, &["title", "name"]),
            domain: first_str(value, &["domain"]),
            objectives,
            success_criteria,
        }
    }

    /// Parse a PRD from JSON text. Only invalid JSON is an error.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Self::from_value(&value))
    }

    /// Title, or [`DEFAULT_TITLE`] when blank.
    pub fn display_title(&self) -> &str {
        non_blank(&self.title).unwrap_or(DEFAULT_TITLE)
    }

    /// Domain, or [`DEFAULT_DOMAIN`] when blank.
    pub fn display_domain(&self) -> &str {
        non_blank(&self.domain).unwrap_or(DEFAULT_DOMAIN)
    }
}

impl<'de> Deserialize<'de> for Prd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

fn first_str(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_owned()
}

/// A string field, or a list of strings joined with `"; "`.
fn text_or_list(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::String(s)) => non_blank(s).map(str::to_owned),
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(non_blank)
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    })
}

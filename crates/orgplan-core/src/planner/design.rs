//! Structured organization design returned by the reasoning service.
//!
//! - [`design_response_schema`] is the JSON schema sent with every request
//! - [`parse_design_output`] turns raw response text into an [`OrgDesign`],
//!   parsing strictly first and falling back to the last top-level JSON
//!   object embedded in surrounding prose

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::graph::BudgetPolicy;

/// Name attached to [`design_response_schema`] in the request envelope.
pub const DESIGN_SCHEMA_NAME: &str = "org_design";

#[derive(Debug, Error)]
pub enum DesignParseError {
    #[error("empty response")]
    Empty,

    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("invalid design JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid design: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrgDesign {
    pub agents: Vec<DesignAgent>,
    pub tasks: Vec<DesignTask>,
    pub budget_policy: BudgetPolicy,
    pub forecast_cost_usd: f64,
    #[serde(default)]
    pub okrs: Option<Vec<DesignOkr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignAgent {
    pub role: String,
    /// Level name; inferred from the role when absent or unrecognized.
    #[serde(default)]
    pub level: Option<String>,
    /// Role name of the manager.
    #[serde(default)]
    pub reports_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Role name of the owning agent.
    pub assignee: String,
    /// Titles or descriptions of prerequisite tasks.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub dod: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignOkr {
    pub owner_role: String,
    pub objective: String,
    #[serde(default)]
    pub key_results: Vec<DesignMetric>,
    #[serde(default)]
    pub kpis: Vec<DesignMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignMetric {
    pub metric: String,
    pub target: f64,
}

impl OrgDesign {
    fn validate(&self) -> Result<(), DesignParseError> {
        if self.agents.is_empty() {
            return Err(DesignParseError::Invalid("no agents".to_owned()));
        }
        if let Some(agent) = self.agents.iter().find(|a| a.role.trim().is_empty()) {
            return Err(DesignParseError::Invalid(format!("agent with blank role: {agent:?}")));
        }
        if !self.forecast_cost_usd.is_finite() || self.forecast_cost_usd < 0.0 {
            return Err(DesignParseError::Invalid(format!(
                "forecast_cost_usd must be a non-negative number, got {}",
                self.forecast_cost_usd
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn metric_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["metric", "target"],
        "properties": {
            "metric": { "type": "string" },
            "target": { "type": "number" }
        }
    })
}

/// JSON schema for [`OrgDesign`]. Every property is listed as required
/// with optional ones made nullable, as strict structured output demands.
pub fn design_response_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["agents", "tasks", "budget_policy", "forecast_cost_usd", "okrs"],
        "properties": {
            "agents": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["role", "level", "reports_to"],
                    "properties": {
                        "role": { "type": "string" },
                        "level": {
                            "type": ["string", "null"],
                            "enum": ["C_SUITE", "VP", "DIRECTOR", "MANAGER", "IC", null]
                        },
                        "reports_to": { "type": ["string", "null"] }
                    }
                }
            },
            "tasks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["title", "description", "assignee", "depends_on", "dod"],
                    "properties": {
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "assignee": { "type": "string" },
                        "depends_on": { "type": "array", "items": { "type": "string" } },
                        "dod": { "type": ["string", "null"] }
                    }
                }
            },
            "budget_policy": {
                "type": "string",
                "enum": ["CONSERVATIVE", "BALANCED", "AGGRESSIVE"]
            },
            "forecast_cost_usd": { "type": "number" },
            "okrs": {
                "type": ["array", "null"],
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["owner_role", "objective", "key_results", "kpis"],
                    "properties": {
                        "owner_role": { "type": "string" },
                        "objective": { "type": "string" },
                        "key_results": { "type": "array", "items": metric_schema() },
                        "kpis": { "type": "array", "items": metric_schema() }
                    }
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a design response.
///
/// The whole text is tried first. If that fails, the last top-level
/// `{...}` span that is valid JSON is tried once. Anything else is an
/// error.
pub fn parse_design_output(text: &str) -> Result<OrgDesign, DesignParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DesignParseError::Empty);
    }
    match parse_strict(trimmed) {
        Ok(design) => Ok(design),
        Err(first) => {
            debug!(error = %first, "strict design parse failed; trying last embedded object");
            let candidate = last_json_object(trimmed).ok_or(DesignParseError::NoJsonObject)?;
            if candidate.len() == trimmed.len() {
                return Err(first);
            }
            parse_strict(candidate)
        }
    }
}

fn parse_strict(text: &str) -> Result<OrgDesign, DesignParseError> {
    let design: OrgDesign = serde_json::from_str(text)?;
    design.validate()?;
    Ok(design)
}

/// The last top-level span that parses as a JSON object. Prose such as
/// `{role}` is skipped.
fn last_json_object(text: &str) -> Option<&str> {
    top_level_spans(text).into_iter().rev().find(|span| {
        serde_json::from_str::<Value>(span).is_ok_and(|v| v.is_object())
    })
}

/// Balanced `{...}` spans at nesting depth zero, in order. Braces inside
/// JSON string literals are ignored.
fn top_level_spans(text: &str) -> Vec<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

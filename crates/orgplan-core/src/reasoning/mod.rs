//! Reasoning capability used by the reasoning-backed planner.
//!
//! The capability is a structured-output completion service: given a
//! system prompt, a user prompt and a JSON schema it returns text that
//! should conform to the schema. It is modelled as the object-safe
//! [`ReasoningClient`] trait so the planner can run against the HTTP
//! client, a scripted test double, or [`UnavailableClient`] when nothing
//! is configured.

pub mod http;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::graph::GraphError;
use crate::planner::design::DesignParseError;

pub use http::ChatCompletionsClient;

/// A single structured-output request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub system: String,
    pub user: String,
    /// Name attached to the schema in the request envelope.
    pub schema_name: String,
    pub schema: serde_json::Value,
    pub model: String,
    pub temperature: f32,
}

/// Which cross-reference in a design response failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    ReportsTo,
    Assignee,
    DependsOn,
    OkrOwner,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReportsTo => "reports_to",
            Self::Assignee => "assignee",
            Self::DependsOn => "depends_on",
            Self::OkrOwner => "owner_role",
        };
        f.write_str(s)
    }
}

/// Failures of the reasoning path. All variants except
/// [`ReasoningError::Graph`] are recovered by falling back to the
/// deterministic planner.
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("reasoning capability unavailable: {0}")]
    Unavailable(String),

    #[error("reasoning transport error: {0}")]
    Transport(String),

    #[error("unexpected reasoning response: {0}")]
    Response(String),

    #[error("reasoning request timed out after {0:?}")]
    Timeout(Duration),

    #[error("reasoning request cancelled")]
    Cancelled,

    #[error("design response rejected: {0}")]
    Schema(#[from] DesignParseError),

    #[error("unresolved {kind} reference: {name:?}")]
    UnresolvedReference { kind: RefKind, name: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A structured-output completion service.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Run one completion and return the raw response text.
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError>;
}

// Compile-time assertion: ReasoningClient must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn ReasoningClient) {}
};

/// Client used when no reasoning service is configured. Every call fails
/// with [`ReasoningError::Unavailable`].
#[derive(Debug, Clone)]
pub struct UnavailableClient {
    reason: String,
}

impl UnavailableClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ReasoningClient for UnavailableClient {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, _request: &ReasoningRequest) -> Result<String, ReasoningError> {
        Err(ReasoningError::Unavailable(self.reason.clone()))
    }
}

/// Truncate `input` to `max_chars` characters for logging.
pub(crate) fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_owned();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={char_count}]"));
    preview
}

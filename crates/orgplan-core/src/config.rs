//! Planner settings resolved from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::reasoning::{ChatCompletionsClient, ReasoningClient, UnavailableClient};

/// What to do when a design response names a role or task that does not
/// exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefPolicy {
    /// Skip the edge (or fall back to a default assignee) and log it.
    #[default]
    Drop,
    /// Reject the whole response; the planner then falls back to the
    /// deterministic path.
    Error,
}

impl fmt::Display for RefPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => f.write_str("drop"),
            Self::Error => f.write_str("error"),
        }
    }
}

impl FromStr for RefPolicy {
    type Err = RefPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "error" | "strict" => Ok(Self::Error),
            _ => Err(RefPolicyParseError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPolicyParseError(pub String);

impl fmt::Display for RefPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid unresolved-reference policy: {:?} (expected drop or error)", self.0)
    }
}

impl std::error::Error for RefPolicyParseError {}

/// Settings for the reasoning-backed planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    pub model: String,
    /// Bearer token. Without one the reasoning path is unavailable.
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Upper bound on a single reasoning call.
    pub request_timeout: Duration,
    pub ref_policy: RefPolicy,
}

impl PlannerConfig {
    pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;

    /// Build a config from environment variables, falling back to defaults.
    ///
    /// - `ORGPLAN_ENDPOINT`, `ORGPLAN_MODEL`
    /// - `ORGPLAN_API_KEY`, else `OPENAI_API_KEY`
    /// - `ORGPLAN_TIMEOUT_SECS`
    /// - `ORGPLAN_UNRESOLVED_REFS` (`drop` or `error`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values are
    /// logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let request_timeout = match get("ORGPLAN_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = %raw, "ignoring invalid ORGPLAN_TIMEOUT_SECS");
                    defaults.request_timeout
                }
            },
            None => defaults.request_timeout,
        };
        let ref_policy = match get("ORGPLAN_UNRESOLVED_REFS") {
            Some(raw) => raw.parse().unwrap_or_else(|e: RefPolicyParseError| {
                warn!(error = %e, "ignoring ORGPLAN_UNRESOLVED_REFS");
                defaults.ref_policy
            }),
            None => defaults.ref_policy,
        };

        Self {
            endpoint: get("ORGPLAN_ENDPOINT").unwrap_or(defaults.endpoint),
            model: get("ORGPLAN_MODEL").unwrap_or(defaults.model),
            api_key: get("ORGPLAN_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            temperature: defaults.temperature,
            request_timeout,
            ref_policy,
        }
    }

    /// The reasoning client this config describes: the HTTP client when an
    /// API key is present, otherwise an [`UnavailableClient`].
    pub fn reasoning_client(&self) -> Arc<dyn ReasoningClient> {
        if self.api_key.is_none() {
            return Arc::new(UnavailableClient::new("no API key configured"));
        }
        match ChatCompletionsClient::new(self) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, "failed to build reasoning client");
                Arc::new(UnavailableClient::new(e.to_string()))
            }
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            api_key: None,
            temperature: Self::DEFAULT_TEMPERATURE,
            request_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            ref_policy: RefPolicy::Drop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = PlannerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.endpoint, PlannerConfig::DEFAULT_ENDPOINT);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = PlannerConfig::from_lookup(lookup(&[
            ("ORGPLAN_ENDPOINT", "http://localhost:8080/v1/chat/completions"),
            ("ORGPLAN_MODEL", "local-model"),
            ("ORGPLAN_API_KEY", "sk-orgplan"),
            ("ORGPLAN_TIMEOUT_SECS", "5"),
            ("ORGPLAN_UNRESOLVED_REFS", "error"),
        ]));
        assert_eq!(config.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.api_key.as_deref(), Some("sk-orgplan"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.ref_policy, RefPolicy::Error);
    }

    #[test]
    fn api_key_falls_back_to_openai_variable() {
        let config = PlannerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-openai")]));
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));

        let config = PlannerConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("ORGPLAN_API_KEY", "sk-orgplan"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-orgplan"));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = PlannerConfig::from_lookup(lookup(&[
            ("ORGPLAN_TIMEOUT_SECS", "soon"),
            ("ORGPLAN_UNRESOLVED_REFS", "maybe"),
            ("ORGPLAN_MODEL", "   "),
        ]));
        assert_eq!(config.request_timeout, Duration::from_secs(PlannerConfig::DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.ref_policy, RefPolicy::Drop);
        assert_eq!(config.model, PlannerConfig::DEFAULT_MODEL);
    }

    #[test]
    fn ref_policy_parse() {
        assert_eq!("DROP".parse::<RefPolicy>().unwrap(), RefPolicy::Drop);
        assert_eq!("strict".parse::<RefPolicy>().unwrap(), RefPolicy::Error);
        let err = "sometimes".parse::<RefPolicy>().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn missing_key_yields_unavailable_client() {
        let client = PlannerConfig::default().reasoning_client();
        assert_eq!(client.name(), "unavailable");
    }
}

//! Configuration file management for orgplan.
//!
//! Provides a TOML-based config file at `~/.config/orgplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use orgplan_core::{PlannerConfig, RefPolicy};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub reasoning: ReasoningSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReasoningSection {
    /// Chat-completions endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// `drop` or `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved_refs: Option<String>,
}

impl ReasoningSection {
    /// The value this section holds for an environment variable name.
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "ORGPLAN_ENDPOINT" => self.endpoint.clone(),
            "ORGPLAN_MODEL" => self.model.clone(),
            "ORGPLAN_API_KEY" => self.api_key.clone(),
            "ORGPLAN_TIMEOUT_SECS" => self.timeout_secs.map(|s| s.to_string()),
            "ORGPLAN_UNRESOLVED_REFS" => self.unresolved_refs.clone(),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the orgplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/orgplan` or `~/.config/orgplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("orgplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("orgplan")
}

/// Return the path to the orgplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. `Ok(None)` if it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since it may hold an API key.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Resolve the planner configuration.
///
/// - Each `ORGPLAN_*` env var > the matching `[reasoning]` key > default
/// - API key: `ORGPLAN_API_KEY` > `reasoning.api_key` > `OPENAI_API_KEY`
/// - `--strict-refs` forces the `error` reference policy
pub fn resolve(strict_refs: bool) -> Result<PlannerConfig> {
    let file = load_config()?;
    Ok(resolve_with(file.as_ref(), |key| std::env::var(key).ok(), strict_refs))
}

fn resolve_with<F>(file: Option<&ConfigFile>, env: F, strict_refs: bool) -> PlannerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = PlannerConfig::from_lookup(|key| {
        env(key).or_else(|| file.and_then(|f| f.reasoning.lookup(key)))
    });
    if strict_refs {
        config.ref_policy = RefPolicy::Error;
    }
    config
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn file() -> ConfigFile {
        ConfigFile {
            reasoning: ReasoningSection {
                endpoint: Some("http://file:9000/v1/chat/completions".to_owned()),
                model: Some("file-model".to_owned()),
                api_key: Some("sk-file".to_owned()),
                timeout_secs: Some(7),
                unresolved_refs: Some("error".to_owned()),
            },
        }
    }

    #[test]
    fn config_file_roundtrip_omits_unset_keys() {
        let original = ConfigFile {
            reasoning: ReasoningSection {
                model: Some("gpt-4o".to_owned()),
                ..ReasoningSection::default()
            },
        };
        let contents = toml::to_string_pretty(&original).unwrap();
        assert!(contents.contains("[reasoning]"));
        assert!(!contents.contains("api_key"));

        let loaded: ConfigFile = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.reasoning.model.as_deref(), Some("gpt-4o"));
        assert!(loaded.reasoning.endpoint.is_none());
    }

    #[test]
    fn empty_file_parses() {
        let loaded: ConfigFile = toml::from_str("").unwrap();
        assert!(loaded.reasoning.model.is_none());
    }

    #[test]
    fn file_values_apply_when_env_is_empty() {
        let f = file();
        let config = resolve_with(Some(&f), env_of(&[]), false);
        assert_eq!(config.endpoint, "http://file:9000/v1/chat/completions");
        assert_eq!(config.model, "file-model");
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.ref_policy, RefPolicy::Error);
    }

    #[test]
    fn env_overrides_file() {
        let f = file();
        let config = resolve_with(
            Some(&f),
            env_of(&[("ORGPLAN_MODEL", "env-model"), ("ORGPLAN_UNRESOLVED_REFS", "drop")]),
            false,
        );
        assert_eq!(config.model, "env-model");
        assert_eq!(config.ref_policy, RefPolicy::Drop);
        assert_eq!(config.endpoint, "http://file:9000/v1/chat/completions");
    }

    #[test]
    fn file_key_beats_generic_openai_key() {
        let f = file();
        let config = resolve_with(Some(&f), env_of(&[("OPENAI_API_KEY", "sk-openai")]), false);
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));

        let config = resolve_with(None, env_of(&[("OPENAI_API_KEY", "sk-openai")]), false);
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
    }

    #[test]
    fn cli_flag_overrides_everything() {
        let config = resolve_with(
            None,
            env_of(&[("ORGPLAN_UNRESOLVED_REFS", "drop")]),
            true,
        );
        assert_eq!(config.ref_policy, RefPolicy::Error);
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = resolve_with(None, env_of(&[]), false);
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn config_path_honours_xdg_config_home() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let path = config_path();
        let missing = load_config();

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        assert_eq!(path, tmp.path().join("orgplan").join("config.toml"));
        assert!(matches!(missing, Ok(None)), "missing file should load as None");
    }

    #[cfg(unix)]
    #[test]
    fn save_config_writes_private_file() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let saved = save_config(&file());
        let loaded = load_config();
        let mode = std::fs::metadata(config_path()).map(|m| m.permissions().mode() & 0o777);

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        saved.unwrap();
        let loaded = loaded.unwrap().unwrap();
        assert_eq!(loaded.reasoning.model.as_deref(), Some("file-model"));
        assert_eq!(mode.unwrap(), 0o600);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("orgplan");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "reasoning = 5").unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = load_config();

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("failed to parse config file"), "unexpected error: {msg}");
    }
}

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GuardError, GuardResult};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Runtime configuration for the guard.
///
/// Scoring weights are fixed and never configurable; only the advisory
/// hook and the audit sink are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub advisory: AdvisoryConfig,
    /// JSONL file receiving one audit record per analysis.
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Only `"gemini"` enables the hook. Anything else leaves it off.
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 15,
        }
    }
}

impl AdvisoryConfig {
    /// True when the provider is supported and a non-empty key is present.
    pub fn is_enabled(&self) -> bool {
        self.provider.eq_ignore_ascii_case("gemini")
            && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl GuardConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> GuardResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> GuardResult<Self> {
        toml::from_str(text).map_err(|e| GuardError::Config(e.to_string()))
    }

    /// Override fields from `LLM_PROVIDER`, `GEMINI_API_KEY`, `GEMINI_MODEL`
    /// and `INTEGRITY_AUDIT_LOG`. The lookup is injected so tests don't touch
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.advisory.provider = provider.trim().to_lowercase();
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.advisory.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.advisory.model = model;
        }
        if let Some(path) = lookup("INTEGRITY_AUDIT_LOG") {
            self.audit_log = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> GuardResult<()> {
        if self.advisory.timeout_secs == 0 {
            return Err(GuardError::Config(
                "advisory.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.advisory.model.trim().is_empty() {
            return Err(GuardError::Config(
                "advisory.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

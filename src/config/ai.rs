// src/config/ai.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::analyze::cache::DEFAULT_CACHE_CAPACITY;

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

const MAX_TEMPERATURE: f32 = 0.3;

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Remote-model backend settings (`config/ai.json`, then env overrides).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Only "openai" (any OpenAI-compatible chat completions endpoint) for now.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Kept low: consistency matters more than variety for this task.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading AI config from {}", path.display()))?;
        let cfg: AiConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing AI config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// `$AI_CONFIG_PATH`, then `config/ai.json`, through [`AiConfig::load_or_default`].
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(ENV_AI_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.into());
        Self::load_or_default(path)
    }

    /// File if present, defaults otherwise; env overrides on top.
    /// A file that exists but doesn't parse is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let base = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("AI_ENABLED") {
            self.enabled = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = env::var("AI_MODEL") {
            if !v.trim().is_empty() {
                self.model = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("AI_BASE_URL") {
            if !v.trim().is_empty() {
                self.base_url = v.trim().to_string();
            }
        }
        if let Some(n) = env::var("AI_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            self.cache_capacity = n;
        }
        self.sanitized()
    }

    /// Resolve the key: "ENV" (any case) reads OPENAI_API_KEY. Empty means missing.
    pub fn resolved_api_key(&self) -> Option<String> {
        let key = if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        };
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }

    fn sanitized(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();
        if !self.temperature.is_finite() {
            self.temperature = default_temperature();
        }
        self.temperature = self.temperature.clamp(0.0, MAX_TEMPERATURE);
        self.cache_capacity = self.cache_capacity.max(1);
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ai.json");
        fs::write(
            &p,
            r#"{"enabled":true,"provider":"OpenAI","temperature":0.9,"cache_capacity":0,"base_url":"http://x/v1/"}"#,
        )
        .unwrap();
        let cfg = AiConfig::load_from_file(&p).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert!((cfg.temperature - MAX_TEMPERATURE).abs() < f32::EPSILON);
        assert_eq!(cfg.cache_capacity, 1);
        assert_eq!(cfg.base_url, "http://x/v1");
    }

    #[test]
    fn literal_key_resolves_without_env() {
        let cfg = AiConfig {
            api_key: " sk-test ".into(),
            ..AiConfig::default()
        };
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ai.json");
        fs::write(&p, "{ not json").unwrap();
        assert!(AiConfig::load_from_file(&p).is_err());
    }
}

// src/config/mod.rs
pub mod ai;

use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::analyze::ModelKind;

pub const DEFAULT_MAX_TEXT_CHARS: usize = 5000;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Service-level settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_model: ModelKind,
    pub max_text_chars: usize,
    pub history_capacity: usize,
    pub boost_rules_path: Option<PathBuf>,
    pub ai_config_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: ModelKind::default(),
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            boost_rules_path: None,
            ai_config_path: PathBuf::from(ai::DEFAULT_AI_CONFIG_PATH),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = env::var("SENTIMENT_DEFAULT_MODEL") {
            match ModelKind::parse(&v) {
                Some(kind) => cfg.default_model = kind,
                None => warn!(value = %v, "unknown SENTIMENT_DEFAULT_MODEL; using lexicon"),
            }
        }
        if let Some(n) = parse_usize("SENTIMENT_MAX_TEXT_CHARS") {
            cfg.max_text_chars = n.max(1);
        }
        if let Some(n) = parse_usize("SENTIMENT_HISTORY_CAPACITY") {
            cfg.history_capacity = n;
        }
        cfg.boost_rules_path = env::var("SENTIMENT_BOOST_RULES_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if let Ok(p) = env::var(ai::ENV_AI_CONFIG_PATH) {
            if !p.trim().is_empty() {
                cfg.ai_config_path = PathBuf::from(p);
            }
        }
        cfg
    }
}

fn parse_usize(key: &str) -> Option<usize> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}

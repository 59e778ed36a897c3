// src/ai_bootstrap.rs
use crate::analyze::ai_adapter::{MockProvider, OpenAiProvider, Provider, RemoteError};
use crate::analyze::remote::RemoteScorer;
use crate::analyze::{DisabledScorer, ModelKind, Scorer};
use crate::config::ai::AiConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The remote backend as composed from configuration.
pub struct AiRuntime {
    pub cfg: AiConfig,
    pub scorer: Arc<dyn Scorer>,
    /// Set only when a live (or mock) provider is wired in.
    pub remote: Option<Arc<RemoteScorer>>,
}

fn test_mode_mock() -> bool {
    std::env::var("AI_TEST_MODE")
        .map(|v| v.trim().eq_ignore_ascii_case("mock"))
        .unwrap_or(false)
}

impl AiRuntime {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self::from_config(AiConfig::load_or_default(path)?))
    }

    /// Never fails: an unusable backend becomes a `DisabledScorer`.
    pub fn from_config(cfg: AiConfig) -> Self {
        // Safe diagnostics: provider, model, enabled, key presence only
        info!(
            provider = %cfg.provider,
            model = %cfg.model,
            enabled = cfg.enabled,
            key_present = cfg.resolved_api_key().is_some(),
            "AI cfg loaded"
        );

        if test_mode_mock() {
            info!("AI_TEST_MODE=mock; remote backend uses the mock provider");
            let provider = MockProvider::neutral().with_model(cfg.model.clone());
            return Self::with_provider(cfg, Arc::new(provider));
        }

        if !cfg.enabled {
            return Self::disabled(cfg, "disabled in configuration");
        }

        match OpenAiProvider::from_config(&cfg) {
            Ok(provider) => Self::with_provider(cfg, Arc::new(provider)),
            Err(e) => {
                warn!(error = %e, "remote backend could not be constructed; requests will get error responses");
                let reason = match &e {
                    RemoteError::MissingApiKey(_) => "missing API key".to_string(),
                    other => other.to_string(),
                };
                Self::disabled(cfg, reason)
            }
        }
    }

    pub fn with_provider(cfg: AiConfig, provider: Arc<dyn Provider>) -> Self {
        let remote = Arc::new(RemoteScorer::new(provider, cfg.cache_capacity));
        Self {
            cfg,
            scorer: remote.clone(),
            remote: Some(remote),
        }
    }

    fn disabled(cfg: AiConfig, reason: impl Into<String>) -> Self {
        Self {
            cfg,
            scorer: Arc::new(DisabledScorer::new(ModelKind::Remote, reason)),
            remote: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.remote.is_some()
    }

    /// One-off smoke test of the remote backend. Logs the outcome, never fails.
    pub async fn quick_probe(&self) {
        let Some(remote) = &self.remote else {
            warn!("AI quick_probe skipped: remote backend is not available");
            return;
        };
        let sample = "The new release is fast and the docs are great.";
        let out = remote.analyze(sample).await;
        match &out.error {
            None => info!(
                provider = remote.provider_name(),
                sentiment = out.sentiment.as_str(),
                confidence = out.confidence,
                "AI quick_probe ok"
            ),
            Some(e) => warn!(provider = remote.provider_name(), error = %e, "AI quick_probe failed"),
        }
    }
}

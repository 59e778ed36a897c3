// Public library surface for integration tests (and potential reuse).

pub mod ai_bootstrap;
pub mod analyze;
pub mod api;
pub mod config;
pub mod contract;
pub mod fingerprint;
pub mod history;
pub mod metrics;
pub mod moderation;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::analyze::{AnalyzerRouter, ModelKind, Scorer};
pub use crate::api::router;
pub use crate::contract::{AnalysisResponse, Sentiment};

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::ai_bootstrap::AiRuntime;
use crate::analyze::{BlendedScorer, BoostTable, LexiconScorer};
use crate::api::AppState;
use crate::config::AppConfig;
use crate::history::InMemoryHistory;
use crate::metrics::Metrics;
use crate::moderation::ModerationFilter;

/// Compose the analyzer from configuration. The remote slot is whatever
/// `AiRuntime` could build (live, mock, or disabled).
pub fn build_analyzer(cfg: &AppConfig, ai: &AiRuntime) -> AnalyzerRouter {
    let boosts = BoostTable::from_optional_path(cfg.boost_rules_path.as_deref());
    AnalyzerRouter::new(
        ModerationFilter::new(),
        Arc::new(LexiconScorer::new()),
        Arc::new(BlendedScorer::new(boosts)),
        ai.scorer.clone(),
    )
    .with_default_model(cfg.default_model)
}

/// Build the full in-process app (routes, state, metrics) from env and config files.
pub async fn app() -> anyhow::Result<Router> {
    Metrics::init();
    let cfg = AppConfig::from_env();
    let ai = AiRuntime::from_path(&cfg.ai_config_path)?;
    info!(
        default_model = %cfg.default_model,
        max_text_chars = cfg.max_text_chars,
        remote_live = ai.is_live(),
        "sentiment router configured"
    );

    let state = AppState {
        analyzer: build_analyzer(&cfg, &ai),
        history: Arc::new(InMemoryHistory::with_capacity(cfg.history_capacity)),
        max_text_chars: cfg.max_text_chars,
    };
    Ok(router(state))
}

/// Call this from the Shuttle entrypoint (after tracing init) to perform a one-off
/// smoke test of the remote backend. It won't panic on failure; it just logs the result.
pub async fn run_ai_quick_probe() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    let ai = AiRuntime::from_path(&cfg.ai_config_path)?;
    ai.quick_probe().await;
    info!("AI quick probe finished");
    Ok(())
}

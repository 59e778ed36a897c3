// src/analyze/mod.rs
//! Analysis pipeline entry: model selection, the scorer strategy, and the router that
//! puts moderation in front of every scorer.

pub mod ai_adapter;
pub mod blended;
pub mod cache;
pub mod polarity;
pub mod remote;
pub mod rules;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::contract::{build_error, build_standard, AnalysisResponse, ModerationInfo, ScoreBreakdown, Sentiment};
use crate::fingerprint::anon_hash;
use crate::moderation::ModerationFilter;

// Re-export convenient types.
pub use crate::analyze::blended::BlendedScorer;
pub use crate::analyze::remote::RemoteScorer;
pub use crate::analyze::rules::BoostTable;
pub use crate::sentiment::LexiconScorer;

/// The closed set of scoring backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Lexicon,
    Blended,
    Remote,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Lexicon, ModelKind::Blended, ModelKind::Remote];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Lexicon => "lexicon",
            ModelKind::Blended => "blended",
            ModelKind::Remote => "remote",
        }
    }

    /// Case-insensitive, trimmed. Accepts the legacy names too.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lexicon" | "vader" => Some(ModelKind::Lexicon),
            "blended" | "hybrid" => Some(ModelKind::Blended),
            "remote" | "gpt-4o-mini" | "openai" | "gpt" | "llm" => Some(ModelKind::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scoring backend. Implementations never fail: errors come back as a
/// contract-compliant response with `error` set.
#[async_trait]
pub trait Scorer: Send + Sync {
    fn kind(&self) -> ModelKind;
    async fn score(&self, text: &str) -> AnalysisResponse;
}

/// Stand-in for a backend that could not be constructed (e.g. no API key).
pub struct DisabledScorer {
    kind: ModelKind,
    reason: String,
}

impl DisabledScorer {
    pub fn new(kind: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Scorer for DisabledScorer {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    async fn score(&self, text: &str) -> AnalysisResponse {
        build_error(
            text,
            self.kind.as_str(),
            format!("{} backend unavailable: {}", self.kind, self.reason),
        )
    }
}

/// Moderation first, then exactly one scorer.
#[derive(Clone)]
pub struct AnalyzerRouter {
    moderation: Arc<ModerationFilter>,
    lexicon: Arc<dyn Scorer>,
    blended: Arc<dyn Scorer>,
    remote: Arc<dyn Scorer>,
    default_model: ModelKind,
}

impl AnalyzerRouter {
    pub fn new(
        moderation: ModerationFilter,
        lexicon: Arc<dyn Scorer>,
        blended: Arc<dyn Scorer>,
        remote: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            moderation: Arc::new(moderation),
            lexicon,
            blended,
            remote,
            default_model: ModelKind::default(),
        }
    }

    /// Local scorers with built-in boosts; the remote slot is disabled.
    pub fn local_only() -> Self {
        Self::new(
            ModerationFilter::new(),
            Arc::new(LexiconScorer::new()),
            Arc::new(BlendedScorer::new(BoostTable::default())),
            Arc::new(DisabledScorer::new(ModelKind::Remote, "not configured")),
        )
    }

    pub fn with_default_model(mut self, model: ModelKind) -> Self {
        self.default_model = model;
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn Scorer>) -> Self {
        self.remote = remote;
        self
    }

    pub fn default_model(&self) -> ModelKind {
        self.default_model
    }

    /// Unknown names fall back to the configured default.
    pub fn normalize_model(&self, requested: &str) -> ModelKind {
        ModelKind::parse(requested).unwrap_or(self.default_model)
    }

    fn scorer(&self, kind: ModelKind) -> &Arc<dyn Scorer> {
        match kind {
            ModelKind::Lexicon => &self.lexicon,
            ModelKind::Blended => &self.blended,
            ModelKind::Remote => &self.remote,
        }
    }

    pub async fn analyze(&self, text: &str, requested: &str) -> AnalysisResponse {
        let started = Instant::now();
        let kind = self.normalize_model(requested);
        let id = anon_hash(text);

        let verdict = self.moderation.check(text);
        if verdict.is_harmful {
            warn!(
                id = %id,
                model = %kind,
                category = verdict.category.as_deref().unwrap_or("unknown"),
                "moderation flagged input; scoring skipped"
            );
            counter!("analysis_flagged_total").increment(1);
            return build_standard(
                text,
                Sentiment::Harmful,
                ScoreBreakdown::HARMFUL,
                1.0,
                kind.as_str(),
                None,
                None,
                false,
                None,
            )
            .with_moderation(verdict.info());
        }

        let resp = self
            .scorer(kind)
            .score(text)
            .await
            .with_moderation(ModerationInfo::safe());

        counter!("analysis_requests_total", "model" => kind.as_str()).increment(1);
        if resp.error.is_some() {
            counter!("analysis_errors_total", "model" => kind.as_str()).increment(1);
        }
        histogram!("analysis_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            id = %id,
            model = %kind,
            sentiment = resp.sentiment.as_str(),
            cached = resp.cached,
            error = resp.error.is_some(),
            "analysis done"
        );
        resp
    }
}

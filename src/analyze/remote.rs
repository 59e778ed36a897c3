//! Remote-model scorer: one provider call per cache miss, fingerprint LRU in front.

use async_trait::async_trait;
use metrics::{counter, gauge};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::analyze::ai_adapter::{build_prompt, parse_verdict, Provider, RemoteError, SYSTEM_PROMPT};
use crate::analyze::cache::FingerprintCache;
use crate::analyze::{ModelKind, Scorer};
use crate::contract::{build_error, build_standard, derive_scores_from_compound, AnalysisResponse, Sentiment};
use crate::fingerprint::{anon_hash, fingerprint};

pub const EMPTY_TEXT_REASONING: &str = "Empty text provided.";

pub struct RemoteScorer {
    provider: Arc<dyn Provider>,
    cache: FingerprintCache,
}

impl RemoteScorer {
    pub fn new(provider: Arc<dyn Provider>, cache_capacity: usize) -> Self {
        let cache = FingerprintCache::new(cache_capacity);
        gauge!("remote_cache_capacity").set(cache.capacity() as f64);
        Self { provider, cache }
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn analyze(&self, text: &str) -> AnalysisResponse {
        let model = self.provider.model();

        if text.trim().is_empty() {
            return build_standard(
                text,
                Sentiment::Neutral,
                derive_scores_from_compound(0.0),
                0.0,
                model,
                None,
                Some(EMPTY_TEXT_REASONING.to_string()),
                false,
                None,
            );
        }

        let key = fingerprint(text);
        if let Some(hit) = self.cache.get(&key) {
            counter!("remote_cache_hits_total").increment(1);
            debug!(id = %anon_hash(text), model, "remote cache hit");
            return AnalysisResponse {
                text: text.to_string(),
                cached: true,
                ..hit
            };
        }
        counter!("remote_cache_misses_total").increment(1);

        match self.call(text).await {
            Ok(resp) => {
                if let Some(evicted) = self.cache.insert(key, resp.clone()) {
                    debug!(evicted = %evicted, "remote cache eviction");
                }
                resp
            }
            Err(e) => {
                warn!(
                    id = %anon_hash(text),
                    provider = self.provider.name(),
                    error = %e,
                    "remote scoring failed"
                );
                build_error(text, model, e.to_string())
            }
        }
    }

    async fn call(&self, text: &str) -> Result<AnalysisResponse, RemoteError> {
        let raw = self
            .provider
            .complete(SYSTEM_PROMPT, &build_prompt(text))
            .await?;
        let verdict = parse_verdict(&raw)?;
        Ok(verdict.into_response(text, self.provider.model()))
    }
}

#[async_trait]
impl Scorer for RemoteScorer {
    fn kind(&self) -> ModelKind {
        ModelKind::Remote
    }

    async fn score(&self, text: &str) -> AnalysisResponse {
        self.analyze(text).await
    }
}

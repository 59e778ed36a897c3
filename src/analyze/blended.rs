//! Blended scorer: lexicon valence (60%) + secondary polarity (40%) + phrase boosts.
//!
//! Confidence is `agreement * |combined|` with `agreement = 1 - |v - t| / 2`, so two
//! signals that disagree produce a weak confidence even when the combined score is
//! extreme. If the secondary signal fails, the lexicon result is returned alone and
//! tagged as a degraded result.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analyze::polarity::{LexicalPolarity, PolarityError, PolaritySignal};
use crate::analyze::rules::BoostTable;
use crate::analyze::{ModelKind, Scorer};
use crate::contract::{build_standard, derive_scores_from_compound, AnalysisResponse, Sentiment};
use crate::fingerprint::anon_hash;
use crate::sentiment::LexiconScorer;

pub const MODEL_BLENDED: &str = "blended";
pub const MODEL_LEXICON_FALLBACK: &str = "lexicon-fallback";

const LEXICON_WEIGHT: f64 = 0.6;
const POLARITY_WEIGHT: f64 = 0.4;

#[derive(Debug, Error)]
pub enum BlendError {
    #[error("secondary polarity signal failed: {0}")]
    Polarity(#[from] PolarityError),
    #[error("blended score is not finite")]
    NonFinite,
}

/// Intermediate values of one blend, kept for diagnostics and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Blend {
    pub lexicon: f64,
    pub polarity: f64,
    pub boost: f64,
    pub matched: Vec<String>,
    pub combined: f64,
    pub agreement: f64,
    pub confidence: f64,
}

#[derive(Clone)]
pub struct BlendedScorer {
    lexicon: LexiconScorer,
    polarity: Arc<dyn PolaritySignal>,
    boosts: BoostTable,
}

impl BlendedScorer {
    pub fn new(boosts: BoostTable) -> Self {
        Self::with_signal(Arc::new(LexicalPolarity::new()), boosts)
    }

    pub fn with_signal(polarity: Arc<dyn PolaritySignal>, boosts: BoostTable) -> Self {
        Self {
            lexicon: LexiconScorer::new(),
            polarity,
            boosts,
        }
    }

    pub fn blend(&self, text: &str) -> Result<Blend, BlendError> {
        let v = self.lexicon.score(text).compound;
        let t = self.polarity.polarity(text)?;
        let boost = self.boosts.apply(text);

        let combined = (v * LEXICON_WEIGHT + t * POLARITY_WEIGHT + boost.boost).clamp(-1.0, 1.0);
        if !combined.is_finite() {
            return Err(BlendError::NonFinite);
        }
        let agreement = 1.0 - (v - t).abs() / 2.0;
        Ok(Blend {
            lexicon: v,
            polarity: t,
            boost: boost.boost,
            matched: boost.matched,
            combined,
            agreement,
            confidence: agreement * combined.abs(),
        })
    }

    pub fn analyze(&self, text: &str) -> AnalysisResponse {
        match self.blend(text) {
            Ok(b) => {
                let sentiment = Sentiment::from_compound(b.combined);
                debug!(
                    id = %anon_hash(text),
                    lexicon = b.lexicon,
                    polarity = b.polarity,
                    boost = b.boost,
                    patterns = b.matched.len(),
                    combined = b.combined,
                    "blended score"
                );
                build_standard(
                    text,
                    sentiment,
                    derive_scores_from_compound(b.combined),
                    b.confidence,
                    MODEL_BLENDED,
                    None,
                    None,
                    false,
                    None,
                )
            }
            Err(e) => {
                warn!(
                    id = %anon_hash(text),
                    signal = self.polarity.name(),
                    error = %e,
                    "blended scoring degraded to lexicon only"
                );
                let lex = self.lexicon.score(text);
                build_standard(
                    text,
                    Sentiment::from_compound(lex.compound),
                    lex.breakdown(),
                    0.0,
                    MODEL_LEXICON_FALLBACK,
                    None,
                    None,
                    false,
                    Some(e.to_string()),
                )
            }
        }
    }
}

#[async_trait]
impl Scorer for BlendedScorer {
    fn kind(&self) -> ModelKind {
        ModelKind::Blended
    }

    async fn score(&self, text: &str) -> AnalysisResponse {
        self.analyze(text)
    }
}

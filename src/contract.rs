//! Response contract shared by every scoring backend.
//!
//! Every scorer returns an [`AnalysisResponse`]; the API layer, the history store and
//! the UI never need to know which backend ran. Use [`build_standard`] and
//! [`build_error`] instead of filling the struct by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compound thresholds shared by the lexicon and blended scorers.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

/// Reasoning attached to every error response.
pub const ERROR_REASONING: &str = "Analysis unavailable due to error.";

/// Final sentiment label. `Harmful` is only ever produced by the moderation short-circuit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Harmful,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Harmful,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Harmful => "harmful",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Sentiment::Positive => "😊",
            Sentiment::Negative => "😞",
            Sentiment::Neutral => "😐",
            Sentiment::Harmful => "⚠️",
        }
    }

    /// Label a compound score with the fixed ±0.05 thresholds.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if compound <= NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// positive/negative/neutral sum to 1.0; compound is signed and independent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub compound: f64,
}

impl ScoreBreakdown {
    /// Fixed profile for moderated content.
    pub const HARMFUL: ScoreBreakdown = ScoreBreakdown {
        positive: 0.0,
        negative: 1.0,
        neutral: 0.0,
        compound: -0.99,
    };

    /// Normalise three non-negative masses so they sum to 1.0 at 3-decimal precision.
    ///
    /// Neutral absorbs the rounding remainder, so the rounded triple still sums to 1.0.
    pub fn normalized(positive: f64, negative: f64, neutral: f64, compound: f64) -> Self {
        let total = positive + negative + neutral;
        if !(total.is_finite() && total > 0.0) {
            return Self {
                positive: 0.0,
                negative: 0.0,
                neutral: 1.0,
                compound: round3(compound.clamp(-1.0, 1.0)),
            };
        }
        let p = round3(positive / total);
        let n = round3(negative / total);
        let u = round3((1.0 - p - n).max(0.0));
        Self {
            positive: p,
            negative: n,
            neutral: u,
            compound: round3(compound.clamp(-1.0, 1.0)),
        }
    }

    pub fn distribution_sum(&self) -> f64 {
        self.positive + self.negative + self.neutral
    }
}

/// Moderation block attached by the router after scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModerationInfo {
    pub flagged: bool,
    pub reason: Option<String>,
    pub severity: String,
}

impl ModerationInfo {
    pub fn safe() -> Self {
        Self {
            flagged: false,
            reason: None,
            severity: "safe".to_string(),
        }
    }
}

/// The one output shape every backend produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub text: String,
    pub sentiment: Sentiment,
    pub emoji: String,
    pub scores: ScoreBreakdown,
    pub confidence: f64,
    pub model: String,
    pub emotions: Vec<String>,
    pub reasoning: String,
    pub cached: bool,
    pub error: Option<String>,
    /// `None` until the router attaches it; serialized as `null` so the key is always present.
    pub moderation: Option<ModerationInfo>,
}

impl AnalysisResponse {
    /// Attach the moderation block. The only field set after construction.
    pub fn with_moderation(mut self, moderation: ModerationInfo) -> Self {
        self.moderation = Some(moderation);
        self
    }

    pub fn is_flagged(&self) -> bool {
        self.moderation.as_ref().is_some_and(|m| m.flagged)
    }
}

/// Build a contract-compliant response. Optional pieces default to empty.
#[allow(clippy::too_many_arguments)]
pub fn build_standard(
    text: &str,
    sentiment: Sentiment,
    scores: ScoreBreakdown,
    confidence: f64,
    model: &str,
    emotions: Option<Vec<String>>,
    reasoning: Option<String>,
    cached: bool,
    error: Option<String>,
) -> AnalysisResponse {
    let confidence = if confidence.is_finite() {
        round3(confidence.clamp(0.0, 1.0))
    } else {
        0.0
    };
    AnalysisResponse {
        text: text.to_string(),
        sentiment,
        emoji: sentiment.emoji().to_string(),
        scores,
        confidence,
        model: model.to_string(),
        emotions: emotions.unwrap_or_default(),
        reasoning: reasoning.unwrap_or_default(),
        cached,
        error,
        moderation: None,
    }
}

/// Contract-compliant failure: neutral, zero confidence, `error` populated.
pub fn build_error(text: &str, model: &str, message: impl Into<String>) -> AnalysisResponse {
    build_standard(
        text,
        Sentiment::Neutral,
        derive_scores_from_compound(0.0),
        0.0,
        model,
        None,
        Some(ERROR_REASONING.to_string()),
        false,
        Some(message.into()),
    )
}

/// Synthesize the three-way split from a single compound value.
///
/// `positive = 0.5 + c/2`, `negative = 0.5 - c/2`, `neutral = 1 - |c|`, renormalised to 1.0.
pub fn derive_scores_from_compound(compound: f64) -> ScoreBreakdown {
    let c = if compound.is_finite() {
        compound.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let positive = 0.5 + c * 0.5;
    let negative = 0.5 - c * 0.5;
    let neutral = 1.0 - c.abs();
    ScoreBreakdown::normalized(positive, negative, neutral, c)
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

const REQUIRED_KEYS: [&str; 11] = [
    "text",
    "sentiment",
    "emoji",
    "scores",
    "confidence",
    "model",
    "emotions",
    "reasoning",
    "cached",
    "error",
    "moderation",
];

const REQUIRED_SCORE_KEYS: [&str; 4] = ["positive", "negative", "neutral", "compound"];

/// Check a serialized response against the contract. Empty means compliant.
pub fn validate(response: &Value) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(obj) = response.as_object() else {
        violations.push("response must be a JSON object".to_string());
        return violations;
    };

    for key in REQUIRED_KEYS {
        if !obj.contains_key(key) {
            violations.push(format!("Missing required key: '{key}'"));
        }
    }

    if let Some(scores) = obj.get("scores") {
        for key in REQUIRED_SCORE_KEYS {
            if scores.get(key).and_then(Value::as_f64).is_none() {
                violations.push(format!("Missing required scores key: '{key}'"));
            }
        }
    }

    if let Some(sentiment) = obj.get("sentiment") {
        let valid = sentiment
            .as_str()
            .is_some_and(|s| Sentiment::ALL.iter().any(|v| v.as_str() == s));
        if !valid {
            violations.push(format!(
                "Invalid sentiment {sentiment}. Must be one of: positive, negative, neutral, harmful"
            ));
        }
    }

    if let Some(emotions) = obj.get("emotions") {
        if !emotions.is_array() {
            violations.push("'emotions' must be a list".to_string());
        }
    }

    if let Some(cached) = obj.get("cached") {
        if !cached.is_boolean() {
            violations.push("'cached' must be a bool".to_string());
        }
    }

    violations
}

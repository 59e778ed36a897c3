//! Secondary polarity signal for the blended scorer.
//!
//! Independent of the valence lexicon: averages per-word polarities from its own
//! embedded table, scaled by a preceding intensifier and damped/flipped (×−0.5)
//! under negation. Returns a value in `[-1, 1]`; `0.0` when nothing matched.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

static POLARITY: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../../polarity_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid polarity lexicon")
});

const NEGATION_SCALAR: f64 = -0.5;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolarityError {
    #[error("polarity estimate is not finite")]
    NonFinite,
    #[error("polarity signal unavailable: {0}")]
    Unavailable(String),
}

/// A polarity estimator in `[-1, 1]`. Object-safe so tests can swap in failing signals.
pub trait PolaritySignal: Send + Sync {
    fn polarity(&self, text: &str) -> Result<f64, PolarityError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Default)]
pub struct LexicalPolarity;

impl LexicalPolarity {
    pub fn new() -> Self {
        Lazy::force(&POLARITY);
        Self
    }
}

impl PolaritySignal for LexicalPolarity {
    fn polarity(&self, text: &str) -> Result<f64, PolarityError> {
        let words: Vec<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut assessed: Vec<f64> = Vec::new();
        for (i, w) in words.iter().enumerate() {
            let Some(&base) = POLARITY.get(w.as_str()) else {
                continue;
            };
            let prev = i.checked_sub(1).map(|j| words[j].as_str());
            let prev2 = i.checked_sub(2).map(|j| words[j].as_str());

            let mut p = base;
            if let Some(m) = prev.and_then(intensity) {
                p *= m;
            }
            let negated = prev.is_some_and(is_negation)
                || (prev.and_then(intensity).is_some() && prev2.is_some_and(is_negation));
            if negated {
                p *= NEGATION_SCALAR;
            }
            assessed.push(p.clamp(-1.0, 1.0));
        }

        if assessed.is_empty() {
            return Ok(0.0);
        }
        let mean = assessed.iter().sum::<f64>() / assessed.len() as f64;
        if !mean.is_finite() {
            return Err(PolarityError::NonFinite);
        }
        Ok(mean.clamp(-1.0, 1.0))
    }

    fn name(&self) -> &'static str {
        "lexical-polarity"
    }
}

fn intensity(w: &str) -> Option<f64> {
    let m = match w {
        "very" => 1.3,
        "really" | "so" | "too" => 1.2,
        "extremely" => 1.5,
        "super" | "incredibly" => 1.4,
        "quite" | "pretty" => 1.1,
        "slightly" | "somewhat" => 0.7,
        _ => return None,
    };
    Some(m)
}

fn is_negation(w: &str) -> bool {
    matches!(w, "not" | "never" | "no" | "hardly") || w.ends_with("n't")
}

//! Lexicon scorer: VADER-style valence scoring over an embedded word lexicon.
//!
//! Deterministic, no I/O. The lexicon maps lowercase words to a valence on a −4..4
//! scale; the rules below adjust that valence for boosters, caps, negation,
//! contrastive "but" and trailing punctuation before the sum is squashed into
//! a compound score in `[-1, 1]`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::analyze::{ModelKind, Scorer};
use crate::contract::{build_standard, AnalysisResponse, ScoreBreakdown, Sentiment};

pub const MODEL_LEXICON: &str = "lexicon";

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
const NORM_ALPHA: f64 = 15.0;

/// Raw lexicon output, unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub compound: f64,
}

impl LexiconScores {
    pub fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown::normalized(self.positive, self.negative, self.neutral, self.compound)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

struct Token<'a> {
    raw: &'a str,
    lower: String,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Lazy::force(&LEXICON);
        Self
    }

    #[inline]
    fn valence(&self, w: &str) -> Option<f64> {
        LEXICON.get(w).copied()
    }

    pub fn lexicon_size(&self) -> usize {
        LEXICON.len()
    }

    pub fn score(&self, text: &str) -> LexiconScores {
        let tokens = tokenize(text);
        let has_caps = tokens.iter().any(|t| is_all_caps(t.raw));
        let has_lower = tokens.iter().any(|t| !is_all_caps(t.raw));
        let cap_diff = has_caps && has_lower;

        let mut sentiments: Vec<f64> = Vec::with_capacity(tokens.len());
        for i in 0..tokens.len() {
            let w = tokens[i].lower.as_str();

            // boosters carry no valence of their own
            let kind_of = w == "kind" && tokens.get(i + 1).is_some_and(|t| t.lower == "of");
            if booster(w).is_some() || kind_of {
                sentiments.push(0.0);
                continue;
            }

            let Some(base) = self.valence(w) else {
                sentiments.push(0.0);
                continue;
            };

            let mut v = base;
            if cap_diff && is_all_caps(tokens[i].raw) {
                v += C_INCR * v.signum();
            }

            for k in 1..=3 {
                if i < k {
                    break;
                }
                let prev = &tokens[i - k];
                if self.valence(&prev.lower).is_none() {
                    let mut s = booster_scalar(prev, v, cap_diff);
                    if k == 2 {
                        s *= 0.95;
                    } else if k == 3 {
                        s *= 0.9;
                    }
                    v += s;
                }
            }

            if negated_before(&tokens, i, 3) {
                v *= N_SCALAR;
            }
            sentiments.push(v);
        }

        apply_but_rule(&tokens, &mut sentiments);

        let punct = punctuation_emphasis(text);
        let mut sum: f64 = sentiments.iter().sum();
        if sum > 0.0 {
            sum += punct;
        } else if sum < 0.0 {
            sum -= punct;
        }
        let compound = normalize(sum);

        let (mut pos, mut neg, neu) = sentiments.iter().fold((0.0, 0.0, 0.0), |acc, &s| {
            if s > 0.0 {
                (acc.0 + s + 1.0, acc.1, acc.2)
            } else if s < 0.0 {
                (acc.0, acc.1 + s - 1.0, acc.2)
            } else {
                (acc.0, acc.1, acc.2 + 1.0)
            }
        });
        if pos > neg.abs() {
            pos += punct;
        } else if pos < neg.abs() {
            neg -= punct;
        }

        let total = pos + neg.abs() + neu;
        if total <= 0.0 {
            return LexiconScores {
                positive: 0.0,
                negative: 0.0,
                neutral: 1.0,
                compound,
            };
        }
        LexiconScores {
            positive: (pos / total).abs(),
            negative: (neg / total).abs(),
            neutral: (neu / total).abs(),
            compound,
        }
    }
}

/// Whitespace tokens with edge punctuation stripped; internal apostrophes survive.
fn tokenize(s: &str) -> Vec<Token<'_>> {
    s.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| t.chars().count() > 1)
        .map(|t| Token {
            raw: t,
            lower: t.to_lowercase(),
        })
        .collect()
}

fn is_all_caps(w: &str) -> bool {
    w.chars().any(char::is_alphabetic) && !w.chars().any(char::is_lowercase)
}

fn booster(w: &str) -> Option<f64> {
    let v = match w {
        "absolutely" | "amazingly" | "awfully" | "completely" | "considerably" | "decidedly"
        | "deeply" | "enormously" | "entirely" | "especially" | "exceptionally"
        | "extremely" | "fabulously" | "greatly" | "highly" | "hugely" | "incredibly"
        | "intensely" | "majorly" | "more" | "most" | "particularly" | "purely" | "quite"
        | "really" | "remarkably" | "so" | "substantially" | "thoroughly" | "totally"
        | "tremendously" | "uber" | "unbelievably" | "unusually" | "utterly" | "very" => B_INCR,
        "almost" | "barely" | "hardly" | "less" | "little" | "marginally" | "occasionally"
        | "partly" | "scarcely" | "slightly" | "somewhat" | "sorta" | "kinda" => B_DECR,
        _ => return None,
    };
    Some(v)
}

fn booster_scalar(prev: &Token<'_>, valence: f64, cap_diff: bool) -> f64 {
    let Some(mut scalar) = booster(&prev.lower) else {
        return 0.0;
    };
    if valence < 0.0 {
        scalar = -scalar;
    }
    if cap_diff && is_all_caps(prev.raw) {
        scalar += C_INCR * valence.signum();
    }
    scalar
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nor"
            | "neither"
            | "nothing"
            | "nobody"
            | "none"
            | "nowhere"
            | "cannot"
            | "without"
            | "rarely"
            | "seldom"
            | "dont"
            | "doesnt"
            | "didnt"
            | "isnt"
            | "wasnt"
            | "arent"
            | "wont"
            | "cant"
            | "couldnt"
            | "shouldnt"
            | "wouldnt"
            | "aint"
    ) || tok.ends_with("n't")
}

fn negated_before(tokens: &[Token<'_>], i: usize, window: usize) -> bool {
    (1..=window).any(|k| i >= k && is_negator(&tokens[i - k].lower))
}

fn apply_but_rule(tokens: &[Token<'_>], sentiments: &mut [f64]) {
    let Some(but_idx) = tokens.iter().position(|t| t.lower == "but") else {
        return;
    };
    for (j, s) in sentiments.iter_mut().enumerate() {
        if j < but_idx {
            *s *= 0.5;
        } else if j > but_idx {
            *s *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm = text.matches('?').count();
    let qm_amp = match qm {
        0 | 1 => 0.0,
        2..=3 => qm as f64 * 0.18,
        _ => 0.96,
    };
    ep + qm_amp
}

fn normalize(score: f64) -> f64 {
    let n = score / (score * score + NORM_ALPHA).sqrt();
    n.clamp(-1.0, 1.0)
}

impl LexiconScorer {
    /// Full contract response; confidence is `|compound|`.
    pub fn analyze(&self, text: &str) -> AnalysisResponse {
        let raw = self.score(text);
        build_standard(
            text,
            Sentiment::from_compound(raw.compound),
            raw.breakdown(),
            raw.compound.abs(),
            MODEL_LEXICON,
            None,
            None,
            false,
            None,
        )
    }
}

#[async_trait]
impl Scorer for LexiconScorer {
    fn kind(&self) -> ModelKind {
        ModelKind::Lexicon
    }

    async fn score(&self, text: &str) -> AnalysisResponse {
        self.analyze(text)
    }
}

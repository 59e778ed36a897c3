//! Content moderation: a pure, regex-based pre-filter run before any scorer.
//!
//! Input is normalised (lowercase, censorship substitutions, punctuation collapsed to
//! single spaces) and then tested against an ordered table of pattern groups.
//! Some patterns carry a veto on the text that follows them. The first match that
//! survives its veto wins; order only decides which pattern gets reported.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::contract::ModerationInfo;

const HARMFUL_REASON: &str = "Contains harmful or threatening language";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Safe => "safe",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModerationResult {
    pub is_harmful: bool,
    pub category: Option<String>,
    pub matched_pattern: Option<String>,
    pub matched_text: Option<String>,
    pub severity: Severity,
    pub reason: Option<String>,
}

impl ModerationResult {
    pub fn safe() -> Self {
        Self {
            is_harmful: false,
            category: None,
            matched_pattern: None,
            matched_text: None,
            severity: Severity::Safe,
            reason: None,
        }
    }

    /// The compact block carried on the response.
    pub fn info(&self) -> ModerationInfo {
        ModerationInfo {
            flagged: self.is_harmful,
            reason: self.reason.clone(),
            severity: self.severity.as_str().to_string(),
        }
    }
}

// Patterns run against normalised text: apostrophes are already spaces ("don t", "you re").
const KILL: &str = r"(?:kill|k[i]+ll|hurt|harm|stab|shoot|murder)";
const VICTIM: &str = r"(?:you|u|ya|someone|somebody|him|her|them|everyone|everybody|people|y all)";

// A match is discarded when the text right after it matches the veto ("shoot you" + "an email").
const MESSAGE_OBJECT: &str = r"^\s*(?:(?:a|an|the|my|our|your)\s+)?(?:(?:quick|short|brief|new)\s+)?(?:e\s?mail|mail|message|msg|text|dm|note|line|invite|link|reply|pic|photo|update|question)\b";
const DEAD_ADJECTIVE: &str = r"^\s*(?:gorgeous|sexy|beautiful|handsome|cute|funny|serious|tired|easy|simple|center|centre)\b";

type Rule = (&'static str, Option<&'static str>);

static PATTERN_GROUPS: &[(&str, &[Rule])] = &[
    (
        "self_harm",
        &[
            (r"\b(?:kill|hurt|harm)\s+(?:yourself|urself|yoself|yourselves)\b", None),
            (r"\bcommit\s+suicide\b", None),
            (r"\bend\s+(?:your|ur|yo)\s+(?:own\s+)?life\b", None),
            (r"\bgo\s+hang\s+(?:yourself|urself|yoself)\b", None),
            (r"\bgo\s+die\b", None),
        ],
    ),
    (
        "threat",
        &[
            (
                r"\bi\s*(?:m|am)?\s+(?:will|gonna|going\s+to|want\s+to|wanna|am\s+going\s+to|plan\s+to|ll)\s+KILL\s+VICTIM\b",
                Some(MESSAGE_OBJECT),
            ),
            (r"\bi\s+know\s+where\s+(?:you|u)\s+live\b", None),
            (r"\bbetter\s+watch\s+your\s+back\b", None),
        ],
    ),
    (
        "death_wish",
        &[
            (r"\b(?:you|u)\s+(?:should|deserve\s+to|ought\s+to|need\s+to)\s+(?:die|be\s+killed)\b", None),
            (r"\bi\s+hope\s+(?:you|u)\s+(?:die|get\s+killed|rot)\b", None),
            (
                r"\b(?:you|u)\s+(?:(?:should|can|could|may|need\s+to|ought\s+to)\s+)?(?:(?:just|go)\s+)?(?:drop|fall)\s+dead\b",
                Some(DEAD_ADJECTIVE),
            ),
        ],
    ),
    (
        "hate",
        &[
            (r"\bi\s+hate\s+(?:you|u)\b", None),
            (r"\b(?:you|u)\s+(?:are|re|r)\s+(?:worthless|useless|garbage|trash|pathetic|disgusting)\b", None),
        ],
    ),
    (
        "slur",
        &[
            (
                r"\b(?:you|they|those|these)\s+(?:people\s+)?(?:are|re|r)\s+(?:subhuman|vermin|cockroaches|parasites|animals)\b",
                None,
            ),
            (r"\bsubhuman\s+(?:scum|trash|filth)\b", None),
        ],
    ),
    (
        "harassment",
        &[
            (r"\bwhy\s+don\s?t\s+(?:you|u)\s+(?:just\s+)?(?:kill|die|leave)\b", None),
            (r"\b(?:you|u)\s+should\s+(?:kill|die)\b", None),
            (r"\bnobody\s+(?:would\s+)?(?:miss|cares\s+about)\s+(?:you|u)\b", None),
        ],
    ),
];

struct CompiledPattern {
    category: &'static str,
    source: String,
    re: Regex,
    not_followed_by: Option<Regex>,
}

impl CompiledPattern {
    /// First match whose continuation isn't vetoed.
    fn find<'t>(&self, text: &'t str) -> Option<regex::Match<'t>> {
        self.re.find_iter(text).find(|m| {
            self.not_followed_by
                .as_ref()
                .is_none_or(|veto| !veto.is_match(&text[m.end()..]))
        })
    }
}

static COMPILED: Lazy<Vec<CompiledPattern>> = Lazy::new(|| {
    PATTERN_GROUPS
        .iter()
        .flat_map(|&(category, rules)| {
            rules.iter().map(move |&(p, veto)| {
                let source = p.replace("KILL", KILL).replace("VICTIM", VICTIM);
                CompiledPattern {
                    category,
                    re: Regex::new(&source).expect("moderation pattern"),
                    not_followed_by: veto.map(|v| Regex::new(v).expect("moderation veto")),
                    source,
                }
            })
        })
        .collect()
});

/// Stateless moderation pre-filter. Cheap to construct; the pattern table is shared.
#[derive(Debug, Clone, Default)]
pub struct ModerationFilter;

impl ModerationFilter {
    pub fn new() -> Self {
        Lazy::force(&COMPILED);
        Self
    }

    pub fn pattern_count(&self) -> usize {
        COMPILED.len()
    }

    /// Never fails; a miss (or empty text) is the only negative outcome.
    pub fn check(&self, text: &str) -> ModerationResult {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return ModerationResult::safe();
        }
        for pattern in COMPILED.iter() {
            if let Some(m) = pattern.find(&normalized) {
                return ModerationResult {
                    is_harmful: true,
                    category: Some(pattern.category.to_string()),
                    matched_pattern: Some(pattern.source.clone()),
                    matched_text: Some(m.as_str().to_string()),
                    severity: Severity::High,
                    reason: Some(HARMFUL_REASON.to_string()),
                };
            }
        }
        ModerationResult::safe()
    }
}

/// Lowercase, undo common censorship (`*`/`1`→i, `@`→a, `0`→o, intra-word `!`→i),
/// then collapse everything that isn't a letter or digit into single spaces.
pub fn normalize(text: &str) -> String {
    let chars: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
    let mut out = String::with_capacity(chars.len());
    let mut pending_space = false;

    for (i, &ch) in chars.iter().enumerate() {
        let mapped = match ch {
            '*' | '1' => 'i',
            '@' => 'a',
            '0' => 'o',
            '!' if is_between_letters(&chars, i) => 'i',
            c => c,
        };
        if mapped.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            out.push(mapped);
            pending_space = false;
        } else {
            pending_space = true;
        }
    }
    out
}

fn is_between_letters(chars: &[char], i: usize) -> bool {
    i > 0
        && chars[i - 1].is_alphabetic()
        && chars.get(i + 1).is_some_and(|c| c.is_alphabetic())
}

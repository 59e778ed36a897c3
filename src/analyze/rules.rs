//! Phrase-pattern boosts for the blended scorer.
//!
//! Each rule is a case-insensitive regex with a signed boost and an optional `unless`
//! regex that vetoes the match (e.g. "fire" but not "fire sale"). When several rules
//! match, the applied boost is the mean of the matched values, never the sum.
//!
//! The built-in table can be replaced by a JSON file:
//! ```json
//! { "rules": [ { "name": "negation", "pattern": "\\bnot bad\\b", "boost": 0.4 } ] }
//! ```

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BoostRuleSet {
    pub rules: Vec<BoostRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoostRule {
    pub name: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub unless: Option<String>,
    pub boost: f64,
}

impl BoostRule {
    fn new(name: &str, pattern: &str, unless: Option<&str>, boost: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            pattern: pattern.to_string(),
            unless: unless.map(str::to_string),
            boost,
        }
    }
}

/// Built-in table: negation softening, slang, sarcasm, lukewarm phrases.
pub fn builtin_rules() -> BoostRuleSet {
    let rules = vec![
        BoostRule::new("negation", r"\bnot bad\b", None, 0.4),
        BoostRule::new("negation", r"\bnot terrible\b", None, 0.3),
        BoostRule::new("negation", r"\bnot horrible\b", None, 0.3),
        BoostRule::new("negation", r"\bdon'?t hate\b", None, 0.2),
        BoostRule::new("negation", r"\bdon'?t dislike\b", None, 0.3),
        BoostRule::new("negation", r"\bnot the worst\b", None, 0.2),
        BoostRule::new("slang", r"\bslaps?\b", None, 0.5),
        BoostRule::new("slang", r"\bbussin\b", None, 0.6),
        BoostRule::new("slang", r"\bfire\b", Some(r"\bfire\s+sale\b"), 0.4),
        BoostRule::new("slang", r"\bhits different\b", None, 0.4),
        BoostRule::new("slang", r"\bno cap\b", None, 0.3),
        BoostRule::new("slang", r"\blit\b", None, 0.4),
        BoostRule::new("sarcasm", r"\bthanks for nothing\b", None, -0.7),
        BoostRule::new(
            "sarcasm",
            r"\boh great\b.*\b(delay|problem|issue)\b",
            None,
            -0.5,
        ),
        BoostRule::new(
            "sarcasm",
            r"\bjust what i needed\b",
            Some(r"\bjust what i needed\b.*(good|great)"),
            -0.4,
        ),
        BoostRule::new("lukewarm", r"\bit'?s fine\b", None, -0.2),
        BoostRule::new("lukewarm", r"\bokay i guess\b", None, -0.3),
        BoostRule::new("lukewarm", r"\bdecent i suppose\b", None, -0.2),
    ];
    BoostRuleSet { rules }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    source: String,
    re: Regex,
    unless: Option<Regex>,
    boost: f64,
}

/// Outcome of a boost scan: the mean boost and the patterns that fired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoostOutcome {
    pub boost: f64,
    pub matched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BoostTable {
    rules: Vec<CompiledRule>,
}

static BUILTIN: Lazy<BoostTable> =
    Lazy::new(|| BoostTable::compile(&builtin_rules()).expect("builtin boost rules compile"));

impl Default for BoostTable {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl BoostTable {
    pub fn compile(set: &BoostRuleSet) -> Result<Self, regex::Error> {
        let mut rules = Vec::with_capacity(set.rules.len());
        for r in &set.rules {
            let unless = match &r.unless {
                Some(u) => Some(case_insensitive(u)?),
                None => None,
            };
            rules.push(CompiledRule {
                source: r.pattern.clone(),
                re: case_insensitive(&r.pattern)?,
                unless,
                boost: r.boost,
            });
        }
        Ok(Self { rules })
    }

    /// Load an override file; any read/parse/compile failure keeps the built-in table.
    pub fn from_optional_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match load_rules_file(path).and_then(|set| {
            Self::compile(&set).with_context(|| format!("compiling {}", path.display()))
        }) {
            Ok(table) => {
                info!(path = %path.display(), rules = table.len(), "boost rules loaded");
                table
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "boost rules unusable; using built-in table");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, text: &str) -> BoostOutcome {
        let text = text.replace(['\u{2018}', '\u{2019}'], "'").to_lowercase();

        let mut total = 0.0;
        let mut matched = Vec::new();
        for rule in &self.rules {
            if !rule.re.is_match(&text) {
                continue;
            }
            if rule.unless.as_ref().is_some_and(|u| u.is_match(&text)) {
                continue;
            }
            total += rule.boost;
            matched.push(rule.source.clone());
        }

        let boost = if matched.is_empty() {
            0.0
        } else {
            total / matched.len() as f64
        };
        BoostOutcome { boost, matched }
    }
}

pub fn load_rules_file(path: &Path) -> anyhow::Result<BoostRuleSet> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let set: BoostRuleSet = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(set)
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_compiles() {
        assert_eq!(BoostTable::default().len(), builtin_rules().rules.len());
    }

    #[test]
    fn multiple_matches_average() {
        let out = BoostTable::default().apply("No cap, this slaps");
        assert_eq!(out.matched.len(), 2);
        assert!((out.boost - 0.4).abs() < 1e-9);
    }

    #[test]
    fn unless_vetoes_match() {
        let t = BoostTable::default();
        assert!((t.apply("this mixtape is fire").boost - 0.4).abs() < 1e-9);
        assert_eq!(t.apply("huge fire sale this weekend").boost, 0.0);
        assert!(t.apply("just what I needed, a flat tire").boost < 0.0);
        assert_eq!(t.apply("just what I needed, so good").boost, 0.0);
    }

    #[test]
    fn curly_apostrophes_match() {
        let out = BoostTable::default().apply("It\u{2019}s fine.");
        assert!((out.boost + 0.2).abs() < 1e-9);
    }

    #[test]
    fn override_file_replaces_table_and_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("rules.json");
        fs::write(
            &good,
            r#"{"rules":[{"name":"x","pattern":"\\bmeh\\b","boost":-0.1}]}"#,
        )
        .unwrap();
        let t = BoostTable::from_optional_path(Some(&good));
        assert_eq!(t.len(), 1);
        assert!((t.apply("meh").boost + 0.1).abs() < 1e-9);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"rules":[{"pattern":"(","boost":1.0}]}"#).unwrap();
        let t = BoostTable::from_optional_path(Some(&bad));
        assert_eq!(t.len(), builtin_rules().rules.len());
    }
}

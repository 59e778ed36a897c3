//! Bounded in-memory store of finished analyses.
//!
//! Harmful (flagged) responses are never stored.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::contract::AnalysisResponse;
use crate::fingerprint::anon_hash;

const MAX_CAPACITY: usize = 100_000;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredAnalysis {
    pub id: String,
    pub stored_at: String,
    #[serde(flatten)]
    pub response: AnalysisResponse,
}

/// Persistence collaborator for router output.
pub trait ResultStore: Send + Sync {
    /// `Ok(true)` when stored, `Ok(false)` when skipped by policy.
    fn save(&self, response: &AnalysisResponse) -> anyhow::Result<bool>;
    /// Up to `limit` most recent entries, oldest first.
    fn recent(&self, limit: usize) -> Vec<StoredAnalysis>;
}

#[derive(Debug)]
pub struct InMemoryHistory {
    inner: Mutex<VecDeque<StoredAnalysis>>,
    cap: usize,
}

impl InMemoryHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.min(MAX_CAPACITY);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap.min(1024))),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<StoredAnalysis>> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl ResultStore for InMemoryHistory {
    fn save(&self, response: &AnalysisResponse) -> anyhow::Result<bool> {
        if response.is_flagged() || self.cap == 0 {
            return Ok(false);
        }
        let entry = StoredAnalysis {
            id: anon_hash(&response.text),
            stored_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            response: response.clone(),
        };
        let mut q = self.lock();
        q.push_back(entry);
        while q.len() > self.cap {
            q.pop_front();
        }
        Ok(true)
    }

    fn recent(&self, limit: usize) -> Vec<StoredAnalysis> {
        let q = self.lock();
        let start = q.len().saturating_sub(limit);
        q.iter().skip(start).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{build_error, ModerationInfo};

    fn resp(text: &str) -> AnalysisResponse {
        build_error(text, "lexicon", "x").with_moderation(ModerationInfo::safe())
    }

    #[test]
    fn oldest_entries_are_dropped() {
        let h = InMemoryHistory::with_capacity(2);
        for t in ["a", "b", "c"] {
            assert!(h.save(&resp(t)).unwrap());
        }
        let texts: Vec<_> = h.recent(10).into_iter().map(|e| e.response.text).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(h.recent(1)[0].response.text, "c");
    }

    #[test]
    fn flagged_responses_are_skipped() {
        let h = InMemoryHistory::with_capacity(10);
        let mut r = resp("bad");
        r.moderation = Some(ModerationInfo {
            flagged: true,
            reason: Some("x".into()),
            severity: "high".into(),
        });
        assert!(!h.save(&r).unwrap());
        assert!(h.is_empty());
    }
}

// tests/remote_cache.rs
//
// Remote scorer over the mock provider: cache hit/miss, fingerprint normalisation,
// LRU eviction, empty input, and every failure turning into an error response.

use std::sync::Arc;

use sentiment_router::ai_adapter::MockProvider;
use sentiment_router::analyze::remote::{RemoteScorer, EMPTY_TEXT_REASONING};
use sentiment_router::analyze::{ModelKind, Scorer};
use sentiment_router::contract::{derive_scores_from_compound, Sentiment, ERROR_REASONING};

const POSITIVE_REPLY: &str = r#"{
    "sentiment": "positive",
    "confidence": 0.92,
    "compound_score": 0.85,
    "emotions": ["joy", "trust"],
    "reasoning": "The words 'love' and 'amazing' express strong approval."
}"#;

fn scorer(provider: &Arc<MockProvider>, capacity: usize) -> RemoteScorer {
    RemoteScorer::new(provider.clone(), capacity)
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let provider = Arc::new(MockProvider::replying(POSITIVE_REPLY).with_model("gpt-4o-mini"));
    let s = scorer(&provider, 200);
    assert_eq!(s.kind(), ModelKind::Remote);

    let first = s.score("I love this!").await;
    let second = s.score("I love this!").await;

    assert_eq!(provider.calls(), 1, "cache hit must not reach the provider");
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.sentiment, Sentiment::Positive);
    assert_eq!(first.model, "gpt-4o-mini");
    assert_eq!(first.scores, derive_scores_from_compound(0.85));
    assert_eq!(first.emotions, vec!["joy", "trust"]);
    assert_eq!(first.scores, second.scores);
    assert_eq!(first.sentiment, second.sentiment);
    assert_eq!(first.emotions, second.emotions);
    assert_eq!(first.reasoning, second.reasoning);
}

#[tokio::test]
async fn case_and_whitespace_variants_share_an_entry() {
    let provider = Arc::new(MockProvider::replying(POSITIVE_REPLY));
    let s = scorer(&provider, 200);

    let a = s.analyze("I love this!").await;
    let b = s.analyze("  i love this!  ").await;

    assert_eq!(provider.calls(), 1);
    assert!(!a.cached);
    assert!(b.cached);
    assert_eq!(b.text, "  i love this!  ", "hit reports the caller's text");
    assert_eq!(s.cache().len(), 1);
}

#[tokio::test]
async fn least_recently_used_entry_is_evicted() {
    let provider = Arc::new(MockProvider::replying(POSITIVE_REPLY));
    let s = scorer(&provider, 2);

    s.analyze("first").await;
    s.analyze("second").await;
    // refresh "first" so "second" is the oldest
    assert!(s.analyze("first").await.cached);
    s.analyze("third").await;
    assert_eq!(provider.calls(), 3);
    assert_eq!(s.cache().len(), 2);

    assert!(s.analyze("first").await.cached);
    assert!(!s.analyze("second").await.cached);
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn empty_text_never_reaches_the_provider() {
    let provider = Arc::new(MockProvider::replying(POSITIVE_REPLY));
    let s = scorer(&provider, 200);

    for text in ["", "   \n\t"] {
        let r = s.analyze(text).await;
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.reasoning, EMPTY_TEXT_REASONING);
        assert!(r.error.is_none());
        assert!(!r.cached);
    }
    assert_eq!(provider.calls(), 0);
    assert!(s.cache().is_empty());
}

#[tokio::test]
async fn unrequested_label_is_coerced_to_neutral() {
    let reply = r#"{"sentiment":"mixed","confidence":0.4,"compound_score":0.1,"emotions":["joy","nostalgia"],"reasoning":"both"}"#;
    let provider = Arc::new(MockProvider::replying(reply));
    let r = scorer(&provider, 200).analyze("bittersweet ending").await;

    assert_eq!(r.sentiment, Sentiment::Neutral);
    assert_eq!(r.emoji, "😐");
    assert_eq!(r.emotions, vec!["joy"]);
    assert_eq!(r.scores, derive_scores_from_compound(0.1));
    assert!(r.error.is_none());
}

#[tokio::test]
async fn fenced_reply_is_accepted() {
    let reply = format!("```json\n{POSITIVE_REPLY}\n```");
    let provider = Arc::new(MockProvider::replying(reply));
    let r = scorer(&provider, 200).analyze("I love this!").await;
    assert_eq!(r.sentiment, Sentiment::Positive);
    assert!(r.error.is_none());
}

#[tokio::test]
async fn malformed_reply_becomes_error_and_is_not_cached() {
    let provider = Arc::new(MockProvider::replying("I think it's positive!"));
    let s = scorer(&provider, 200);

    let r = s.analyze("I love this!").await;
    assert_eq!(r.sentiment, Sentiment::Neutral);
    assert_eq!(r.confidence, 0.0);
    assert_eq!(r.reasoning, ERROR_REASONING);
    assert!(r.error.as_deref().unwrap().contains("parse"));
    assert!(!r.cached);

    // failures are retried on the next request rather than replayed
    s.analyze("I love this!").await;
    assert_eq!(provider.calls(), 2);
    assert!(s.cache().is_empty());
}

#[tokio::test]
async fn provider_failure_becomes_error_response() {
    let provider = Arc::new(MockProvider::failing("rate limited"));
    let r = scorer(&provider, 200).analyze("hello there").await;
    assert_eq!(r.error.as_deref(), Some("rate limited"));
    assert_eq!(r.scores, derive_scores_from_compound(0.0));
}

#[tokio::test]
async fn null_fields_keep_the_verdict() {
    let reply = r#"{"sentiment":"positive","confidence":null,"compound_score":0.7,"emotions":null,"reasoning":null}"#;
    let provider = Arc::new(MockProvider::replying(reply));
    let s = scorer(&provider, 200);

    let r = s.analyze("great service").await;
    assert!(r.error.is_none(), "null fields must not fail: {:?}", r.error);
    assert_eq!(r.sentiment, Sentiment::Positive);
    assert_eq!(r.scores, derive_scores_from_compound(0.7));
    assert_eq!(r.confidence, 0.0);
    assert!(r.emotions.is_empty());
    assert_eq!(r.reasoning, "");
    assert_eq!(s.cache().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_share_one_entry() {
    const TASKS: usize = 8;
    let provider = Arc::new(MockProvider::replying(POSITIVE_REPLY));
    let s = Arc::new(scorer(&provider, 200));

    let handles: Vec<_> = (0..TASKS)
        .map(|i| {
            let s = s.clone();
            // same fingerprint, different surface text
            let text = if i % 2 == 0 { "I love this!" } else { "  i LOVE this!" };
            tokio::spawn(async move { s.analyze(text).await })
        })
        .collect();

    let mut results = Vec::with_capacity(TASKS);
    for h in handles {
        results.push(h.await.unwrap());
    }

    let calls = provider.calls();
    assert!((1..=TASKS).contains(&calls), "provider calls: {calls}");
    assert_eq!(s.cache().len(), 1);
    assert_eq!(results.iter().filter(|r| !r.cached).count(), calls);
    for r in &results {
        assert!(r.error.is_none());
        assert_eq!(r.sentiment, Sentiment::Positive);
        assert_eq!(r.scores, results[0].scores);
        assert_eq!(r.emotions, results[0].emotions);
    }

    assert!(s.analyze("i love this!").await.cached);
    assert_eq!(provider.calls(), calls);
}

// tests/remote_openai_wiremock.rs
//
// OpenAI-compatible provider against a local wiremock server: request shape,
// successful parse, HTTP failures, and the cache keeping repeat texts off the wire.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentiment_router::ai_adapter::{OpenAiProvider, RemoteError};
use sentiment_router::analyze::remote::RemoteScorer;
use sentiment_router::config::ai::AiConfig;
use sentiment_router::contract::Sentiment;

fn cfg(base_url: &str) -> AiConfig {
    AiConfig {
        enabled: true,
        api_key: "sk-test".into(),
        base_url: base_url.into(),
        timeout_secs: 5,
        connect_timeout_secs: 2,
        ..AiConfig::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
}

#[tokio::test]
async fn chat_completion_is_parsed_and_cached() {
    let server = MockServer::start().await;
    let verdict = r#"{"sentiment":"negative","confidence":0.8,"compound_score":-0.6,"emotions":["anger"],"reasoning":"'broke' and 'useless' are negative."}"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(verdict)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::from_config(&cfg(&server.uri())).expect("provider");
    let scorer = RemoteScorer::new(Arc::new(provider), 10);

    let first = scorer.analyze("It broke after a day, useless.").await;
    assert!(first.error.is_none(), "{:?}", first.error);
    assert_eq!(first.sentiment, Sentiment::Negative);
    assert_eq!(first.model, "gpt-4o-mini");
    assert_eq!(first.emotions, vec!["anger"]);
    assert_eq!(first.scores.compound, -0.6);
    assert!(!first.cached);

    let second = scorer.analyze("it broke after a day, useless.").await;
    assert!(second.cached);
    // `expect(1)` is verified when the server drops
}

#[tokio::test]
async fn prompt_carries_system_and_user_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"sentiment":"neutral","confidence":0.5,"compound_score":0.0,"emotions":[],"reasoning":"plain"}"#,
        )))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::from_config(&cfg(&server.uri())).unwrap();
    let scorer = RemoteScorer::new(Arc::new(provider), 10);
    scorer.analyze("The meeting is at noon.").await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"].as_str().unwrap().contains("valid JSON only"));
    assert_eq!(messages[1]["role"], "user");
    assert!(messages[1]["content"]
        .as_str()
        .unwrap()
        .contains("\"The meeting is at noon.\""));
    let t = body["temperature"].as_f64().unwrap();
    assert!(t <= 0.3 + 1e-6, "temperature {t}");
}

#[tokio::test]
async fn http_error_becomes_error_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::from_config(&cfg(&server.uri())).unwrap();
    let scorer = RemoteScorer::new(Arc::new(provider), 10);
    let r = scorer.analyze("anything").await;

    let err = r.error.expect("error set");
    assert!(err.contains("429"), "{err}");
    assert!(err.contains("rate limit exceeded"), "{err}");
    assert_eq!(r.sentiment, Sentiment::Neutral);
    assert!(scorer.cache().is_empty());
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::from_config(&cfg(&server.uri())).unwrap();
    let r = RemoteScorer::new(Arc::new(provider), 10)
        .analyze("anything")
        .await;
    assert_eq!(
        r.error.as_deref(),
        Some(RemoteError::EmptyCompletion.to_string().as_str())
    );
}

#[test]
fn unsupported_provider_is_rejected() {
    let mut c = cfg("http://localhost:9");
    c.provider = "anthropic".into();
    assert!(matches!(
        OpenAiProvider::from_config(&c),
        Err(RemoteError::UnsupportedProvider(_))
    ));
}

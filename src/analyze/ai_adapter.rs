//! AI adapter: remote-model provider abstraction, prompt, and verdict normalization.
//!
//! Providers only move text over the wire and return the raw completion; parsing
//! and normalization live here so every provider gets identical handling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::ai::AiConfig;
use crate::contract::{build_standard, derive_scores_from_compound, AnalysisResponse, Sentiment};

pub const SYSTEM_PROMPT: &str =
    "You are a sentiment analysis expert. Always respond with valid JSON only.";

/// The only emotions the model may report; anything else is dropped.
pub const EMOTION_VOCABULARY: [&str; 8] = [
    "joy",
    "sadness",
    "anger",
    "fear",
    "surprise",
    "disgust",
    "trust",
    "anticipation",
];

const MAX_COMPLETION_TOKENS: u32 = 300;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("missing API key for provider '{0}'")]
    MissingApiKey(String),
    #[error("unsupported remote provider '{0}'")]
    UnsupportedProvider(String),
    #[error("request to remote model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote model returned an empty completion")]
    EmptyCompletion,
    #[error("failed to parse remote model response as JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Low-level provider: one chat completion per call, raw content back.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, RemoteError>;
    fn name(&self) -> &'static str;
    /// Model id reported in responses.
    fn model(&self) -> &str;
}

/// Per-request user prompt. The text is embedded as a JSON string literal so quotes
/// and newlines in user input can't break the instruction.
pub fn build_prompt(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""));
    let vocabulary = EMOTION_VOCABULARY.join(", ");
    format!(
        r#"Analyze the sentiment of the following text and respond with ONLY a valid JSON object.

Text to analyze: {quoted}

Respond with this exact JSON structure:
{{
    "sentiment": "positive" | "negative" | "neutral",
    "confidence": <float between 0.0 and 1.0>,
    "compound_score": <float between -1.0 and 1.0, where -1 is most negative and 1 is most positive>,
    "emotions": [<list of detected emotions from: {vocabulary}>],
    "reasoning": "<one or two sentences explaining why you classified it this way>"
}}

Important:
- Return ONLY the JSON object, no other text
- sentiment must be exactly one of: positive, negative, neutral
- compound_score should reflect nuance (e.g. mild positive = 0.3, strong positive = 0.9)
- emotions list should only include emotions from the list above that are clearly present
- reasoning should mention specific words or phrases that influenced your decision"#
    )
}

/// The model's answer as sent. Missing or `null` keys are `None`; wrong types are a parse error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RemoteVerdict {
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub compound_score: Option<f64>,
    #[serde(default)]
    pub emotions: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Parse a completion, tolerating a Markdown code fence around the object.
pub fn parse_verdict(raw: &str) -> Result<RemoteVerdict, RemoteError> {
    let trimmed = strip_code_fence(raw.trim());
    if trimmed.is_empty() {
        return Err(RemoteError::EmptyCompletion);
    }
    Ok(serde_json::from_str(trimmed)?)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

impl RemoteVerdict {
    /// Coerce into the contract: unknown labels become neutral, the compound is
    /// expanded into the full breakdown, emotions are filtered to the vocabulary.
    /// Absent fields fall back to neutral, zero, or empty.
    pub fn into_response(self, text: &str, model: &str) -> AnalysisResponse {
        let label = self.sentiment.unwrap_or_default();
        let sentiment = match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        };

        let mut emotions: Vec<String> = Vec::new();
        for e in self.emotions.into_iter().flatten().flatten() {
            let e = e.trim().to_lowercase();
            if EMOTION_VOCABULARY.contains(&e.as_str()) && !emotions.contains(&e) {
                emotions.push(e);
            }
        }

        build_standard(
            text,
            sentiment,
            derive_scores_from_compound(self.compound_score.unwrap_or(0.0)),
            self.confidence.unwrap_or(0.0),
            model,
            Some(emotions),
            Some(self.reasoning.unwrap_or_default().trim().to_string()),
            false,
            None,
        )
    }
}

// ------------------------------------------------------------
// OpenAI-compatible chat completions
// ------------------------------------------------------------

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
}

impl OpenAiProvider {
    /// Fails once, here, if the key is missing or the client can't be built.
    pub fn from_config(cfg: &AiConfig) -> Result<Self, RemoteError> {
        if cfg.provider != "openai" {
            return Err(RemoteError::UnsupportedProvider(cfg.provider.clone()));
        }
        let api_key = cfg
            .resolved_api_key()
            .ok_or_else(|| RemoteError::MissingApiKey(cfg.provider.clone()))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("sentiment-router/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: cfg.model.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url),
            temperature: cfg.temperature,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, RemoteError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: MAX_COMPLETION_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let body: Resp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(RemoteError::EmptyCompletion)
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ------------------------------------------------------------
// Mock provider (tests, local runs with AI_TEST_MODE=mock)
// ------------------------------------------------------------

/// Replies with a fixed completion (or a fixed failure) and counts calls.
pub struct MockProvider {
    reply: Result<String, String>,
    model: String,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn replying(content: impl Into<String>) -> Self {
        Self {
            reply: Ok(content.into()),
            model: "mock-llm".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            model: "mock-llm".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A well-formed neutral verdict.
    pub fn neutral() -> Self {
        Self::replying(
            r#"{"sentiment":"neutral","confidence":0.5,"compound_score":0.0,"emotions":[],"reasoning":"Neutral hint (mock)"}"#,
        )
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(RemoteError::Other)
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::analyze::{AnalyzerRouter, ModelKind};
use crate::contract::AnalysisResponse;
use crate::fingerprint::anon_hash;
use crate::history::{ResultStore, StoredAnalysis};
use crate::metrics::Metrics;

pub const SERVICE_NAME: &str = "sentiment-router";
pub const CACHE_HEADER: &str = "x-analysis-cache";
const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: AnalyzerRouter,
    pub history: Arc<dyn ResultStore>,
    pub max_text_chars: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/analyze", post(analyze))
        .route("/history", get(history))
        .with_state(state)
        .merge(Metrics::init().router())
        .layer(CorsLayer::very_permissive())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeReq {
    pub text: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResp {
    #[serde(flatten)]
    pub analysis: AnalysisResponse,
    pub timestamp: String,
    pub saved_to_db: bool,
}

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Body(JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Body(r) => (r.status(), r.body_text()),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let models: Vec<&str> = ModelKind::ALL.iter().map(|m| m.as_str()).collect();
    Json(json!({
        "default": state.analyzer.default_model().as_str(),
        "models": models,
    }))
}

fn validate_text(text: &str, max_chars: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation("text must not be empty".into()));
    }
    let n = text.chars().count();
    if n > max_chars {
        return Err(ApiError::Validation(format!(
            "text is too long ({n} characters, max {max_chars})"
        )));
    }
    Ok(())
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(ApiError::Body)?;
    validate_text(&req.text, state.max_text_chars)?;

    let requested = req
        .model
        .unwrap_or_else(|| state.analyzer.default_model().as_str().to_string());
    let analysis = state.analyzer.analyze(&req.text, &requested).await;

    let saved_to_db = match state.history.save(&analysis) {
        Ok(saved) => saved,
        Err(e) => {
            warn!(id = %anon_hash(&req.text), error = %e, "history save failed");
            false
        }
    };

    let cache = if analysis.cached { "HIT" } else { "MISS" };
    let out = AnalyzeResp {
        analysis,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        saved_to_db,
    };
    let mut resp = Json(out).into_response();
    resp.headers_mut().insert(
        HeaderName::from_static(CACHE_HEADER),
        HeaderValue::from_static(cache),
    );
    Ok(resp)
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryParams>,
) -> Json<Vec<StoredAnalysis>> {
    Json(state.history.recent(q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)))
}

//! REST endpoints: `/`, `/health`, `/ask`, `/explain`.
//!
//! Request validation happens here, before anything reaches the pipeline;
//! pipeline failures come back as HTTP 400 with the failure message, never as
//! a server fault.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlgate_core::Gateway;
use sqlgate_error::GateError;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

const MAX_ASK_ROW_LIMIT: i64 = 10_000;
const MAX_EXPLAIN_ROW_LIMIT: i64 = 1_000;

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/explain", post(explain))
        .with_state(gateway)
}

/// Client-side failure carrying the pipeline's message, FastAPI-style
/// `{"detail": ...}` shape.
struct ApiError(String);

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        ApiError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "detail": self.0 }))).into_response()
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "sqlgate - natural language to SQL gateway",
        "version": API_VERSION,
        "endpoints": ["/health", "/ask", "/explain"],
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AskBody {
    pub question: String,
    #[serde(default)]
    pub row_limit: Option<i64>,
}

async fn ask(
    State(gateway): State<Arc<Gateway>>,
    Json(body): Json<AskBody>,
) -> Result<Json<sqlgate_core::AskResponse>, ApiError> {
    if body.question.trim().is_empty() {
        return Err(ApiError("question must not be empty".to_string()));
    }
    if let Some(limit) = body.row_limit {
        if !(1..=MAX_ASK_ROW_LIMIT).contains(&limit) {
            return Err(ApiError(format!(
                "row_limit must be between 1 and {MAX_ASK_ROW_LIMIT}"
            )));
        }
    }

    let response = gateway.ask(&body.question, body.row_limit).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ExplainBody {
    pub sql: String,
    #[serde(default)]
    pub row_limit: Option<i64>,
}

async fn explain(
    State(gateway): State<Arc<Gateway>>,
    Json(body): Json<ExplainBody>,
) -> Result<Json<sqlgate_core::ExplainReport>, ApiError> {
    if body.sql.trim().is_empty() {
        return Err(ApiError("sql must not be empty".to_string()));
    }
    if let Some(limit) = body.row_limit {
        if !(1..=MAX_EXPLAIN_ROW_LIMIT).contains(&limit) {
            return Err(ApiError(format!(
                "row_limit must be between 1 and {MAX_EXPLAIN_ROW_LIMIT}"
            )));
        }
    }

    let report = gateway.explain(&body.sql, body.row_limit).await?;
    Ok(Json(report))
}

//! Router tests that run without a database.
//!
//! The connection pool is lazy, so any request rejected before execution
//! (input validation, sanitizer failures) can be exercised against a gateway
//! pointed at an unreachable address.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlgate_core::{AppConfig, SqlGenerator};
use sqlgate_error::Result;
use sqlgate_server::{build_gateway, router};
use tower::util::ServiceExt;

struct DdlGenerator;

#[async_trait]
impl SqlGenerator for DdlGenerator {
    async fn generate(&self, _question: &str) -> Result<String> {
        Ok("DROP TABLE customers".to_string())
    }
}

fn test_router(generator: Option<Arc<dyn SqlGenerator>>) -> axum::Router {
    let mut config = AppConfig::default();
    // Reserved TEST-NET address: never routable, and never dialed by the
    // requests these tests make anyway.
    config.readonly_url = Some("postgres://nobody@192.0.2.1:5432/none".to_string());
    let gateway = build_gateway(&config, generator).unwrap();
    router(gateway)
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_liveness_with_timestamp() {
    let app = test_router(None);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn root_lists_endpoints() {
    let app = test_router(None);
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let endpoints: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(endpoints, vec!["/health", "/ask", "/explain"]);
}

#[tokio::test]
async fn empty_question_is_rejected_before_the_pipeline() {
    let app = test_router(None);
    let (status, body) = post_json(app, "/ask", json!({ "question": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("question"));
}

#[tokio::test]
async fn out_of_range_row_limits_are_rejected() {
    for limit in [0, -5, 10_001] {
        let app = test_router(None);
        let (status, body) =
            post_json(app, "/ask", json!({ "question": "list customers", "row_limit": limit }))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted row_limit={limit}");
        assert!(body["detail"].as_str().unwrap().contains("row_limit"));
    }

    // Explain has a tighter ceiling.
    let app = test_router(None);
    let (status, _) =
        post_json(app, "/explain", json!({ "sql": "SELECT 1", "row_limit": 2000 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_sql_is_rejected_before_the_pipeline() {
    let app = test_router(None);
    let (status, body) = post_json(app, "/explain", json!({ "sql": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("sql"));
}

#[tokio::test]
async fn sanitizer_rejection_surfaces_as_client_error() {
    // The stub translator is swapped for one that emits DDL; the sanitizer
    // must stop it before any connection is attempted.
    let app = test_router(Some(Arc::new(DdlGenerator)));
    let (status, body) = post_json(app, "/ask", json!({ "question": "drop it all" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("SQLGATE-1003"), "unexpected detail: {detail}");
}

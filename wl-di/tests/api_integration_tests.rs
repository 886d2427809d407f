//! HTTP API integration tests
//!
//! Drives the axum router directly with tower's oneshot, verifying status
//! codes and error body shapes at the HTTP boundary.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use wl_di::models::DuplicateStrategy;
use wl_di::AppState;

async fn test_app() -> (Router, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    wl_di::db::init_tables(&pool).await.unwrap();
    let app = wl_di::build_router(AppState::new(pool.clone()));
    (app, pool)
}

fn import_request(query: &str, content_type: &str, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/import?{}", query))
        .header("content-type", content_type)
        .body(Body::from(body.to_vec()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

const CSV: &[u8] = b"type,name,code,status\nproject,Alpha,PROJ-1,active\n";

#[tokio::test]
async fn import_returns_summary() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(import_request("owner_email=owner%40example.com", "text/csv", CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["ok"], Value::Bool(true));
    assert_eq!(body["projects"], 1);
    assert_eq!(body["tasks"], 0);
    assert_eq!(body["idempotent"], Value::Bool(false));
}

#[tokio::test]
async fn second_identical_upload_is_idempotent() {
    let (app, _pool) = test_app().await;

    let first = app
        .clone()
        .oneshot(import_request("owner_email=owner%40example.com", "text/csv", CSV))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(import_request("owner_email=owner%40example.com", "text/csv", CSV))
        .await
        .unwrap();
    let body = json_body(second).await;
    assert_eq!(body["idempotent"], Value::Bool(true));
    assert_eq!(body["projects"], 1);
}

#[tokio::test]
async fn strict_fail_conflict_maps_to_409_with_duplicate_count() {
    let (app, _pool) = test_app().await;

    let csv = b"name,project_id\nTask A,prj-1\nTask A,prj-1\n";
    let response = app
        .oneshot(import_request(
            "owner_email=owner%40example.com&duplicate_strategy=strict-fail",
            "text/csv",
            csv,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["duplicateRowsInPayload"], 1);
}

#[tokio::test]
async fn unsupported_mime_maps_to_format_error() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(import_request(
            "owner_email=owner%40example.com",
            "application/octet-stream",
            b"\x00\x01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FORMAT_ERROR");
}

#[tokio::test]
async fn schema_violation_maps_to_422() {
    let (app, _pool) = test_app().await;

    let json = br#"[{"type":"task","title":"Overeager","priority":99}]"#;
    let response = app
        .oneshot(import_request(
            "owner_email=owner%40example.com",
            "application/json",
            json,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SCHEMA_VIOLATION");
}

#[tokio::test]
async fn unknown_strategy_maps_to_400() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(import_request(
            "owner_email=owner%40example.com&duplicate_strategy=merge",
            "text/csv",
            CSV,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn missing_content_type_is_rejected() {
    let (app, _pool) = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/import?owner_email=owner%40example.com")
        .body(Body::from(CSV.to_vec()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_lookup_returns_the_ledger_record() {
    let (app, _pool) = test_app().await;

    let response = app
        .clone()
        .oneshot(import_request("owner_email=owner%40example.com", "text/csv", CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let key = wl_di::services::idempotency::run_key(
        CSV,
        DuplicateStrategy::SkipDuplicates,
        "owner@example.com",
    );
    let lookup = app
        .oneshot(
            Request::builder()
                .uri(format!("/import/runs/{}", key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(lookup.status(), StatusCode::OK);

    let body = json_body(lookup).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["projects"], 1);
    assert_eq!(body["ownerEmail"], "owner@example.com");
}

#[tokio::test]
async fn unknown_run_key_is_404() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/import/runs/deadbeef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wl-di");
}

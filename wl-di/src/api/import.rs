//! Import API handlers
//!
//! POST /import uploads a file for ingestion; GET /import/runs/{key}
//! exposes the ledger record for a content fingerprint.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{ImportSummary, IngestionRun};
use crate::services::{ImportRequest, ImportService};
use crate::AppState;

/// POST /import query parameters
#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub owner_email: String,
    pub file_name: Option<String>,
    pub duplicate_strategy: Option<String>,
}

/// GET /import/runs/{key} response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub key: String,
    pub owner_email: String,
    pub format: String,
    pub duplicate_strategy: String,
    pub file_hash: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub status: String,
    pub total_rows: i64,
    pub projects: i64,
    pub tasks: i64,
    pub skipped: i64,
    pub duplicate_rows_in_payload: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<IngestionRun> for RunResponse {
    fn from(run: IngestionRun) -> Self {
        Self {
            key: run.key,
            owner_email: run.owner_email,
            format: run.format,
            duplicate_strategy: run.duplicate_strategy.as_str().to_string(),
            file_hash: run.file_hash,
            file_name: run.file_name,
            mime_type: run.mime_type,
            status: run.status.as_str().to_string(),
            total_rows: run.totals.total_rows,
            projects: run.totals.projects,
            tasks: run.totals.tasks,
            skipped: run.totals.skipped,
            duplicate_rows_in_payload: run.totals.duplicate_rows_in_payload,
            error: run.error,
            created_at: run.created_at,
            completed_at: run.completed_at,
            updated_at: run.updated_at,
        }
    }
}

/// POST /import
///
/// The request body is the raw file; the Content-Type header selects the
/// parser. Returns the import summary, replayed from the ledger when the
/// identical upload was already completed.
pub async fn import_file(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ImportSummary>> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Content-Type header".to_string()))?
        .to_string();

    if params.owner_email.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "owner_email must be non-empty".to_string(),
        ));
    }

    tracing::info!(
        owner_email = %params.owner_email,
        file_name = params.file_name.as_deref().unwrap_or("-"),
        mime_type = %mime_type,
        bytes = body.len(),
        "Import upload received"
    );

    let service = ImportService::new(state.db.clone());
    let summary = service
        .import(ImportRequest {
            bytes: body.to_vec(),
            mime_type,
            owner_email: params.owner_email,
            file_name: params.file_name,
            duplicate_strategy: params.duplicate_strategy,
        })
        .await
        .map_err(ApiError::from)?;

    Ok(Json(summary))
}

/// GET /import/runs/{key}
pub async fn get_run(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<RunResponse>> {
    let run = db::runs::find_by_key(&state.db, &key)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("Ingestion run not found: {}", key)))?;

    Ok(Json(run.into()))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import", post(import_file))
        .route("/import/runs/:key", get(get_run))
}

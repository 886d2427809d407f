//! Ingestion run records and import summaries
//!
//! An ingestion run is the persisted record of one content-addressed import
//! attempt. Runs progress `processing` -> `completed` | `failed`, and the
//! terminal transition happens exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Duplicate-handling policy for rows colliding on natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateStrategy {
    SkipDuplicates,
    UpdateOnMatch,
    StrictFail,
}

impl DuplicateStrategy {
    /// Parse a strategy string (trimmed, case-insensitive).
    /// None for unrecognized input - callers decide whether that is an error.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "skip-duplicates" => Some(DuplicateStrategy::SkipDuplicates),
            "update-on-match" => Some(DuplicateStrategy::UpdateOnMatch),
            "strict-fail" => Some(DuplicateStrategy::StrictFail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateStrategy::SkipDuplicates => "skip-duplicates",
            DuplicateStrategy::UpdateOnMatch => "update-on-match",
            DuplicateStrategy::StrictFail => "strict-fail",
        }
    }
}

impl Default for DuplicateStrategy {
    fn default() -> Self {
        DuplicateStrategy::SkipDuplicates
    }
}

/// Ingestion run lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(RunStatus::Processing),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Row totals accumulated over one import attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub total_rows: i64,
    pub projects: i64,
    pub tasks: i64,
    pub skipped: i64,
    pub duplicate_rows_in_payload: i64,
}

/// Persisted record of one content-addressed import attempt
#[derive(Debug, Clone)]
pub struct IngestionRun {
    /// Content fingerprint: hash(file bytes, strategy, owner email). Unique.
    pub key: String,
    pub owner_email: String,
    pub format: String,
    pub duplicate_strategy: DuplicateStrategy,
    /// Hash of the raw file bytes alone
    pub file_hash: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub status: RunStatus,
    pub totals: RunTotals,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl IngestionRun {
    /// Create a fresh run in `processing` state
    #[allow(clippy::too_many_arguments)]
    pub fn processing(
        key: String,
        owner_email: String,
        format: String,
        duplicate_strategy: DuplicateStrategy,
        file_hash: String,
        file_name: Option<String>,
        mime_type: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            key,
            owner_email,
            format,
            duplicate_strategy,
            file_hash,
            file_name,
            mime_type,
            status: RunStatus::Processing,
            totals: RunTotals::default(),
            error: None,
            created_at: now,
            completed_at: None,
            updated_at: now,
        }
    }
}

/// Import response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub ok: bool,
    pub message: String,
    pub projects: i64,
    pub tasks: i64,
    pub skipped: i64,
    pub duplicate_rows_in_payload: i64,
    /// True when the response was replayed from a previously completed run
    pub idempotent: bool,
}

impl ImportSummary {
    /// Summary for a freshly completed import
    pub fn completed(totals: &RunTotals) -> Self {
        Self {
            ok: true,
            message: format!(
                "Imported {} project(s) and {} task(s) ({} skipped)",
                totals.projects, totals.tasks, totals.skipped
            ),
            projects: totals.projects,
            tasks: totals.tasks,
            skipped: totals.skipped,
            duplicate_rows_in_payload: totals.duplicate_rows_in_payload,
            idempotent: false,
        }
    }

    /// Summary replayed from a previously completed run
    pub fn replayed(run: &IngestionRun) -> Self {
        Self {
            ok: true,
            message: "Duplicate upload detected; returning previously completed import".to_string(),
            projects: run.totals.projects,
            tasks: run.totals.tasks,
            skipped: run.totals.skipped,
            duplicate_rows_in_payload: run.totals.duplicate_rows_in_payload,
            idempotent: true,
        }
    }
}

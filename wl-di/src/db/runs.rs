//! Ingestion run store
//!
//! The ledger's persistence layer. The run key is the table's primary key,
//! so two concurrent uploads of identical content cannot both create a
//! `processing` record - the loser sees a unique-constraint violation and
//! resolves it at the ledger level.

use chrono::{DateTime, Utc};
use sqlx::{Row as SqlxRow, SqlitePool};
use wl_common::{Error, Result};

use crate::models::{DuplicateStrategy, IngestionRun, RunStatus, RunTotals};

/// Outcome of attempting to claim a run key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The processing record was created; this request owns the run
    Created,
    /// Another run already holds this key
    KeyExists,
}

/// Load a run by its content fingerprint
pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<IngestionRun>> {
    let row = sqlx::query(
        r#"
        SELECT key, owner_email, format, duplicate_strategy, file_hash, file_name, mime_type,
               status, total_rows, projects, tasks, skipped, duplicate_rows_in_payload,
               error, created_at, completed_at, updated_at
        FROM ingestion_runs
        WHERE key = ?
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    row.map(run_from_row).transpose()
}

/// Insert a fresh `processing` run. A unique-constraint violation maps to
/// `KeyExists` instead of an error.
pub async fn insert_processing(pool: &SqlitePool, run: &IngestionRun) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO ingestion_runs
            (key, owner_email, format, duplicate_strategy, file_hash, file_name, mime_type,
             status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'processing', ?, ?)
        "#,
    )
    .bind(&run.key)
    .bind(&run.owner_email)
    .bind(&run.format)
    .bind(run.duplicate_strategy.as_str())
    .bind(&run.file_hash)
    .bind(&run.file_name)
    .bind(&run.mime_type)
    .bind(run.created_at.to_rfc3339())
    .bind(run.updated_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(InsertOutcome::Created),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Ok(InsertOutcome::KeyExists)
        }
        Err(e) => Err(e.into()),
    }
}

/// Atomically reclaim a previously failed run back to `processing`.
/// Returns false when the run is no longer in `failed` state (a concurrent
/// request claimed it first).
pub async fn reclaim_failed(pool: &SqlitePool, run: &IngestionRun) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE ingestion_runs
        SET status = 'processing', error = NULL, file_name = ?, mime_type = ?,
            total_rows = 0, projects = 0, tasks = 0, skipped = 0, duplicate_rows_in_payload = 0,
            completed_at = NULL, updated_at = ?
        WHERE key = ? AND status = 'failed'
        "#,
    )
    .bind(&run.file_name)
    .bind(&run.mime_type)
    .bind(Utc::now().to_rfc3339())
    .bind(&run.key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Finalize a run as `completed` with its totals
pub async fn mark_completed(pool: &SqlitePool, key: &str, totals: &RunTotals) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE ingestion_runs
        SET status = 'completed', total_rows = ?, projects = ?, tasks = ?, skipped = ?,
            duplicate_rows_in_payload = ?, error = NULL, completed_at = ?, updated_at = ?
        WHERE key = ?
        "#,
    )
    .bind(totals.total_rows)
    .bind(totals.projects)
    .bind(totals.tasks)
    .bind(totals.skipped)
    .bind(totals.duplicate_rows_in_payload)
    .bind(&now)
    .bind(&now)
    .bind(key)
    .execute(pool)
    .await?;

    Ok(())
}

/// Finalize a run as `failed` with an error summary and whatever totals were
/// known at the point of failure
pub async fn mark_failed(
    pool: &SqlitePool,
    key: &str,
    error: &str,
    totals: &RunTotals,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE ingestion_runs
        SET status = 'failed', total_rows = ?, projects = ?, tasks = ?, skipped = ?,
            duplicate_rows_in_payload = ?, error = ?, completed_at = ?, updated_at = ?
        WHERE key = ?
        "#,
    )
    .bind(totals.total_rows)
    .bind(totals.projects)
    .bind(totals.tasks)
    .bind(totals.skipped)
    .bind(totals.duplicate_rows_in_payload)
    .bind(error)
    .bind(&now)
    .bind(&now)
    .bind(key)
    .execute(pool)
    .await?;

    Ok(())
}

fn run_from_row(row: sqlx::sqlite::SqliteRow) -> Result<IngestionRun> {
    let strategy_str: String = row.get("duplicate_strategy");
    let duplicate_strategy = DuplicateStrategy::parse(&strategy_str).ok_or_else(|| {
        Error::Internal(format!("Invalid duplicate strategy in database: {}", strategy_str))
    })?;

    let status_str: String = row.get("status");
    let status = RunStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Invalid run status in database: {}", status_str)))?;

    Ok(IngestionRun {
        key: row.get("key"),
        owner_email: row.get("owner_email"),
        format: row.get("format"),
        duplicate_strategy,
        file_hash: row.get("file_hash"),
        file_name: row.get("file_name"),
        mime_type: row.get("mime_type"),
        status,
        totals: RunTotals {
            total_rows: row.get("total_rows"),
            projects: row.get("projects"),
            tasks: row.get("tasks"),
            skipped: row.get("skipped"),
            duplicate_rows_in_payload: row.get("duplicate_rows_in_payload"),
        },
        error: row.get("error"),
        created_at: parse_timestamp(row.get("created_at"))?,
        completed_at: row
            .get::<Option<String>, _>("completed_at")
            .map(parse_timestamp)
            .transpose()?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp in database: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn sample_run(key: &str) -> IngestionRun {
        IngestionRun::processing(
            key.to_string(),
            "owner@example.com".to_string(),
            "csv".to_string(),
            DuplicateStrategy::SkipDuplicates,
            "filehash".to_string(),
            Some("upload.csv".to_string()),
            Some("text/csv".to_string()),
        )
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let pool = setup_test_db().await;
        let run = sample_run("key-1");

        assert_eq!(
            insert_processing(&pool, &run).await.unwrap(),
            InsertOutcome::Created
        );

        let loaded = find_by_key(&pool, "key-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Processing);
        assert_eq!(loaded.owner_email, "owner@example.com");
        assert_eq!(loaded.duplicate_strategy, DuplicateStrategy::SkipDuplicates);
    }

    #[tokio::test]
    async fn duplicate_key_insert_reports_key_exists() {
        let pool = setup_test_db().await;
        let run = sample_run("key-1");

        insert_processing(&pool, &run).await.unwrap();
        assert_eq!(
            insert_processing(&pool, &run).await.unwrap(),
            InsertOutcome::KeyExists
        );
    }

    #[tokio::test]
    async fn mark_completed_persists_totals() {
        let pool = setup_test_db().await;
        insert_processing(&pool, &sample_run("key-1")).await.unwrap();

        let totals = RunTotals {
            total_rows: 4,
            projects: 1,
            tasks: 2,
            skipped: 1,
            duplicate_rows_in_payload: 0,
        };
        mark_completed(&pool, "key-1", &totals).await.unwrap();

        let loaded = find_by_key(&pool, "key-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
        assert_eq!(loaded.totals, totals);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn reclaim_only_succeeds_for_failed_runs() {
        let pool = setup_test_db().await;
        let run = sample_run("key-1");
        insert_processing(&pool, &run).await.unwrap();

        // Still processing: not reclaimable
        assert!(!reclaim_failed(&pool, &run).await.unwrap());

        mark_failed(&pool, "key-1", "boom", &RunTotals::default())
            .await
            .unwrap();
        assert!(reclaim_failed(&pool, &run).await.unwrap());

        let loaded = find_by_key(&pool, "key-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Processing);
        assert!(loaded.error.is_none());
    }
}

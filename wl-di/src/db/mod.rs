//! Database access for wl-di
//!
//! Table bootstrap plus the project, task, and ingestion-run stores.

pub mod projects;
pub mod runs;
pub mod tasks;

use sqlx::SqlitePool;
use wl_common::Result;

/// Initialize wl-di specific tables
///
/// Creates projects, tasks, and ingestion_runs tables if they don't exist.
/// The ingestion run key is the table's primary key, so concurrent inserts
/// of the same content fingerprint are rejected by the store itself.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            guid TEXT PRIMARY KEY,
            code TEXT UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'planned',
            priority INTEGER NOT NULL DEFAULT 3,
            due_at TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'todo',
            priority INTEGER NOT NULL DEFAULT 3,
            due_at TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            project_code TEXT,
            project_guid TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingestion_runs (
            key TEXT PRIMARY KEY,
            owner_email TEXT NOT NULL,
            format TEXT NOT NULL,
            duplicate_strategy TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            file_name TEXT,
            mime_type TEXT,
            status TEXT NOT NULL DEFAULT 'processing',
            total_rows INTEGER NOT NULL DEFAULT 0,
            projects INTEGER NOT NULL DEFAULT 0,
            tasks INTEGER NOT NULL DEFAULT 0,
            skipped INTEGER NOT NULL DEFAULT 0,
            duplicate_rows_in_payload INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_name ON tasks(name)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (projects, tasks, ingestion_runs)");

    Ok(())
}

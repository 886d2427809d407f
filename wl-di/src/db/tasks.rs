//! Task store operations
//!
//! Duplicate-matching lookups by (name, project reference) and transactional
//! bulk writes. Task operations bind the parent project's guid, resolved by
//! the caller after the project batch has committed.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use wl_common::{Error, Result};

use crate::models::TaskRow;

/// Existing task record, as much of it as duplicate matching needs
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub guid: Uuid,
    pub name: String,
    pub project_code: Option<String>,
}

/// One entry in a task bulk-write batch
#[derive(Debug, Clone)]
pub enum TaskOp {
    Insert(TaskRow),
    Update { guid: Uuid, row: TaskRow },
}

impl TaskOp {
    pub fn row(&self) -> &TaskRow {
        match self {
            TaskOp::Insert(row) => row,
            TaskOp::Update { row, .. } => row,
        }
    }
}

/// Load existing tasks whose name matches any of the given names.
/// The caller pair-matches on (name, project_code).
pub async fn find_by_names(pool: &SqlitePool, names: &[String]) -> Result<Vec<TaskRecord>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!(
        "SELECT guid, name, project_code FROM tasks WHERE name IN ({})",
        placeholders
    );

    let mut query = sqlx::query_as::<_, (String, String, Option<String>)>(&sql);
    for name in names {
        query = query.bind(name);
    }

    let rows = query.fetch_all(pool).await?;
    rows.into_iter()
        .map(|(guid, name, project_code)| {
            let guid = Uuid::parse_str(&guid)
                .map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))?;
            Ok(TaskRecord {
                guid,
                name,
                project_code,
            })
        })
        .collect()
}

/// Submit a task batch as one bulk call, all operations in one transaction.
/// `project_guids` maps referenced project codes to store identifiers.
pub async fn bulk_write(
    pool: &SqlitePool,
    ops: &[TaskOp],
    project_guids: &HashMap<String, Uuid>,
) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for op in ops {
        let project_guid = op
            .row()
            .project_code
            .as_ref()
            .and_then(|code| project_guids.get(code))
            .map(|guid| guid.to_string());

        match op {
            TaskOp::Insert(row) => {
                sqlx::query(
                    r#"
                    INSERT INTO tasks (guid, name, description, status, priority, due_at, tags, project_code, project_guid, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&row.name)
                .bind(&row.description)
                .bind(row.status.as_str())
                .bind(row.priority as i64)
                .bind(row.due_at.map(|d| d.to_rfc3339()))
                .bind(tags_json(&row.tags)?)
                .bind(&row.project_code)
                .bind(project_guid)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
            TaskOp::Update { guid, row } => {
                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET description = ?, status = ?, priority = ?, due_at = ?, tags = ?, project_guid = ?, updated_at = ?
                    WHERE guid = ?
                    "#,
                )
                .bind(&row.description)
                .bind(row.status.as_str())
                .bind(row.priority as i64)
                .bind(row.due_at.map(|d| d.to_rfc3339()))
                .bind(tags_json(&row.tags)?)
                .bind(project_guid)
                .bind(&now)
                .bind(guid.to_string())
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;

    tracing::debug!(operations = ops.len(), "Task bulk write committed");

    Ok(())
}

fn tags_json(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags)
        .map_err(|e| Error::Internal(format!("Failed to serialize tags: {}", e)))
}

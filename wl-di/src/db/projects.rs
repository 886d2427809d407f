//! Project store operations
//!
//! Duplicate-matching lookups by natural key (code) and transactional bulk
//! writes. Tag lists are stored as JSON text.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use wl_common::{Error, Result};

use crate::models::ProjectRow;

/// Existing project record, as much of it as duplicate matching needs
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub guid: Uuid,
    pub code: Option<String>,
    pub name: String,
}

/// One entry in a project bulk-write batch
#[derive(Debug, Clone)]
pub enum ProjectOp {
    Insert(ProjectRow),
    Update { guid: Uuid, row: ProjectRow },
}

/// Load existing projects whose code matches any of the given natural keys
pub async fn find_by_codes(pool: &SqlitePool, codes: &[String]) -> Result<Vec<ProjectRecord>> {
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; codes.len()].join(", ");
    let sql = format!(
        "SELECT guid, code, name FROM projects WHERE code IN ({})",
        placeholders
    );

    let mut query = sqlx::query_as::<_, (String, Option<String>, String)>(&sql);
    for code in codes {
        query = query.bind(code);
    }

    let rows = query.fetch_all(pool).await?;
    rows.into_iter()
        .map(|(guid, code, name)| {
            let guid = Uuid::parse_str(&guid)
                .map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))?;
            Ok(ProjectRecord { guid, code, name })
        })
        .collect()
}

/// Resolve store identifiers for the given project codes
pub async fn guids_for_codes(
    pool: &SqlitePool,
    codes: &[String],
) -> Result<HashMap<String, Uuid>> {
    let mut map = HashMap::new();
    for record in find_by_codes(pool, codes).await? {
        if let Some(code) = record.code {
            map.insert(code, record.guid);
        }
    }
    Ok(map)
}

/// Submit a project batch as one bulk call, all operations in one transaction
pub async fn bulk_write(pool: &SqlitePool, ops: &[ProjectOp]) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for op in ops {
        match op {
            ProjectOp::Insert(row) => {
                sqlx::query(
                    r#"
                    INSERT INTO projects (guid, code, name, description, status, priority, due_at, tags, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&row.code)
                .bind(&row.name)
                .bind(&row.description)
                .bind(row.status.as_str())
                .bind(row.priority as i64)
                .bind(row.due_at.map(|d| d.to_rfc3339()))
                .bind(tags_json(&row.tags)?)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
            ProjectOp::Update { guid, row } => {
                sqlx::query(
                    r#"
                    UPDATE projects
                    SET name = ?, description = ?, status = ?, priority = ?, due_at = ?, tags = ?, updated_at = ?
                    WHERE guid = ?
                    "#,
                )
                .bind(&row.name)
                .bind(&row.description)
                .bind(row.status.as_str())
                .bind(row.priority as i64)
                .bind(row.due_at.map(|d| d.to_rfc3339()))
                .bind(tags_json(&row.tags)?)
                .bind(&now)
                .bind(guid.to_string())
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;

    tracing::debug!(operations = ops.len(), "Project bulk write committed");

    Ok(())
}

fn tags_json(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags)
        .map_err(|e| Error::Internal(format!("Failed to serialize tags: {}", e)))
}

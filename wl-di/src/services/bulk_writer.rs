//! Bulk persistence
//!
//! Submits the two operation batches built by the resolver. The project
//! batch commits first; referenced project guids are then resolved by code
//! (covering projects created moments ago in the same import) and bound
//! into the task batch.

use std::collections::BTreeSet;

use sqlx::SqlitePool;

use crate::db;
use crate::error::ImportError;
use crate::services::duplicate_resolver::ResolvedBatch;

pub struct BulkWriter {
    db: SqlitePool,
}

impl BulkWriter {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Execute both batches. Task operations wait for the project batch -
    /// a read-after-write dependency on newly created project records.
    pub async fn persist(&self, batch: &ResolvedBatch) -> Result<(), ImportError> {
        db::projects::bulk_write(&self.db, &batch.project_ops).await?;

        let referenced_codes: Vec<String> = batch
            .task_ops
            .iter()
            .filter_map(|op| op.row().project_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let project_guids = db::projects::guids_for_codes(&self.db, &referenced_codes).await?;

        db::tasks::bulk_write(&self.db, &batch.task_ops, &project_guids).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::projects::ProjectOp;
    use crate::db::tasks::TaskOp;
    use crate::models::{ProjectRow, ProjectStatus, TaskRow, TaskStatus};
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

    #[tokio::test]
    async fn tasks_link_to_projects_created_in_the_same_import() {
        let pool = setup_test_db().await;
        let writer = BulkWriter::new(pool.clone());

        let batch = ResolvedBatch {
            project_ops: vec![ProjectOp::Insert(ProjectRow {
                name: "Alpha".to_string(),
                description: None,
                status: ProjectStatus::Active,
                priority: 3,
                due_at: None,
                tags: Vec::new(),
                code: Some("PROJ-1".to_string()),
            })],
            task_ops: vec![TaskOp::Insert(TaskRow {
                name: "First task".to_string(),
                description: None,
                status: TaskStatus::Todo,
                priority: 3,
                due_at: None,
                tags: Vec::new(),
                project_code: Some("PROJ-1".to_string()),
            })],
            projects: 1,
            tasks: 1,
            skipped: 0,
            duplicate_rows_in_payload: 0,
        };

        writer.persist(&batch).await.unwrap();

        let (task_guid, project_guid): (Option<String>, String) = sqlx::query_as(
            "SELECT t.project_guid, p.guid FROM tasks t JOIN projects p ON p.code = t.project_code",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(task_guid, Some(project_guid));
    }

    #[tokio::test]
    async fn empty_batches_are_a_no_op() {
        let pool = setup_test_db().await;
        let writer = BulkWriter::new(pool.clone());
        writer.persist(&ResolvedBatch::default()).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}

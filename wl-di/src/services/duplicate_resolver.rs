//! Duplicate resolution
//!
//! Two passes over the validated rows: collapse natural-key duplicates
//! within the payload, then check the survivors against existing store
//! records and turn them into insert/update operations per the selected
//! strategy.

use std::collections::{BTreeSet, HashMap, HashSet};

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::db::projects::ProjectOp;
use crate::db::tasks::TaskOp;
use crate::error::ImportError;
use crate::models::{DuplicateStrategy, Row};

/// Resolver output: the two operation batches plus the counters they imply
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub project_ops: Vec<ProjectOp>,
    pub task_ops: Vec<TaskOp>,
    /// Rows that will be written (insert or update), per kind
    pub projects: i64,
    pub tasks: i64,
    /// Store matches excluded under skip-duplicates
    pub skipped: i64,
    /// Later occurrences of a natural key within the payload
    pub duplicate_rows_in_payload: i64,
}

/// Resolve validated rows against the payload itself and the store
pub async fn resolve(
    pool: &SqlitePool,
    rows: Vec<Row>,
    strategy: DuplicateStrategy,
) -> Result<ResolvedBatch, ImportError> {
    let mut batch = ResolvedBatch::default();

    // Pass 1: in-payload duplicates. First occurrence wins.
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut kept: Vec<Row> = Vec::new();
    for row in rows {
        match row.natural_key() {
            Some(key) => {
                if seen_keys.insert(key) {
                    kept.push(row);
                } else {
                    batch.duplicate_rows_in_payload += 1;
                }
            }
            None => kept.push(row),
        }
    }

    if strategy == DuplicateStrategy::StrictFail && batch.duplicate_rows_in_payload > 0 {
        return Err(ImportError::Conflict {
            message: format!(
                "{} row(s) within the upload share a natural key with an earlier row",
                batch.duplicate_rows_in_payload
            ),
            duplicate_rows_in_payload: batch.duplicate_rows_in_payload,
        });
    }

    // Pass 2: against the store, by natural key
    let codes: Vec<String> = kept
        .iter()
        .filter_map(|row| match row {
            Row::Project(p) => p.code.clone(),
            Row::Task(_) => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let task_names: Vec<String> = kept
        .iter()
        .filter_map(|row| match row {
            Row::Task(t) => Some(t.name.clone()),
            Row::Project(_) => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let existing_projects: HashMap<String, Uuid> = db::projects::find_by_codes(pool, &codes)
        .await?
        .into_iter()
        .filter_map(|record| record.code.map(|code| (code, record.guid)))
        .collect();
    let existing_tasks: HashMap<(String, String), Uuid> = db::tasks::find_by_names(pool, &task_names)
        .await?
        .into_iter()
        .map(|record| {
            (
                (
                    record.name,
                    record.project_code.unwrap_or_default(),
                ),
                record.guid,
            )
        })
        .collect();

    for row in kept {
        match row {
            Row::Project(project) => {
                let existing = project
                    .code
                    .as_ref()
                    .and_then(|code| existing_projects.get(code))
                    .copied();
                match existing {
                    None => {
                        batch.projects += 1;
                        batch.project_ops.push(ProjectOp::Insert(project));
                    }
                    Some(guid) => match strategy {
                        DuplicateStrategy::SkipDuplicates => batch.skipped += 1,
                        DuplicateStrategy::UpdateOnMatch => {
                            batch.projects += 1;
                            batch.project_ops.push(ProjectOp::Update { guid, row: project });
                        }
                        DuplicateStrategy::StrictFail => {
                            return Err(store_conflict("project", &project.name, &batch));
                        }
                    },
                }
            }
            Row::Task(task) => {
                let key = (
                    task.name.clone(),
                    task.project_code.clone().unwrap_or_default(),
                );
                match existing_tasks.get(&key).copied() {
                    None => {
                        batch.tasks += 1;
                        batch.task_ops.push(TaskOp::Insert(task));
                    }
                    Some(guid) => match strategy {
                        DuplicateStrategy::SkipDuplicates => batch.skipped += 1,
                        DuplicateStrategy::UpdateOnMatch => {
                            batch.tasks += 1;
                            batch.task_ops.push(TaskOp::Update { guid, row: task });
                        }
                        DuplicateStrategy::StrictFail => {
                            return Err(store_conflict("task", &task.name, &batch));
                        }
                    },
                }
            }
        }
    }

    tracing::debug!(
        projects = batch.projects,
        tasks = batch.tasks,
        skipped = batch.skipped,
        duplicate_rows_in_payload = batch.duplicate_rows_in_payload,
        strategy = strategy.as_str(),
        "Duplicate resolution finished"
    );

    Ok(batch)
}

fn store_conflict(kind: &str, name: &str, batch: &ResolvedBatch) -> ImportError {
    ImportError::Conflict {
        message: format!(
            "{} '{}' collides with an existing store record on its natural key",
            kind, name
        ),
        duplicate_rows_in_payload: batch.duplicate_rows_in_payload,
    }
}

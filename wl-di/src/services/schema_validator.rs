//! Schema validation
//!
//! Applied uniformly after mapping, before duplicate resolution. Any
//! violation aborts the entire import with the offending row index and
//! field; the pipeline never commits a partial batch. On success the drafts
//! are finalized into the typed row union.

use crate::error::ImportError;
use crate::models::{ProjectRow, ProjectStatus, Row, RowKind, TaskRow, TaskStatus};
use crate::services::row_mapper::{PriorityDraft, RowDraft, StatusDraft};

/// Validate all drafts and finalize them into typed rows.
/// Fails on the first violating row.
pub fn validate(drafts: Vec<RowDraft>) -> Result<Vec<Row>, ImportError> {
    let mut rows = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.into_iter().enumerate() {
        rows.push(validate_row(index, draft)?);
    }
    Ok(rows)
}

fn validate_row(index: usize, draft: RowDraft) -> Result<Row, ImportError> {
    if draft.name.trim().is_empty() {
        return Err(ImportError::Schema {
            row: index,
            field: "name",
            message: "name/title must be non-empty".to_string(),
        });
    }

    let priority = match draft.priority {
        PriorityDraft::Default => 3,
        PriorityDraft::Value(p) => p,
        PriorityDraft::OutOfRange(value) => {
            return Err(ImportError::Schema {
                row: index,
                field: "priority",
                message: format!("priority {} is outside the allowed range 1..=5", value),
            });
        }
        PriorityDraft::NotAnInteger(value) => {
            return Err(ImportError::Schema {
                row: index,
                field: "priority",
                message: format!("priority '{}' is not an integer", value),
            });
        }
    };

    match draft.kind {
        RowKind::Project => {
            let status = match draft.status {
                StatusDraft::Default => ProjectStatus::default(),
                StatusDraft::Project(status) => status,
                StatusDraft::Unrecognized(value) => {
                    return Err(unknown_status(index, &value, draft.kind));
                }
                // A task status can only reach a project draft through a
                // mapper bug; treat it as a violation rather than a panic.
                StatusDraft::Task(_) => {
                    return Err(unknown_status(index, "task status on project row", draft.kind));
                }
            };
            Ok(Row::Project(ProjectRow {
                name: draft.name,
                description: draft.description,
                status,
                priority,
                due_at: draft.due_at,
                tags: draft.tags,
                code: draft.code,
            }))
        }
        RowKind::Task => {
            let status = match draft.status {
                StatusDraft::Default => TaskStatus::default(),
                StatusDraft::Task(status) => status,
                StatusDraft::Unrecognized(value) => {
                    return Err(unknown_status(index, &value, draft.kind));
                }
                StatusDraft::Project(_) => {
                    return Err(unknown_status(index, "project status on task row", draft.kind));
                }
            };
            Ok(Row::Task(TaskRow {
                name: draft.name,
                description: draft.description,
                status,
                priority,
                due_at: draft.due_at,
                tags: draft.tags,
                project_code: draft.project_code,
            }))
        }
    }
}

fn unknown_status(index: usize, value: &str, kind: RowKind) -> ImportError {
    ImportError::Schema {
        row: index,
        field: "status",
        message: format!("'{}' is not a known {} status", value, kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{Leniency, RawRecord};
    use crate::services::row_mapper::map_record;

    fn draft(pairs: &[(&str, &str)], leniency: Leniency) -> RowDraft {
        let mut record = RawRecord::new();
        for (k, v) in pairs {
            record.insert(k, v.to_string());
        }
        map_record(&record, leniency)
    }

    #[test]
    fn strict_out_of_range_priority_is_rejected_with_row_index() {
        let drafts = vec![
            draft(&[("title", "ok"), ("priority", "2")], Leniency::Strict),
            draft(&[("title", "bad"), ("priority", "99")], Leniency::Strict),
        ];
        let err = validate(drafts).unwrap_err();
        match err {
            ImportError::Schema { row, field, .. } => {
                assert_eq!(row, 1);
                assert_eq!(field, "priority");
            }
            other => panic!("Expected Schema, got {:?}", other),
        }
    }

    #[test]
    fn strict_unknown_status_is_rejected() {
        let drafts = vec![draft(&[("title", "A"), ("status", "someday")], Leniency::Strict)];
        let err = validate(drafts).unwrap_err();
        assert!(matches!(err, ImportError::Schema { field: "status", .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let drafts = vec![draft(&[("status", "todo")], Leniency::Lenient)];
        let err = validate(drafts).unwrap_err();
        assert!(matches!(err, ImportError::Schema { field: "name", .. }));
    }

    #[test]
    fn defaults_are_applied_on_success() {
        let rows = validate(vec![
            draft(&[("type", "project"), ("name", "Alpha")], Leniency::Lenient),
            draft(&[("title", "Fix bug")], Leniency::Lenient),
        ])
        .unwrap();

        match &rows[0] {
            Row::Project(p) => {
                assert_eq!(p.status, ProjectStatus::Planned);
                assert_eq!(p.priority, 3);
            }
            other => panic!("Expected project, got {:?}", other),
        }
        match &rows[1] {
            Row::Task(t) => assert_eq!(t.status, TaskStatus::Todo),
            other => panic!("Expected task, got {:?}", other),
        }
    }

    #[test]
    fn lenient_rows_always_validate_priority() {
        let rows = validate(vec![draft(
            &[("title", "A"), ("priority", "99")],
            Leniency::Lenient,
        )])
        .unwrap();
        match &rows[0] {
            Row::Task(t) => assert_eq!(t.priority, 5),
            other => panic!("Expected task, got {:?}", other),
        }
    }
}

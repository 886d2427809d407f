//! Row mapping
//!
//! Normalizes a raw field map into a row draft, applying defaults and
//! coercions. Lenient sources (CSV, Markdown) coerce sloppy values in place;
//! strict sources (JSON) preserve violations for the schema validator.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{ProjectStatus, RowKind, TaskStatus};
use crate::parsers::{Leniency, RawRecord};

const TYPE_FIELDS: &[&str] = &["type", "kind"];
const NAME_FIELDS: &[&str] = &["name", "title"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "notes"];
const STATUS_FIELDS: &[&str] = &["status", "state"];
const DUE_FIELDS: &[&str] = &["due", "due_at", "due_date", "deadline"];
const TAG_FIELDS: &[&str] = &["tags", "labels"];
const PROJECT_CODE_FIELDS: &[&str] = &["code", "project_code", "project_id", "projectid"];
const TASK_PROJECT_FIELDS: &[&str] = &["project_id", "projectid", "project_code", "project"];

/// Status value carried forward to validation
#[derive(Debug, Clone, PartialEq)]
pub enum StatusDraft {
    /// Absent or coerced away; validator applies the per-kind default
    Default,
    Project(ProjectStatus),
    Task(TaskStatus),
    /// Strict source supplied a value outside the enum
    Unrecognized(String),
}

/// Priority value carried forward to validation
#[derive(Debug, Clone, PartialEq)]
pub enum PriorityDraft {
    /// Absent or coerced away; validator applies the default of 3
    Default,
    /// Integer already inside 1..=5
    Value(u8),
    /// Strict source supplied an integer outside 1..=5
    OutOfRange(i64),
    /// Strict source supplied a non-integer
    NotAnInteger(String),
}

/// Mapper output: typed enough for validation, not yet committed to a kind
/// specific row struct
#[derive(Debug, Clone)]
pub struct RowDraft {
    pub kind: RowKind,
    /// Trimmed; may be empty (the validator rejects that)
    pub name: String,
    pub description: Option<String>,
    pub status: StatusDraft,
    pub priority: PriorityDraft,
    pub due_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Project rows: the natural-key code
    pub code: Option<String>,
    /// Task rows: reference to the parent project's code
    pub project_code: Option<String>,
}

/// Map one raw record into a row draft
pub fn map_record(record: &RawRecord, leniency: Leniency) -> RowDraft {
    let kind = resolve_kind(record);
    let name = record
        .first_of(NAME_FIELDS)
        .unwrap_or_default()
        .trim()
        .to_string();

    RowDraft {
        kind,
        name,
        description: record.first_of(DESCRIPTION_FIELDS).map(str::to_string),
        status: map_status(record, kind, leniency),
        priority: map_priority(record, leniency),
        due_at: record.first_of(DUE_FIELDS).and_then(parse_due_date),
        tags: record
            .first_of(TAG_FIELDS)
            .map(split_tags)
            .unwrap_or_default(),
        code: match kind {
            RowKind::Project => record.first_of(PROJECT_CODE_FIELDS).map(str::to_string),
            RowKind::Task => None,
        },
        project_code: match kind {
            RowKind::Task => record.first_of(TASK_PROJECT_FIELDS).map(str::to_string),
            RowKind::Project => None,
        },
    }
}

/// Kind resolution: explicit type field, then the title-presence heuristic
/// (a title with no explicit type=project implies task), then a project code
/// field, then the task default.
fn resolve_kind(record: &RawRecord) -> RowKind {
    if let Some(explicit) = record.first_of(TYPE_FIELDS) {
        match explicit.trim().to_lowercase().as_str() {
            "project" => return RowKind::Project,
            "task" => return RowKind::Task,
            _ => {}
        }
    }
    if record.has("title") {
        RowKind::Task
    } else if record.has("code") || record.has("project_code") {
        RowKind::Project
    } else {
        RowKind::Task
    }
}

fn map_status(record: &RawRecord, kind: RowKind, leniency: Leniency) -> StatusDraft {
    let Some(raw) = record.first_of(STATUS_FIELDS) else {
        return StatusDraft::Default;
    };

    let known = match kind {
        RowKind::Project => ProjectStatus::parse(raw).map(StatusDraft::Project),
        RowKind::Task => TaskStatus::parse(raw).map(StatusDraft::Task),
    };

    match (known, leniency) {
        (Some(status), _) => status,
        (None, Leniency::Lenient) => {
            tracing::debug!(status = raw, kind = kind.as_str(), "Unrecognized status, using default");
            StatusDraft::Default
        }
        (None, Leniency::Strict) => StatusDraft::Unrecognized(raw.to_string()),
    }
}

fn map_priority(record: &RawRecord, leniency: Leniency) -> PriorityDraft {
    let Some(raw) = record.get("priority") else {
        return PriorityDraft::Default;
    };

    match raw.trim().parse::<i64>() {
        Ok(value @ 1..=5) => PriorityDraft::Value(value as u8),
        Ok(out_of_range) => match leniency {
            Leniency::Lenient => PriorityDraft::Value(out_of_range.clamp(1, 5) as u8),
            Leniency::Strict => PriorityDraft::OutOfRange(out_of_range),
        },
        Err(_) => match leniency {
            Leniency::Lenient => PriorityDraft::Default,
            Leniency::Strict => PriorityDraft::NotAnInteger(raw.to_string()),
        },
    }
}

/// Tags split on `;`, `|`, or `,`; trimmed; empties dropped
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(|c| c == ';' || c == '|' || c == ',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 3339 first, then bare dates as UTC midnight
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        let mut record = RawRecord::new();
        for (k, v) in pairs {
            record.insert(k, v.to_string());
        }
        record
    }

    #[test]
    fn explicit_type_wins() {
        let draft = map_record(
            &record(&[("type", "Project"), ("title", "Alpha")]),
            Leniency::Lenient,
        );
        assert_eq!(draft.kind, RowKind::Project);
    }

    #[test]
    fn title_without_type_implies_task() {
        let draft = map_record(&record(&[("title", "Fix bug")]), Leniency::Lenient);
        assert_eq!(draft.kind, RowKind::Task);
        assert_eq!(draft.name, "Fix bug");
    }

    #[test]
    fn code_without_title_implies_project() {
        let draft = map_record(
            &record(&[("code", "PROJ-1"), ("name", "Alpha")]),
            Leniency::Lenient,
        );
        assert_eq!(draft.kind, RowKind::Project);
        assert_eq!(draft.code.as_deref(), Some("PROJ-1"));
    }

    #[test]
    fn bare_name_defaults_to_task() {
        let draft = map_record(&record(&[("name", "Standalone")]), Leniency::Lenient);
        assert_eq!(draft.kind, RowKind::Task);
    }

    #[test]
    fn task_project_reference_is_mapped() {
        let draft = map_record(
            &record(&[("name", "Task A"), ("project_id", "prj-1")]),
            Leniency::Lenient,
        );
        assert_eq!(draft.kind, RowKind::Task);
        assert_eq!(draft.project_code.as_deref(), Some("prj-1"));
    }

    #[test]
    fn lenient_priority_clamps_and_defaults() {
        let clamped = map_record(
            &record(&[("name", "A"), ("priority", "99")]),
            Leniency::Lenient,
        );
        assert_eq!(clamped.priority, PriorityDraft::Value(5));

        let defaulted = map_record(
            &record(&[("name", "A"), ("priority", "urgent")]),
            Leniency::Lenient,
        );
        assert_eq!(defaulted.priority, PriorityDraft::Default);
    }

    #[test]
    fn strict_priority_preserves_violations() {
        let out_of_range = map_record(
            &record(&[("name", "A"), ("priority", "99")]),
            Leniency::Strict,
        );
        assert_eq!(out_of_range.priority, PriorityDraft::OutOfRange(99));

        let not_a_number = map_record(
            &record(&[("name", "A"), ("priority", "urgent")]),
            Leniency::Strict,
        );
        assert_eq!(
            not_a_number.priority,
            PriorityDraft::NotAnInteger("urgent".to_string())
        );
    }

    #[test]
    fn strict_status_preserves_unrecognized() {
        let draft = map_record(
            &record(&[("name", "A"), ("status", "someday")]),
            Leniency::Strict,
        );
        assert_eq!(draft.status, StatusDraft::Unrecognized("someday".to_string()));

        let lenient = map_record(
            &record(&[("name", "A"), ("status", "someday")]),
            Leniency::Lenient,
        );
        assert_eq!(lenient.status, StatusDraft::Default);
    }

    #[test]
    fn tags_split_on_all_separators() {
        let draft = map_record(
            &record(&[("name", "A"), ("tags", "api; backend|urgent, web")]),
            Leniency::Lenient,
        );
        assert_eq!(draft.tags, vec!["api", "backend", "urgent", "web"]);
    }

    #[test]
    fn due_dates_parse_rfc3339_and_bare_dates() {
        let draft = map_record(
            &record(&[("name", "A"), ("due_date", "2026-03-01")]),
            Leniency::Lenient,
        );
        assert!(draft.due_at.is_some());

        let unparseable = map_record(
            &record(&[("name", "A"), ("due_date", "next tuesday")]),
            Leniency::Lenient,
        );
        assert!(unparseable.due_at.is_none());
    }
}

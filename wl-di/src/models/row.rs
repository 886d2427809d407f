//! Canonical row model for imported records
//!
//! Rows are a closed tagged union produced by the mapping/validation stage.
//! Downstream components (duplicate resolution, bulk persistence) only ever
//! see typed rows, never raw field maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of record a row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Project,
    Task,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Project => "project",
            RowKind::Task => "task",
        }
    }
}

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Planned,
    Active,
    Paused,
    Completed,
    Archived,
}

impl ProjectStatus {
    /// Parse a status value (case-insensitive). None for unrecognized input.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "planned" => Some(ProjectStatus::Planned),
            "active" => Some(ProjectStatus::Active),
            "paused" => Some(ProjectStatus::Paused),
            "completed" => Some(ProjectStatus::Completed),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planned",
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planned
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Doing,
    Review,
    Done,
}

impl TaskStatus {
    /// Parse a status value (case-insensitive). None for unrecognized input.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "todo" => Some(TaskStatus::Todo),
            "doing" => Some(TaskStatus::Doing),
            "review" => Some(TaskStatus::Review),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

/// A validated project row ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// Always in 1..=5 once validated
    pub priority: u8,
    pub due_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Natural key: caller-meaningful project code
    pub code: Option<String>,
}

/// A validated task row ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Always in 1..=5 once validated
    pub priority: u8,
    pub due_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Natural-key reference to the parent project's code
    pub project_code: Option<String>,
}

/// Closed row union
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Project(ProjectRow),
    Task(TaskRow),
}

impl Row {
    pub fn kind(&self) -> RowKind {
        match self {
            Row::Project(_) => RowKind::Project,
            Row::Task(_) => RowKind::Task,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Row::Project(p) => &p.name,
            Row::Task(t) => &t.name,
        }
    }

    /// Natural key used for duplicate detection, when the row has one.
    ///
    /// Projects key on their code; tasks key on (name, project reference),
    /// with the empty string standing in for a missing reference so that
    /// unparented tasks still deduplicate on name.
    pub fn natural_key(&self) -> Option<String> {
        match self {
            Row::Project(p) => p.code.as_ref().map(|code| format!("project\u{1}{code}")),
            Row::Task(t) => Some(format!(
                "task\u{1}{}\u{1}{}",
                t.name,
                t.project_code.as_deref().unwrap_or("")
            )),
        }
    }
}

//! Data models for the import pipeline

pub mod row;
pub mod run;

pub use row::{ProjectRow, ProjectStatus, Row, RowKind, TaskRow, TaskStatus};
pub use run::{DuplicateStrategy, ImportSummary, IngestionRun, RunStatus, RunTotals};

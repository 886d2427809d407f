//! Import orchestration
//!
//! One import call runs the full pipeline synchronously: fingerprint,
//! ledger consult, format detection, parse, map, validate, duplicate
//! resolution, bulk persistence, run finalization. MIME and strategy
//! rejections happen before a run record exists; failures after the run is
//! claimed finalize it as failed exactly once.

use sqlx::SqlitePool;

use crate::error::ImportError;
use crate::models::{DuplicateStrategy, ImportSummary, IngestionRun, RunStatus, RunTotals};
use crate::parsers::{FileFormat, ParserRegistry};
use crate::services::bulk_writer::BulkWriter;
use crate::services::duplicate_resolver;
use crate::services::idempotency::{self, BeginOutcome, IdempotencyLedger};
use crate::services::row_mapper;
use crate::services::schema_validator;

/// One upload to import
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub owner_email: String,
    pub file_name: Option<String>,
    pub duplicate_strategy: Option<String>,
}

pub struct ImportService {
    db: SqlitePool,
    registry: ParserRegistry,
    ledger: IdempotencyLedger,
    writer: BulkWriter,
}

impl ImportService {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            registry: ParserRegistry::with_defaults(),
            ledger: IdempotencyLedger::new(db.clone()),
            writer: BulkWriter::new(db.clone()),
            db,
        }
    }

    /// Import one uploaded file
    pub async fn import(&self, request: ImportRequest) -> Result<ImportSummary, ImportError> {
        let strategy = match &request.duplicate_strategy {
            None => DuplicateStrategy::default(),
            Some(raw) => DuplicateStrategy::parse(raw).ok_or_else(|| {
                ImportError::Config(format!("Unknown duplicate strategy: '{}'", raw.trim()))
            })?,
        };

        if request.bytes.is_empty() {
            return Err(ImportError::Format("Uploaded file is empty".to_string()));
        }

        let key = idempotency::run_key(&request.bytes, strategy, &request.owner_email);

        // Ledger first: a completed run replays without any parsing work
        if let Some(existing) = self.ledger.find(&key).await? {
            if existing.status == RunStatus::Completed {
                tracing::info!(key = %key, owner_email = %request.owner_email, "Replaying completed ingestion run");
                return Ok(ImportSummary::replayed(&existing));
            }
        }

        // Format selection happens before the run is claimed, so unsupported
        // uploads leave no record behind
        let format = self.registry.detect(&request.mime_type, &request.bytes)?;

        let run = IngestionRun::processing(
            key.clone(),
            request.owner_email.clone(),
            format.as_str().to_string(),
            strategy,
            idempotency::file_hash(&request.bytes),
            request.file_name.clone(),
            Some(request.mime_type.clone()),
        );
        if let BeginOutcome::Replay(existing) = self.ledger.begin(&run).await? {
            tracing::info!(key = %key, "Replaying completed ingestion run");
            return Ok(ImportSummary::replayed(&existing));
        }

        tracing::info!(
            key = %key,
            owner_email = %request.owner_email,
            format = format.as_str(),
            strategy = strategy.as_str(),
            bytes = request.bytes.len(),
            "Starting ingestion run"
        );

        let mut totals = RunTotals::default();
        match self.process(&request, format, strategy, &mut totals).await {
            Ok(()) => {
                self.ledger.complete(&key, &totals).await?;
                Ok(ImportSummary::completed(&totals))
            }
            Err(err) => {
                if let ImportError::Conflict {
                    duplicate_rows_in_payload,
                    ..
                } = &err
                {
                    totals.duplicate_rows_in_payload = *duplicate_rows_in_payload;
                }
                if let Err(ledger_err) = self.ledger.fail(&key, &err.to_string(), &totals).await {
                    tracing::error!(key = %key, error = %ledger_err, "Failed to record run failure");
                }
                Err(err)
            }
        }
    }

    /// Parse through persist; every error finalizes the run in `import`
    async fn process(
        &self,
        request: &ImportRequest,
        format: FileFormat,
        strategy: DuplicateStrategy,
        totals: &mut RunTotals,
    ) -> Result<(), ImportError> {
        let records = self.registry.parse(format, &request.bytes)?;
        if records.is_empty() {
            return Err(ImportError::Format(
                "File contains no importable records".to_string(),
            ));
        }
        totals.total_rows = records.len() as i64;

        let leniency = format.leniency();
        let drafts = records
            .iter()
            .map(|record| row_mapper::map_record(record, leniency))
            .collect();
        let rows = schema_validator::validate(drafts)?;

        let batch = duplicate_resolver::resolve(&self.db, rows, strategy).await?;
        totals.projects = batch.projects;
        totals.tasks = batch.tasks;
        totals.skipped = batch.skipped;
        totals.duplicate_rows_in_payload = batch.duplicate_rows_in_payload;

        self.writer.persist(&batch).await?;

        Ok(())
    }
}

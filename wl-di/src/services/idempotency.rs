//! Idempotency ledger
//!
//! Content-addressed run records let a repeated upload short-circuit to the
//! previously recorded result. The fingerprint covers the raw bytes, the
//! normalized duplicate strategy, and the owner email, so the same file
//! re-submitted under a different policy is a different run.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::db::runs::{self, InsertOutcome};
use crate::error::ImportError;
use crate::models::{DuplicateStrategy, IngestionRun, RunStatus, RunTotals};

/// Compute the ledger key for an upload
pub fn run_key(bytes: &[u8], strategy: DuplicateStrategy, owner_email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.update([0u8]);
    hasher.update(strategy.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(owner_email.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of the raw file bytes alone
pub fn file_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Outcome of consulting the ledger for a fresh upload
#[derive(Debug)]
pub enum BeginOutcome {
    /// This request owns a fresh `processing` run
    Fresh,
    /// A completed run already holds this key; replay its totals
    Replay(IngestionRun),
}

/// Ledger over the ingestion run store
pub struct IdempotencyLedger {
    db: SqlitePool,
}

impl IdempotencyLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Load the run holding this key, if any
    pub async fn find(&self, key: &str) -> Result<Option<IngestionRun>, ImportError> {
        Ok(runs::find_by_key(&self.db, key).await?)
    }

    /// Claim the run key for this request.
    ///
    /// A completed run replays; a processing run means an identical upload
    /// is in flight and this request fails fast; a failed run is reclaimed.
    /// The insert race is decided by the store's unique key - the loser
    /// re-checks once and resolves against the winner's record.
    pub async fn begin(&self, run: &IngestionRun) -> Result<BeginOutcome, ImportError> {
        match runs::find_by_key(&self.db, &run.key).await? {
            Some(existing) => match existing.status {
                RunStatus::Completed => return Ok(BeginOutcome::Replay(existing)),
                RunStatus::Processing => return Err(in_flight()),
                RunStatus::Failed => {
                    if runs::reclaim_failed(&self.db, run).await? {
                        tracing::info!(key = %run.key, "Reclaimed failed run for retry");
                        return Ok(BeginOutcome::Fresh);
                    }
                }
            },
            None => {
                if runs::insert_processing(&self.db, run).await? == InsertOutcome::Created {
                    return Ok(BeginOutcome::Fresh);
                }
            }
        }

        // Lost the race to a concurrent identical upload; resolve once
        // against whatever state the winner left behind.
        match runs::find_by_key(&self.db, &run.key).await? {
            Some(existing) if existing.status == RunStatus::Completed => {
                Ok(BeginOutcome::Replay(existing))
            }
            Some(existing) if existing.status == RunStatus::Failed => {
                if runs::reclaim_failed(&self.db, run).await? {
                    Ok(BeginOutcome::Fresh)
                } else {
                    Err(in_flight())
                }
            }
            _ => Err(in_flight()),
        }
    }

    /// Finalize the run as completed; called exactly once per fresh run
    pub async fn complete(&self, key: &str, totals: &RunTotals) -> Result<(), ImportError> {
        runs::mark_completed(&self.db, key, totals).await?;
        tracing::info!(
            key = %key,
            projects = totals.projects,
            tasks = totals.tasks,
            skipped = totals.skipped,
            "Ingestion run completed"
        );
        Ok(())
    }

    /// Finalize the run as failed; called exactly once per fresh run
    pub async fn fail(&self, key: &str, error: &str, totals: &RunTotals) -> Result<(), ImportError> {
        runs::mark_failed(&self.db, key, error, totals).await?;
        tracing::warn!(key = %key, error = %error, "Ingestion run failed");
        Ok(())
    }
}

fn in_flight() -> ImportError {
    ImportError::InFlight(
        "An identical upload is already being processed; retry shortly".to_string(),
    )
}

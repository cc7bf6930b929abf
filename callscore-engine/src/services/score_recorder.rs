//! Score persistence and rescoring
//!
//! `save` replaces a call's stored score (idempotent by call id). `rescore`
//! re-runs the coordinator on the stored transcript, saves the result and
//! appends an audit entry. Audit failures are logged, never returned.
//!
//! There is no optimistic concurrency control: two concurrent rescores of the
//! same call both succeed and the last write wins.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::scoring_coordinator::ScoringCoordinator;
use crate::db::{audit, calls, settings};
use crate::error::ScoringError;
use crate::models::{CallScore, RescoreAuditEntry};
use crate::utils::retry_on_lock;

pub struct ScoreRecorder {
    db: SqlitePool,
    coordinator: Arc<ScoringCoordinator>,
}

impl ScoreRecorder {
    pub fn new(db: SqlitePool, coordinator: Arc<ScoringCoordinator>) -> Self {
        Self { db, coordinator }
    }

    /// Upsert `score` onto the call's record
    pub async fn save(&self, call_id: &str, score: &CallScore) -> Result<(), ScoringError> {
        let max_wait_ms = settings::get_db_max_lock_wait_ms(&self.db).await?;

        retry_on_lock("save call score", max_wait_ms, || {
            calls::update_call_score(&self.db, call_id, score)
        })
        .await?;

        tracing::debug!(call_id = %call_id, total = score.total, method = %score.scoring_method, "Saved call score");
        Ok(())
    }

    /// Create a call record, score it and save the score
    pub async fn submit(
        &self,
        tenant_id: &str,
        transcript: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, CallScore), ScoringError> {
        if transcript.trim().is_empty() {
            return Err(ScoringError::InvalidInput("transcript is required".to_string()));
        }

        let call_id = calls::insert_call(&self.db, tenant_id, transcript).await?;
        let score = self.coordinator.score_call(transcript, tenant_id, cancel).await?;
        self.save(&call_id, &score).await?;

        tracing::info!(call_id = %call_id, tenant_id = %tenant_id, total = score.total, "Call submitted");
        Ok((call_id, score))
    }

    /// Re-score a stored call and record the before/after state
    pub async fn rescore(
        &self,
        call_id: &str,
        actor_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CallScore, ScoringError> {
        let record = calls::get_call(&self.db, call_id)
            .await?
            .ok_or_else(|| callscore_common::Error::NotFound(format!("call {}", call_id)))?;

        let score = self
            .coordinator
            .score_call(&record.transcript, &record.tenant_id, cancel)
            .await?;
        self.save(call_id, &score).await?;

        let entry = RescoreAuditEntry {
            call_id: call_id.to_string(),
            old_total: record.score.as_ref().map(|s| s.total),
            new_total: score.total,
            old_method: record.score.as_ref().map(|s| s.scoring_method),
            new_method: score.scoring_method,
            actor_id: actor_id.to_string(),
            timestamp: callscore_common::time::now(),
        };

        if let Err(e) = audit::append_audit_entry(&self.db, &entry).await {
            tracing::warn!(call_id = %call_id, error = %e, "Failed to append rescore audit entry");
        }

        tracing::info!(
            call_id = %call_id,
            actor_id = %actor_id,
            old_total = ?entry.old_total,
            new_total = entry.new_total,
            "Call rescored"
        );

        Ok(score)
    }

    /// Audit entries for a call, oldest first
    pub async fn history(&self, call_id: &str) -> Result<Vec<RescoreAuditEntry>, ScoringError> {
        Ok(audit::list_audit_entries(&self.db, call_id).await?)
    }
}

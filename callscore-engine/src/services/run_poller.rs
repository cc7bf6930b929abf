//! Run status polling
//!
//! Drives a started run to a terminal state with a fixed delay between polls,
//! bounded by both an attempt count and a wall-clock deadline. A cancellation
//! token aborts the wait between or during polls.
//!
//! **Outcomes:**
//! - `completed` → `Ok(())`
//! - any other terminal status → `ScoringError::RunTerminal`
//! - attempt or deadline budget exhausted → `ScoringError::Timeout`
//! - token cancelled → `ScoringError::Cancelled`

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::assistant_client::{AssistantService, Run, RunStatus};
use crate::error::ScoringError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 180;

/// Polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        }
    }
}

/// Waits for runs to finish
#[derive(Debug, Clone, Copy, Default)]
pub struct RunPoller {
    settings: PollSettings,
}

impl RunPoller {
    pub fn new(settings: PollSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Poll `run` until it reaches a terminal state
    ///
    /// The status returned by `start_run` is inspected first, so a run that is
    /// already terminal costs no status request.
    pub async fn wait_for_completion(
        &self,
        service: &dyn AssistantService,
        thread_id: &str,
        run: &Run,
        cancel: &CancellationToken,
    ) -> Result<(), ScoringError> {
        let started = Instant::now();
        let mut status = run.status.clone();
        let mut attempts: u32 = 0;

        loop {
            match status {
                RunStatus::Completed => {
                    tracing::debug!(
                        thread_id = %thread_id,
                        run_id = %run.id,
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Run completed"
                    );
                    return Ok(());
                }
                ref terminal if terminal.is_terminal() => {
                    tracing::warn!(
                        thread_id = %thread_id,
                        run_id = %run.id,
                        status = terminal.as_str(),
                        "Run reached terminal failure state"
                    );
                    return Err(ScoringError::RunTerminal {
                        run_id: run.id.clone(),
                        status: terminal.as_str().to_string(),
                    });
                }
                _ => {}
            }

            let elapsed = started.elapsed();
            if attempts >= self.settings.max_attempts || elapsed >= self.settings.timeout {
                return Err(ScoringError::Timeout {
                    attempts,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            let remaining = self.settings.timeout - elapsed;
            let delay = self.settings.interval.min(remaining);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScoringError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempts += 1;
            status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScoringError::Cancelled),
                polled = service.get_run_status(thread_id, &run.id) => polled?,
            };

            tracing::trace!(
                run_id = %run.id,
                attempt = attempts,
                status = status.as_str(),
                "Polled run status"
            );
        }
    }
}

//! Scoring entry point
//!
//! Resolves the tenant route, tries the remote assistant when the route
//! allows it, and falls back to the local heuristic scorer on any remote
//! failure. Apart from rejecting an empty transcript, `score_call` always
//! returns a complete score.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::assistant_client::AssistantConnector;
use super::config_resolver::{ConfigResolver, ResolvedScoringConfig, ScoringRoute};
use super::heuristic_scorer::LocalHeuristicScorer;
use super::remote_scorer::RemoteAssistantScorer;
use super::run_poller::RunPoller;
use crate::error::ScoringError;
use crate::models::{canonical_bridge_steps, BridgeStep, CallScore, ScoringContext};

pub struct ScoringCoordinator {
    resolver: ConfigResolver,
    connector: Arc<dyn AssistantConnector>,
    poller: RunPoller,
    local: LocalHeuristicScorer,
}

impl ScoringCoordinator {
    pub fn new(resolver: ConfigResolver, connector: Arc<dyn AssistantConnector>, poller: RunPoller) -> Self {
        Self {
            resolver,
            connector,
            poller,
            local: LocalHeuristicScorer::new(),
        }
    }

    /// Score a transcript for an organization or client
    ///
    /// Fails only with `InvalidInput` for a blank transcript.
    pub async fn score_call(
        &self,
        transcript: &str,
        tenant_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CallScore, ScoringError> {
        if transcript.trim().is_empty() {
            return Err(ScoringError::InvalidInput("transcript is required".to_string()));
        }

        let resolved = match self.resolver.resolve(tenant_id).await {
            Ok(resolved) => resolved,
            Err(ScoringError::Configuration(reason)) => {
                tracing::debug!(tenant_id = %tenant_id, reason = %reason, "No usable scoring configuration; scoring locally");
                local_only(canonical_bridge_steps())
            }
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Scoring configuration lookup failed; scoring locally");
                local_only(canonical_bridge_steps())
            }
        };

        let context = ScoringContext {
            transcript: transcript.to_string(),
            org_or_client_id: tenant_id.to_string(),
            remote_credentials: match resolved.route {
                ScoringRoute::Remote(credentials) => Some(credentials),
                ScoringRoute::Local => None,
            },
        };

        Ok(self.score_context(&context, &resolved.bridge_steps, cancel).await)
    }

    /// Score with an already-resolved context; never fails
    pub async fn score_context(
        &self,
        context: &ScoringContext,
        steps: &[BridgeStep],
        cancel: &CancellationToken,
    ) -> CallScore {
        if context.remote_credentials.is_some() {
            match self.score_remote(context, steps, cancel).await {
                Ok(score) => {
                    tracing::info!(
                        tenant_id = %context.org_or_client_id,
                        total = score.total,
                        "Call scored remotely"
                    );
                    return score;
                }
                Err(e) => {
                    tracing::warn!(
                        tenant_id = %context.org_or_client_id,
                        error = %e,
                        "Remote scoring failed; falling back to local heuristic"
                    );
                }
            }
        }

        let score = self.local.score_with_steps(&context.transcript, steps);
        tracing::info!(
            tenant_id = %context.org_or_client_id,
            total = score.total,
            "Call scored locally"
        );
        score
    }

    async fn score_remote(
        &self,
        context: &ScoringContext,
        steps: &[BridgeStep],
        cancel: &CancellationToken,
    ) -> Result<CallScore, ScoringError> {
        let credentials = context
            .remote_credentials
            .as_ref()
            .ok_or_else(|| ScoringError::Configuration("remote credentials missing".to_string()))?;

        let service = self.connector.connect(credentials)?;
        let scorer = RemoteAssistantScorer::new(service, credentials.assistant_id.clone(), self.poller);
        let score = scorer.score(&context.transcript, steps, cancel).await?;

        score
            .validate_against(steps)
            .map_err(|reason| ScoringError::ResponseParse(format!("remote score failed invariants: {}", reason)))?;

        Ok(score)
    }
}

fn local_only(bridge_steps: Vec<BridgeStep>) -> ResolvedScoringConfig {
    ResolvedScoringConfig {
        route: ScoringRoute::Local,
        bridge_steps,
    }
}

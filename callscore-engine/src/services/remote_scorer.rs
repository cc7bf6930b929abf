//! Remote assistant scorer
//!
//! Scores each bridge step through its own assistant conversation, strictly
//! one step after another, then asks for coaching in a final conversation.
//!
//! **Failure policy:**
//! - Any error while scoring a step aborts the whole remote attempt. There is
//!   no mixing of remote and local step scores within one call.
//! - Coaching is independent: if it cannot be obtained or parsed, the fixed
//!   fallback coaching is used and the remote step scores stand. Only
//!   cancellation propagates from the coaching exchange.

use tokio_util::sync::CancellationToken;

use super::assistant_client::{AssistantService, MessageRole};
use super::prompts::{coaching_prompt, step_prompt};
use super::response_parser::{parse_coaching_reply, parse_step_reply};
use super::run_poller::RunPoller;
use crate::error::ScoringError;
use crate::models::{BridgeStep, CallScore, Coaching, ScoringMethod, StepScore};

/// Result of one conversation round trip
struct Exchange {
    thread_id: String,
    run_id: String,
    reply: String,
}

/// Scores calls through an external conversational assistant
pub struct RemoteAssistantScorer {
    service: Box<dyn AssistantService>,
    assistant_id: String,
    poller: RunPoller,
}

impl RemoteAssistantScorer {
    pub fn new(service: Box<dyn AssistantService>, assistant_id: impl Into<String>, poller: RunPoller) -> Self {
        Self {
            service,
            assistant_id: assistant_id.into(),
            poller,
        }
    }

    /// Score every step (ordered by `order`) and synthesize coaching
    pub async fn score(
        &self,
        transcript: &str,
        steps: &[BridgeStep],
        cancel: &CancellationToken,
    ) -> Result<CallScore, ScoringError> {
        let mut ordered: Vec<&BridgeStep> = steps.iter().collect();
        ordered.sort_by_key(|s| s.order);

        let mut step_scores = Vec::with_capacity(ordered.len());
        for step in ordered {
            step_scores.push(self.score_step(step, transcript, cancel).await?);
        }

        let coaching = self.synthesize_coaching(transcript, &step_scores, cancel).await?;

        Ok(CallScore::assemble(step_scores, Some(coaching), ScoringMethod::Remote))
    }

    /// Score one step in a fresh conversation
    pub async fn score_step(
        &self,
        step: &BridgeStep,
        transcript: &str,
        cancel: &CancellationToken,
    ) -> Result<StepScore, ScoringError> {
        let exchange = self.exchange(&step_prompt(step, transcript), cancel).await?;

        let reply = parse_step_reply(&exchange.reply).map_err(|e| {
            tracing::warn!(
                step = %step.key,
                thread_id = %exchange.thread_id,
                run_id = %exchange.run_id,
                error = %e,
                "Assistant step reply failed validation"
            );
            e
        })?;

        tracing::debug!(
            step = %step.key,
            credit = %reply.credit,
            thread_id = %exchange.thread_id,
            "Step scored remotely"
        );

        Ok(StepScore::new(step, reply.credit, reply.notes)
            .with_reasoning(reply.reasoning)
            .with_external_refs(exchange.thread_id, exchange.run_id))
    }

    /// Coaching for already-scored steps; falls back to [`Coaching::fallback`]
    /// on any failure other than cancellation
    pub async fn synthesize_coaching(
        &self,
        transcript: &str,
        step_scores: &[StepScore],
        cancel: &CancellationToken,
    ) -> Result<Coaching, ScoringError> {
        let outcome = match self.exchange(&coaching_prompt(transcript, step_scores), cancel).await {
            Ok(exchange) => parse_coaching_reply(&exchange.reply),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(coaching) => Ok(coaching),
            Err(ScoringError::Cancelled) => Err(ScoringError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "Coaching synthesis failed; using default coaching");
                Ok(Coaching::fallback())
            }
        }
    }

    /// create conversation → post message → start run → poll → fetch reply
    async fn exchange(&self, prompt: &str, cancel: &CancellationToken) -> Result<Exchange, ScoringError> {
        if cancel.is_cancelled() {
            return Err(ScoringError::Cancelled);
        }

        let thread_id = self.service.create_conversation().await?;
        self.service.post_message(&thread_id, prompt).await?;
        let run = self.service.start_run(&thread_id, &self.assistant_id).await?;

        self.poller
            .wait_for_completion(self.service.as_ref(), &thread_id, &run, cancel)
            .await?;

        let messages = self.service.list_messages(&thread_id).await?;
        let reply = messages
            .into_iter()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content)
            .ok_or_else(|| ScoringError::ResponseParse("no assistant reply in conversation".to_string()))?;

        Ok(Exchange {
            thread_id,
            run_id: run.id,
            reply,
        })
    }
}

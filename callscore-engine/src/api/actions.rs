//! Action-dispatch endpoint
//!
//! `POST /api/actions` with a JSON body tagged by `action`:
//!
//! | action                | fields                        | response              |
//! |-----------------------|-------------------------------|-----------------------|
//! | `score_call`          | `transcript, organizationId`  | `CallScore`           |
//! | `submit_call`         | `transcript, organizationId`  | `{callId, score}`     |
//! | `rescore_call`        | `callId, actorId`             | `CallScore`           |
//! | `get_rescore_history` | `callId`                      | `RescoreAuditEntry[]` |
//!
//! Every failure is `400 {"error", "timestamp"}` (see [`ApiError`]).

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::CallScore;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    ScoreCall(CallInput),
    SubmitCall(CallInput),
    RescoreCall(RescoreInput),
    GetRescoreHistory(CallRef),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInput {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl CallInput {
    fn require(self) -> ApiResult<(String, String)> {
        let transcript = self
            .transcript
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("transcript is required".to_string()))?;
        let organization_id = self
            .organization_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("organizationId is required".to_string()))?;
        Ok((transcript, organization_id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescoreInput {
    pub call_id: String,
    pub actor_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRef {
    pub call_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCallResponse {
    pub call_id: String,
    pub score: CallScore,
}

/// POST /api/actions
///
/// The body is parsed here rather than through the `Json` extractor so that
/// malformed requests get the same error shape as every other failure.
pub async fn dispatch_action(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let result = handle(&state, &body).await;

    if let Err(e) = &result {
        *state.last_error.write().await = Some(e.public_message());
    }

    result
}

async fn handle(state: &AppState, body: &[u8]) -> ApiResult<Response> {
    let request: ActionRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected action request");
        ApiError::BadRequest("Unknown or malformed action request".to_string())
    })?;

    let cancel = state.shutdown.child_token();

    match request {
        ActionRequest::ScoreCall(input) => {
            let (transcript, organization_id) = input.require()?;
            let score = state
                .coordinator
                .score_call(&transcript, &organization_id, &cancel)
                .await?;
            Ok(Json(score).into_response())
        }
        ActionRequest::SubmitCall(input) => {
            let (transcript, organization_id) = input.require()?;
            let (call_id, score) = state
                .recorder
                .submit(&organization_id, &transcript, &cancel)
                .await?;
            Ok(Json(SubmitCallResponse { call_id, score }).into_response())
        }
        ActionRequest::RescoreCall(input) => {
            let score = state
                .recorder
                .rescore(&input.call_id, &input.actor_id, &cancel)
                .await?;
            Ok(Json(score).into_response())
        }
        ActionRequest::GetRescoreHistory(input) => {
            let entries = state.recorder.history(&input.call_id).await?;
            Ok(Json(entries).into_response())
        }
    }
}

pub fn action_routes() -> Router<AppState> {
    Router::new().route("/api/actions", post(dispatch_action))
}

//! Error types for callscore-engine
//!
//! Two layers:
//! - [`ScoringError`]: the engine taxonomy (configuration, transport, run
//!   terminal states, response parsing, timeouts, persistence)
//! - [`ApiError`]: the HTTP boundary; every failure renders as
//!   `400 {"error": ..., "timestamp": ...}` with a generic message while the
//!   detail goes to the log

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Scoring engine errors
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Remote route unusable (missing assistant id, key, enable flag, or tenant record)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network failure talking to the assistant service
    #[error("Remote transport error: {0}")]
    RemoteTransport(String),

    /// Assistant service answered with a non-success status
    #[error("Remote API error {status}: {body}")]
    RemoteApi { status: u16, body: String },

    /// Run ended in failed/cancelled/expired (or another non-success terminal state)
    #[error("Run {run_id} ended with status '{status}'")]
    RunTerminal { run_id: String, status: String },

    /// Assistant reply missing JSON or failing validation
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// Run did not reach a terminal state within the poll budget
    #[error("Run polling timed out after {attempts} attempts ({elapsed_ms} ms)")]
    Timeout { attempts: u32, elapsed_ms: u64 },

    /// Caller cancelled the in-flight scoring
    #[error("Scoring cancelled")]
    Cancelled,

    /// Caller misuse, e.g. empty transcript
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] callscore_common::Error),
}

impl ScoringError {
    /// Errors raised by the remote path that the coordinator absorbs by falling back
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            ScoringError::Configuration(_)
                | ScoringError::RemoteTransport(_)
                | ScoringError::RemoteApi { .. }
                | ScoringError::RunTerminal { .. }
                | ScoringError::ResponseParse(_)
                | ScoringError::Timeout { .. }
                | ScoringError::Cancelled
        )
    }
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        ScoringError::RemoteTransport(err.to_string())
    }
}

/// HTTP boundary error
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request or unknown action
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Referenced call does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("Common error: {0}")]
    Common(#[from] callscore_common::Error),
}

/// Message shown for any failure that is not caller misuse
const GENERIC_ERROR_MESSAGE: &str = "Unable to process request";

impl ApiError {
    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::NotFound(msg) => format!("Not found: {}", msg),
            ApiError::Scoring(ScoringError::InvalidInput(msg)) => msg.clone(),
            ApiError::Scoring(ScoringError::Persistence(callscore_common::Error::NotFound(msg)))
            | ApiError::Common(callscore_common::Error::NotFound(msg)) => {
                format!("Not found: {}", msg)
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Action request failed");

        let body = Json(json!({
            "error": self.public_message(),
            "timestamp": callscore_common::time::to_db_string(&callscore_common::time::now()),
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

//! Conversational assistant service client
//!
//! The remote scorer depends only on the [`AssistantService`] trait: create a
//! conversation, post a message, start a run, poll its status, list messages.
//! [`HttpAssistantClient`] implements it against an OpenAI-Assistants-style
//! REST API (threads / messages / runs).
//!
//! Clients are built per scoring call from that call's credentials through an
//! [`AssistantConnector`]; nothing is cached across tenants.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::ScoringError;
use crate::models::RemoteCredentials;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const USER_AGENT: &str = concat!("callscore-engine/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MESSAGE_PAGE_SIZE: u32 = 20;

// ============================================================================
// Protocol types
// ============================================================================

/// Run lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Cancelling,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    /// Status this client does not know; treated as still pending
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
                | RunStatus::RequiresAction
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Cancelling => "cancelling",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Unknown => "unknown",
        }
    }
}

/// A started unit of assistant work
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One conversation message with its text content flattened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantMessage {
    pub role: MessageRole,
    pub content: String,
}

impl AssistantMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Stateful conversation protocol of the external assistant service
///
/// `list_messages` returns messages newest first.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn create_conversation(&self) -> Result<String, ScoringError>;

    async fn post_message(&self, conversation_id: &str, content: &str) -> Result<(), ScoringError>;

    async fn start_run(&self, conversation_id: &str, assistant_id: &str) -> Result<Run, ScoringError>;

    async fn get_run_status(&self, conversation_id: &str, run_id: &str) -> Result<RunStatus, ScoringError>;

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<AssistantMessage>, ScoringError>;
}

/// Builds an [`AssistantService`] bound to one call's credentials
pub trait AssistantConnector: Send + Sync {
    fn connect(&self, credentials: &RemoteCredentials) -> Result<Box<dyn AssistantService>, ScoringError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct RunStatusResponse {
    status: RunStatus,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    role: MessageRole,
    content: WireContent,
}

/// Message content is either a plain string or a list of typed parts
#[derive(Deserialize)]
#[serde(untagged)]
enum WireContent {
    Plain(String),
    Parts(Vec<WirePart>),
}

#[derive(Deserialize)]
struct WirePart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<WireText>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireText {
    Value { value: String },
    Plain(String),
}

impl WireContent {
    fn flatten(self) -> String {
        match self {
            WireContent::Plain(text) => text,
            WireContent::Parts(parts) => parts
                .into_iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text)
                .map(|text| match text {
                    WireText::Value { value } => value,
                    WireText::Plain(value) => value,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Assistant service client over HTTP
pub struct HttpAssistantClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAssistantClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ScoringError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ScoringError::RemoteTransport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// Send and map non-success statuses to `RemoteApi`
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ScoringError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::RemoteApi {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ScoringError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ScoringError::RemoteTransport(format!("Malformed service response: {}", e)))
    }
}

#[async_trait]
impl AssistantService for HttpAssistantClient {
    async fn create_conversation(&self) -> Result<String, ScoringError> {
        let created: IdResponse = self
            .send_json(self.request(reqwest::Method::POST, "/threads").json(&json!({})))
            .await?;

        tracing::debug!(thread_id = %created.id, "Created assistant thread");
        Ok(created.id)
    }

    async fn post_message(&self, conversation_id: &str, content: &str) -> Result<(), ScoringError> {
        let path = format!("/threads/{}/messages", conversation_id);
        self.send(
            self.request(reqwest::Method::POST, &path)
                .json(&json!({ "role": "user", "content": content })),
        )
        .await?;

        Ok(())
    }

    async fn start_run(&self, conversation_id: &str, assistant_id: &str) -> Result<Run, ScoringError> {
        let path = format!("/threads/{}/runs", conversation_id);
        let run: Run = self
            .send_json(
                self.request(reqwest::Method::POST, &path)
                    .json(&json!({ "assistant_id": assistant_id })),
            )
            .await?;

        tracing::debug!(thread_id = %conversation_id, run_id = %run.id, "Started assistant run");
        Ok(run)
    }

    async fn get_run_status(&self, conversation_id: &str, run_id: &str) -> Result<RunStatus, ScoringError> {
        let path = format!("/threads/{}/runs/{}", conversation_id, run_id);
        let status: RunStatusResponse = self
            .send_json(self.request(reqwest::Method::GET, &path))
            .await?;

        Ok(status.status)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<AssistantMessage>, ScoringError> {
        let path = format!("/threads/{}/messages", conversation_id);
        let list: MessageList = self
            .send_json(
                self.request(reqwest::Method::GET, &path)
                    .query(&[("order", "desc".to_string()), ("limit", MESSAGE_PAGE_SIZE.to_string())]),
            )
            .await?;

        Ok(list
            .data
            .into_iter()
            .map(|message| AssistantMessage {
                role: message.role,
                content: message.content.flatten(),
            })
            .collect())
    }
}

/// Connector producing [`HttpAssistantClient`]s
#[derive(Debug, Clone)]
pub struct HttpAssistantConnector {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for HttpAssistantConnector {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AssistantConnector for HttpAssistantConnector {
    fn connect(&self, credentials: &RemoteCredentials) -> Result<Box<dyn AssistantService>, ScoringError> {
        let client = HttpAssistantClient::new(
            credentials.api_key.clone(),
            self.base_url.clone(),
            self.request_timeout,
        )?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_parsing() {
        let status: RunStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, RunStatus::InProgress);
        assert!(!status.is_terminal());

        let status: RunStatus = serde_json::from_str("\"expired\"").unwrap();
        assert!(status.is_terminal());

        let status: RunStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, RunStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_content_parts_are_flattened() {
        let message: WireMessage = serde_json::from_value(serde_json::json!({
            "role": "assistant",
            "content": [
                { "type": "text", "text": { "value": "first", "annotations": [] } },
                { "type": "image_file", "image_file": { "file_id": "f" } },
                { "type": "text", "text": { "value": "second" } }
            ]
        }))
        .unwrap();

        assert_eq!(message.content.flatten(), "first\nsecond");
    }

    #[test]
    fn test_plain_content_is_accepted() {
        let message: WireMessage =
            serde_json::from_value(serde_json::json!({ "role": "user", "content": "hi" })).unwrap();
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.content.flatten(), "hi");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpAssistantClient::new("k", "http://localhost:1234/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/threads"), "http://localhost:1234/v1/threads");
    }
}

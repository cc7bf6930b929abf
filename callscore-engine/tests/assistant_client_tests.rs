//! HTTP assistant client against a mock server
//!
//! Covers:
//! - thread / message / run / status / message-list requests and headers
//! - non-success status → `RemoteApi`
//! - malformed body → `RemoteTransport`
//! - a whole scoring call through the HTTP connector

mod helpers;

use callscore_engine::models::{Coaching, ScoringMethod};
use callscore_engine::services::{
    AssistantService, ConfigResolver, HttpAssistantClient, HttpAssistantConnector, MessageRole, RunPoller,
    RunStatus, ScoringCoordinator,
};
use callscore_engine::ScoringError;
use helpers::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpAssistantClient {
    HttpAssistantClient::new("sk-test", server.uri(), Duration::from_secs(5)).unwrap()
}

async fn mount_thread_protocol(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "thread_abc", "object": "thread" })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_abc/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/threads/thread_abc/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "run_1", "status": "queued" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/threads/thread_abc/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "run_1", "status": "completed" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/threads/thread_abc/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "role": "assistant", "content": [{ "type": "text", "text": { "value": reply, "annotations": [] } }] },
                { "role": "user", "content": [{ "type": "text", "text": { "value": "prompt" } }] }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_conversation_sends_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(header("OpenAI-Beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "thread_abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let thread_id = client(&server).create_conversation().await.unwrap();
    assert_eq!(thread_id, "thread_abc");
}

#[tokio::test]
async fn test_post_message_and_start_run_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_abc/messages"))
        .and(body_json(json!({ "role": "user", "content": "score this" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_abc/runs"))
        .and(body_json(json!({ "assistant_id": "asst_1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "run_9", "status": "in_progress" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.post_message("thread_abc", "score this").await.unwrap();
    let run = client.start_run("thread_abc", "asst_1").await.unwrap();

    assert_eq!(run.id, "run_9");
    assert_eq!(run.status, RunStatus::InProgress);
}

#[tokio::test]
async fn test_run_status_and_messages() {
    let server = MockServer::start().await;
    mount_thread_protocol(&server, "{\"credit\": 1}").await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_abc/messages"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "role": "assistant", "content": "plain reply" }]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let status = client.get_run_status("thread_abc", "run_1").await.unwrap();
    assert_eq!(status, RunStatus::Completed);

    let messages = client.list_messages("thread_abc").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, "plain reply");
}

#[tokio::test]
async fn test_error_status_is_remote_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    match client(&server).create_conversation().await {
        Err(ScoringError::RemoteApi { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected RemoteApi, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).create_conversation().await.unwrap_err();
    assert!(matches!(err, ScoringError::RemoteTransport(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let client = HttpAssistantClient::new("sk-test", "http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = client.create_conversation().await.unwrap_err();
    assert!(matches!(err, ScoringError::RemoteTransport(_)));
}

#[tokio::test]
async fn test_scoring_over_http_uses_remote_steps_and_default_coaching() {
    let server = MockServer::start().await;
    // every conversation returns the same step reply, so coaching cannot parse
    mount_thread_protocol(
        &server,
        r#"Assessment: {"credit": 1, "color": "green", "notes": "Covered", "reasoning": "Clear"}"#,
    )
    .await;

    let pool = memory_pool().await;
    seed_default_tenants(&pool).await;
    let connector = HttpAssistantConnector {
        base_url: server.uri(),
        request_timeout: Duration::from_secs(5),
    };
    let coordinator = ScoringCoordinator::new(
        ConfigResolver::new(pool.clone(), None),
        Arc::new(connector),
        RunPoller::new(fast_poll_settings()),
    );

    let score = coordinator
        .score_call(SILENT_TRANSCRIPT, REMOTE_TENANT, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(score.scoring_method, ScoringMethod::Remote);
    assert_eq!(score.total, 20);
    assert_eq!(score.coaching, Some(Coaching::fallback()));
    assert!(score
        .step_scores
        .iter()
        .all(|s| s.external_thread_ref.as_deref() == Some("thread_abc")));
}

#[tokio::test]
async fn test_service_outage_falls_back_to_local() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pool = memory_pool().await;
    seed_default_tenants(&pool).await;
    let coordinator = ScoringCoordinator::new(
        ConfigResolver::new(pool.clone(), None),
        Arc::new(HttpAssistantConnector {
            base_url: server.uri(),
            request_timeout: Duration::from_secs(5),
        }),
        RunPoller::new(fast_poll_settings()),
    );

    let score = coordinator
        .score_call(WINNING_TRANSCRIPT, REMOTE_TENANT, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(score.scoring_method, ScoringMethod::Local);
    assert_eq!(score.total, 20);
}

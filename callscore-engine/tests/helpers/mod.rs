//! Shared test utilities
//!
//! - in-memory SQLite pools with the full schema
//! - tenant seeding
//! - a scripted in-process assistant service

#![allow(dead_code)]

use async_trait::async_trait;
use callscore_engine::error::ScoringError;
use callscore_engine::models::{canonical_bridge_steps, BridgeStep, RemoteCredentials, TenantScoringConfig};
use callscore_engine::services::{
    AssistantConnector, AssistantMessage, AssistantService, ConfigResolver, PollSettings, Run,
    RunPoller, RunStatus, ScoringCoordinator,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REMOTE_TENANT: &str = "org-remote";
pub const LOCAL_TENANT: &str = "org-local";

/// Transcript that trips no heuristic keyword
pub const SILENT_TRANSCRIPT: &str =
    "Hello, thanks for joining. The weather was nice today. Okay, talk soon.";

/// Transcript that trips every full-credit threshold
pub const WINNING_TRANSCRIPT: &str = "\
Rep: What problem is your team facing with reporting today? How is that affecting your quarter?
Prospect: It's frustrating, we keep losing deals and the manual process is costing us hours.
Rep: What budget do you have set aside, who is the decision maker, and what's your timeline?
Prospect: About 50k, the VP will approve, and we need to go live this quarter.
Rep: Our solution will solve that. One feature will fix the reporting gap and help your team. \
For example, we helped a similar company cut reporting time in half. Any concern about rollout?
Prospect: I'm worried about training.
Rep: Fair question, onboarding is included. Does that help?
Rep: So the next step is a technical review, and we'll follow up with a proposal. \
I'll send over the pricing and let's get started.
Prospect: Ready to sign the contract once legal reviews.";

/// Single-connection pool so every query sees the same in-memory database
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    callscore_common::db::init_schema(&pool)
        .await
        .expect("create schema");
    pool
}

pub async fn seed_tenant(pool: &SqlitePool, config: TenantScoringConfig) {
    callscore_engine::db::tenants::upsert_tenant_config(pool, &config)
        .await
        .expect("seed tenant");
}

/// Remote-enabled organization and a local-only organization, canonical rubric
pub async fn seed_default_tenants(pool: &SqlitePool) {
    seed_tenant(
        pool,
        TenantScoringConfig {
            tenant_id: REMOTE_TENANT.to_string(),
            assistant_id: Some("asst_remote".to_string()),
            api_key: Some("sk-remote".to_string()),
            enabled: true,
            bridge_steps: canonical_bridge_steps(),
            ..Default::default()
        },
    )
    .await;
    seed_tenant(
        pool,
        TenantScoringConfig {
            tenant_id: LOCAL_TENANT.to_string(),
            enabled: false,
            ..Default::default()
        },
    )
    .await;
}

pub fn fast_poll_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(1),
        max_attempts: 20,
        timeout: Duration::from_secs(5),
    }
}

// ============================================================================
// Scripted assistant service
// ============================================================================

/// Shared script and call log
///
/// - every completed exchange consumes the next entry of `replies`
/// - every status poll consumes the next entry of `statuses`, then reports
///   `completed` once the queue is empty
#[derive(Default)]
pub struct Script {
    replies: Mutex<VecDeque<String>>,
    statuses: Mutex<VecDeque<RunStatus>>,
    prompts: Mutex<Vec<String>>,
    assistant_ids: Mutex<Vec<String>>,
    connected_keys: Mutex<Vec<String>>,
    threads: Mutex<u32>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(text.into());
        self
    }

    pub fn statuses(&self, statuses: Vec<RunStatus>) -> &Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn assistant_ids(&self) -> Vec<String> {
        self.assistant_ids.lock().unwrap().clone()
    }

    pub fn connected_keys(&self) -> Vec<String> {
        self.connected_keys.lock().unwrap().clone()
    }

    pub fn threads_created(&self) -> u32 {
        *self.threads.lock().unwrap()
    }
}

pub struct ScriptedService {
    script: Arc<Script>,
}

#[async_trait]
impl AssistantService for ScriptedService {
    async fn create_conversation(&self) -> Result<String, ScoringError> {
        let mut threads = self.script.threads.lock().unwrap();
        *threads += 1;
        Ok(format!("thread_{}", *threads))
    }

    async fn post_message(&self, _conversation_id: &str, content: &str) -> Result<(), ScoringError> {
        self.script.prompts.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn start_run(&self, conversation_id: &str, assistant_id: &str) -> Result<Run, ScoringError> {
        self.script.assistant_ids.lock().unwrap().push(assistant_id.to_string());
        Ok(Run {
            id: format!("run_{}", conversation_id),
            status: RunStatus::Queued,
        })
    }

    async fn get_run_status(&self, _conversation_id: &str, _run_id: &str) -> Result<RunStatus, ScoringError> {
        Ok(self
            .script
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RunStatus::Completed))
    }

    async fn list_messages(&self, _conversation_id: &str) -> Result<Vec<AssistantMessage>, ScoringError> {
        let reply = self
            .script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScoringError::RemoteTransport("script has no reply left".to_string()))?;
        let prompt = self.script.prompts.lock().unwrap().last().cloned().unwrap_or_default();

        Ok(vec![AssistantMessage::assistant(reply), AssistantMessage::user(prompt)])
    }
}

pub struct ScriptedConnector {
    pub script: Arc<Script>,
}

impl AssistantConnector for ScriptedConnector {
    fn connect(&self, credentials: &RemoteCredentials) -> Result<Box<dyn AssistantService>, ScoringError> {
        self.script
            .connected_keys
            .lock()
            .unwrap()
            .push(credentials.api_key.clone());
        Ok(Box::new(ScriptedService {
            script: Arc::clone(&self.script),
        }))
    }
}

pub fn coordinator(pool: &SqlitePool, script: &Arc<Script>, poll: PollSettings) -> ScoringCoordinator {
    ScoringCoordinator::new(
        ConfigResolver::new(pool.clone(), None),
        Arc::new(ScriptedConnector {
            script: Arc::clone(script),
        }),
        RunPoller::new(poll),
    )
}

pub fn step_reply(credit: &str, color: &str) -> String {
    format!(
        r#"Here is my assessment: {{"credit": {}, "color": "{}", "notes": "Evidence found", "reasoning": "Matches rubric"}}"#,
        credit, color
    )
}

pub const VALID_COACHING: &str = r#"{
    "thingsTheyDidWell": ["Strong discovery", "Clear agenda", "Confident close"],
    "areasForImprovement": [
        {"area": "Qualification", "howToImprove": "Confirm budget earlier", "bridgeStep": "qualify"},
        {"area": "Objections", "howToImprove": "Pause after concerns", "bridgeStep": "qa"},
        {"area": "Next steps", "howToImprove": "Name owners", "bridgeStep": "next_steps"}
    ]
}"#;

pub fn two_step_rubric() -> Vec<BridgeStep> {
    vec![
        BridgeStep::new("rapport", "Build Rapport", 2, 1).with_custom_prompt("Did the rep build rapport early?"),
        BridgeStep::new("qualify", "Qualify", 4, 2),
    ]
}

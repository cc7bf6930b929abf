//! Runtime configuration resolution for callscore-engine
//!
//! Service-wide values come from three tiers, highest priority first:
//! database `settings` → environment → TOML.

use callscore_common::config::TomlConfig;
use callscore_common::Result;
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tracing::{info, warn};

use crate::db::settings;
use crate::services::assistant_client::{HttpAssistantConnector, DEFAULT_BASE_URL};
use crate::services::run_poller::{
    PollSettings, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RUN_TIMEOUT_SECS,
};

pub const ASSISTANT_API_KEY_ENV: &str = "CALLSCORE_ASSISTANT_API_KEY";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolve the service-wide assistant API key
///
/// **Priority:** database → `CALLSCORE_ASSISTANT_API_KEY` → TOML `[assistant] api_key`
///
/// Returns `Ok(None)` when no tier holds a usable key; tenants without their
/// own key then score locally.
pub async fn resolve_assistant_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<Option<String>> {
    let db_key = settings::get_assistant_api_key(db).await?.filter(|k| is_valid_key(k));
    let env_key = std::env::var(ASSISTANT_API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.assistant.api_key.clone().filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        (db_key.is_some(), "database"),
        (env_key.is_some(), "environment"),
        (toml_key.is_some(), "TOML"),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, name)| *name)
    .collect();

    if sources.len() > 1 {
        warn!(
            "Assistant API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("Assistant API key loaded from {}", source);
    }

    Ok(db_key.or(env_key).or(toml_key))
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Poll budget: database settings → TOML → built-in defaults
pub async fn resolve_poll_settings(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<PollSettings> {
    let assistant = &toml_config.assistant;

    let interval_ms = settings::get_poll_interval_ms(db)
        .await?
        .or(assistant.poll_interval_ms)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    let max_attempts = settings::get_max_poll_attempts(db)
        .await?
        .or(assistant.max_poll_attempts)
        .unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS);
    let timeout_secs = settings::get_run_timeout_secs(db)
        .await?
        .or(assistant.run_timeout_secs)
        .unwrap_or(DEFAULT_RUN_TIMEOUT_SECS);

    Ok(PollSettings {
        interval: Duration::from_millis(interval_ms),
        max_attempts,
        timeout: Duration::from_secs(timeout_secs),
    })
}

/// HTTP connector settings from TOML
pub fn http_connector(toml_config: &TomlConfig) -> HttpAssistantConnector {
    let assistant = &toml_config.assistant;
    HttpAssistantConnector {
        base_url: assistant
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        request_timeout: Duration::from_secs(
            assistant.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        ),
    }
}

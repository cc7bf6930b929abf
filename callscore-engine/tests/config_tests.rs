//! Service-wide configuration resolution (database → environment → TOML)

mod helpers;

use callscore_common::config::{AssistantConfig, TomlConfig};
use callscore_engine::config::{resolve_assistant_api_key, resolve_poll_settings, ASSISTANT_API_KEY_ENV};
use callscore_engine::db::settings;
use helpers::memory_pool;
use serial_test::serial;
use std::time::Duration;

fn toml_with_key(key: Option<&str>) -> TomlConfig {
    TomlConfig {
        assistant: AssistantConfig {
            api_key: key.map(str::to_string),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
#[serial]
async fn test_database_key_wins() {
    let pool = memory_pool().await;
    settings::set_assistant_api_key(&pool, "sk-db").await.unwrap();
    std::env::set_var(ASSISTANT_API_KEY_ENV, "sk-env");

    let key = resolve_assistant_api_key(&pool, &toml_with_key(Some("sk-toml"))).await.unwrap();

    std::env::remove_var(ASSISTANT_API_KEY_ENV);
    assert_eq!(key.as_deref(), Some("sk-db"));
}

#[tokio::test]
#[serial]
async fn test_environment_key_beats_toml() {
    let pool = memory_pool().await;
    std::env::set_var(ASSISTANT_API_KEY_ENV, "sk-env");

    let key = resolve_assistant_api_key(&pool, &toml_with_key(Some("sk-toml"))).await.unwrap();

    std::env::remove_var(ASSISTANT_API_KEY_ENV);
    assert_eq!(key.as_deref(), Some("sk-env"));
}

#[tokio::test]
#[serial]
async fn test_blank_values_are_skipped() {
    let pool = memory_pool().await;
    settings::set_assistant_api_key(&pool, "   ").await.unwrap();
    std::env::set_var(ASSISTANT_API_KEY_ENV, "");

    let key = resolve_assistant_api_key(&pool, &toml_with_key(Some("sk-toml"))).await.unwrap();

    std::env::remove_var(ASSISTANT_API_KEY_ENV);
    assert_eq!(key.as_deref(), Some("sk-toml"));
}

#[tokio::test]
#[serial]
async fn test_no_key_anywhere_is_none() {
    let pool = memory_pool().await;
    std::env::remove_var(ASSISTANT_API_KEY_ENV);

    let key = resolve_assistant_api_key(&pool, &toml_with_key(None)).await.unwrap();
    assert_eq!(key, None);
}

#[tokio::test]
async fn test_poll_settings_prefer_database_then_toml() {
    let pool = memory_pool().await;
    settings::set_setting(&pool, settings::ASSISTANT_POLL_INTERVAL_MS, 250).await.unwrap();
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(settings::ASSISTANT_RUN_TIMEOUT_SECS)
        .execute(&pool)
        .await
        .unwrap();

    let toml = TomlConfig {
        assistant: AssistantConfig {
            poll_interval_ms: Some(5000),
            run_timeout_secs: Some(45),
            ..Default::default()
        },
        ..Default::default()
    };
    let poll = resolve_poll_settings(&pool, &toml).await.unwrap();

    assert_eq!(poll.interval, Duration::from_millis(250));
    assert_eq!(poll.max_attempts, 120);
    assert_eq!(poll.timeout, Duration::from_secs(45));
}

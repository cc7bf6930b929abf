//! Settings database operations
//!
//! Key-value accessors over the `settings` table. Values are stored as text
//! and parsed on read.

use callscore_common::{Error, Result};
use sqlx::{Pool, Sqlite};

pub const ASSISTANT_API_KEY: &str = "assistant_api_key";
pub const DB_MAX_LOCK_WAIT_MS: &str = "db_max_lock_wait_ms";
pub const ASSISTANT_POLL_INTERVAL_MS: &str = "assistant_poll_interval_ms";
pub const ASSISTANT_MAX_POLL_ATTEMPTS: &str = "assistant_max_poll_attempts";
pub const ASSISTANT_RUN_TIMEOUT_SECS: &str = "assistant_run_timeout_secs";

const DEFAULT_DB_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Service-wide assistant API key, if stored
pub async fn get_assistant_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, ASSISTANT_API_KEY).await
}

pub async fn set_assistant_api_key(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    set_setting(db, ASSISTANT_API_KEY, key).await
}

/// Lock retry budget for score writes
///
/// **Default:** 5000 ms
pub async fn get_db_max_lock_wait_ms(db: &Pool<Sqlite>) -> Result<u64> {
    get_setting(db, DB_MAX_LOCK_WAIT_MS)
        .await
        .map(|opt| opt.unwrap_or(DEFAULT_DB_MAX_LOCK_WAIT_MS))
}

pub async fn get_poll_interval_ms(db: &Pool<Sqlite>) -> Result<Option<u64>> {
    get_setting(db, ASSISTANT_POLL_INTERVAL_MS).await
}

pub async fn get_max_poll_attempts(db: &Pool<Sqlite>) -> Result<Option<u32>> {
    get_setting(db, ASSISTANT_MAX_POLL_ATTEMPTS).await
}

pub async fn get_run_timeout_secs(db: &Pool<Sqlite>) -> Result<Option<u64>> {
    get_setting(db, ASSISTANT_RUN_TIMEOUT_SECS).await
}

/// Generic setting getter
///
/// Missing rows and NULL values both read as `None`.
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row.and_then(|(value,)| value) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Setting '{}' has invalid value '{}': {}", key, value, e))),
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

//! Database initialization
//!
//! Creates the SQLite database on first run and brings every table the engine
//! needs into existence. All statements are idempotent, so calling
//! [`init_database`] on an existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Default settings written on first run (key, value)
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("db_max_lock_wait_ms", "5000"),
    ("assistant_poll_interval_ms", "1000"),
    ("assistant_max_poll_attempts", "120"),
    ("assistant_run_timeout_secs", "180"),
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets readers proceed while a score is being written
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 250").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and default settings on an open pool
///
/// Used directly by tests running against `sqlite::memory:`.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_tenant_scoring_config_table(pool).await?;
    create_bridge_steps_table(pool).await?;
    create_calls_table(pool).await?;
    create_rescore_audit_table(pool).await?;
    init_default_settings(pool).await?;
    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-tenant scoring configuration
///
/// A tenant is an organization or a client; clients may reference a parent
/// organization through `parent_id`.
pub async fn create_tenant_scoring_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenant_scoring_config (
            tenant_id TEXT PRIMARY KEY,
            parent_id TEXT,
            assistant_id TEXT,
            api_key TEXT,
            remote_enabled INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_bridge_steps_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bridge_steps (
            tenant_id TEXT NOT NULL,
            step_key TEXT NOT NULL,
            name TEXT NOT NULL,
            weight INTEGER NOT NULL CHECK (weight > 0),
            step_order INTEGER NOT NULL,
            custom_prompt TEXT,
            PRIMARY KEY (tenant_id, step_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Call records with their latest score
///
/// Score columns are NULL until the call has been scored once.
pub async fn create_calls_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calls (
            call_id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            transcript TEXT NOT NULL,
            score_total INTEGER,
            step_scores TEXT,
            coaching TEXT,
            scoring_method TEXT,
            scored_at TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only rescore audit trail
pub async fn create_rescore_audit_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rescore_audit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL,
            old_total INTEGER,
            new_total INTEGER NOT NULL,
            old_method TEXT,
            new_method TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_rescore_audit_call ON rescore_audit(call_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert default settings without overwriting existing values
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULT_SETTINGS {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    Ok(())
}

//! Tenant scoring configuration
//!
//! One `tenant_scoring_config` row per organization or client, plus the
//! tenant's rubric in `bridge_steps`. Rows are written by the admin side of
//! the product; the engine only reads them. `upsert_tenant_config` exists for
//! seeding and tests.

use callscore_common::Result;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{BridgeStep, TenantScoringConfig};

/// Load a tenant's configuration with its bridge steps (sorted by order)
///
/// Returns `Ok(None)` when the tenant has no configuration row.
pub async fn get_tenant_config(db: &Pool<Sqlite>, tenant_id: &str) -> Result<Option<TenantScoringConfig>> {
    let row = sqlx::query(
        "SELECT tenant_id, parent_id, assistant_id, api_key, remote_enabled
         FROM tenant_scoring_config WHERE tenant_id = ?",
    )
    .bind(tenant_id)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let bridge_steps = get_bridge_steps(db, tenant_id).await?;

    Ok(Some(TenantScoringConfig {
        tenant_id: row.try_get("tenant_id")?,
        parent_id: row.try_get("parent_id")?,
        assistant_id: row.try_get("assistant_id")?,
        api_key: row.try_get("api_key")?,
        enabled: row.try_get::<i64, _>("remote_enabled")? != 0,
        bridge_steps,
    }))
}

/// Bridge steps configured for a tenant, sorted by order
pub async fn get_bridge_steps(db: &Pool<Sqlite>, tenant_id: &str) -> Result<Vec<BridgeStep>> {
    let rows = sqlx::query(
        "SELECT step_key, name, weight, step_order, custom_prompt
         FROM bridge_steps WHERE tenant_id = ?
         ORDER BY step_order, step_key",
    )
    .bind(tenant_id)
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| -> Result<BridgeStep> {
            Ok(BridgeStep {
                key: row.try_get("step_key")?,
                name: row.try_get("name")?,
                weight: row.try_get::<i64, _>("weight")?.max(0) as u32,
                order: row.try_get::<i64, _>("step_order")? as i32,
                custom_prompt: row.try_get("custom_prompt")?,
            })
        })
        .collect()
}

/// Insert or replace a tenant's configuration and rubric
pub async fn upsert_tenant_config(db: &Pool<Sqlite>, config: &TenantScoringConfig) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO tenant_scoring_config (tenant_id, parent_id, assistant_id, api_key, remote_enabled, updated_at)
         VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(tenant_id) DO UPDATE SET
            parent_id = excluded.parent_id,
            assistant_id = excluded.assistant_id,
            api_key = excluded.api_key,
            remote_enabled = excluded.remote_enabled,
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(&config.tenant_id)
    .bind(&config.parent_id)
    .bind(&config.assistant_id)
    .bind(&config.api_key)
    .bind(config.enabled as i64)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM bridge_steps WHERE tenant_id = ?")
        .bind(&config.tenant_id)
        .execute(&mut *tx)
        .await?;

    for step in &config.bridge_steps {
        sqlx::query(
            "INSERT INTO bridge_steps (tenant_id, step_key, name, weight, step_order, custom_prompt)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&config.tenant_id)
        .bind(&step.key)
        .bind(&step.name)
        .bind(step.weight as i64)
        .bind(step.order as i64)
        .bind(&step.custom_prompt)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

//! Rescore audit trail (append-only)

use callscore_common::time::{from_db_string, to_db_string};
use callscore_common::{Error, Result};
use sqlx::{Pool, Row, Sqlite};

use crate::models::{RescoreAuditEntry, ScoringMethod};

pub async fn append_audit_entry(db: &Pool<Sqlite>, entry: &RescoreAuditEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO rescore_audit (call_id, old_total, new_total, old_method, new_method, actor_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.call_id)
    .bind(entry.old_total)
    .bind(entry.new_total)
    .bind(entry.old_method.map(ScoringMethod::as_str))
    .bind(entry.new_method.as_str())
    .bind(&entry.actor_id)
    .bind(to_db_string(&entry.timestamp))
    .execute(db)
    .await?;

    Ok(())
}

/// Audit entries for a call, oldest first
pub async fn list_audit_entries(db: &Pool<Sqlite>, call_id: &str) -> Result<Vec<RescoreAuditEntry>> {
    let rows = sqlx::query(
        "SELECT call_id, old_total, new_total, old_method, new_method, actor_id, created_at
         FROM rescore_audit WHERE call_id = ? ORDER BY id",
    )
    .bind(call_id)
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| -> Result<RescoreAuditEntry> {
            let old_method: Option<String> = row.try_get("old_method")?;
            let new_method: String = row.try_get("new_method")?;
            let created_at: String = row.try_get("created_at")?;

            Ok(RescoreAuditEntry {
                call_id: row.try_get("call_id")?,
                old_total: row.try_get("old_total")?,
                new_total: row.try_get("new_total")?,
                old_method: old_method.as_deref().and_then(ScoringMethod::parse),
                new_method: ScoringMethod::parse(&new_method)
                    .ok_or_else(|| Error::Internal(format!("Invalid audit method: {}", new_method)))?,
                actor_id: row.try_get("actor_id")?,
                timestamp: from_db_string(&created_at)
                    .ok_or_else(|| Error::Internal(format!("Invalid audit timestamp: {}", created_at)))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use callscore_common::time::now;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_entries_listed_in_insertion_order() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        callscore_common::db::init_schema(&pool).await.unwrap();

        let first = RescoreAuditEntry {
            call_id: "call-1".to_string(),
            old_total: None,
            new_total: 8,
            old_method: None,
            new_method: ScoringMethod::Local,
            actor_id: "user-1".to_string(),
            timestamp: now(),
        };
        let second = RescoreAuditEntry {
            old_total: Some(8),
            new_total: 14,
            old_method: Some(ScoringMethod::Local),
            new_method: ScoringMethod::Remote,
            ..first.clone()
        };

        append_audit_entry(&pool, &first).await.unwrap();
        append_audit_entry(&pool, &second).await.unwrap();

        let entries = list_audit_entries(&pool, "call-1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].old_total, None);
        assert_eq!(entries[0].old_method, None);
        assert_eq!(entries[1].old_total, Some(8));
        assert_eq!(entries[1].new_method, ScoringMethod::Remote);
        assert!(list_audit_entries(&pool, "call-2").await.unwrap().is_empty());
    }
}

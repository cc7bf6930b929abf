//! Call records
//!
//! A call row holds the transcript, its owning tenant, and the latest score.
//! Score columns are written together; `score_total IS NULL` means the call
//! has never been scored.

use callscore_common::time::{from_db_string, to_db_string};
use callscore_common::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::models::{CallScore, Coaching, ScoringMethod, StepScore};

/// Stored call with its latest score
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call_id: String,
    pub tenant_id: String,
    pub transcript: String,
    pub score: Option<CallScore>,
}

/// Create a call record and return its generated id
pub async fn insert_call(db: &Pool<Sqlite>, tenant_id: &str, transcript: &str) -> Result<String> {
    let call_id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO calls (call_id, tenant_id, transcript) VALUES (?, ?, ?)")
        .bind(&call_id)
        .bind(tenant_id)
        .bind(transcript)
        .execute(db)
        .await?;

    Ok(call_id)
}

pub async fn get_call(db: &Pool<Sqlite>, call_id: &str) -> Result<Option<CallRecord>> {
    let row = sqlx::query(
        "SELECT call_id, tenant_id, transcript, score_total, step_scores, coaching, scoring_method, scored_at
         FROM calls WHERE call_id = ?",
    )
    .bind(call_id)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let score = match row.try_get::<Option<i64>, _>("score_total")? {
        Some(total) => Some(decode_score(
            total,
            row.try_get("step_scores")?,
            row.try_get("coaching")?,
            row.try_get("scoring_method")?,
            row.try_get("scored_at")?,
        )?),
        None => None,
    };

    Ok(Some(CallRecord {
        call_id: row.try_get("call_id")?,
        tenant_id: row.try_get("tenant_id")?,
        transcript: row.try_get("transcript")?,
        score,
    }))
}

fn decode_score(
    total: i64,
    step_scores: Option<String>,
    coaching: Option<String>,
    scoring_method: Option<String>,
    scored_at: Option<String>,
) -> Result<CallScore> {
    let step_scores: Vec<StepScore> = match step_scores {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| Error::Internal(format!("Stored step scores are invalid: {}", e)))?,
        None => Vec::new(),
    };

    let coaching: Option<Coaching> = coaching
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| Error::Internal(format!("Stored coaching is invalid: {}", e)))?;

    let scoring_method = scoring_method
        .as_deref()
        .and_then(ScoringMethod::parse)
        .ok_or_else(|| Error::Internal(format!("Stored scoring method is invalid: {:?}", scoring_method)))?;

    let scored_at = scored_at
        .as_deref()
        .and_then(from_db_string)
        .ok_or_else(|| Error::Internal(format!("Stored scored_at is invalid: {:?}", scored_at)))?;

    Ok(CallScore {
        total,
        step_scores,
        coaching,
        scoring_method,
        scored_at,
    })
}

/// Replace the stored score of an existing call
///
/// Fails with `NotFound` when no row matches `call_id`.
pub async fn update_call_score(db: &Pool<Sqlite>, call_id: &str, score: &CallScore) -> Result<()> {
    let step_scores = serde_json::to_string(&score.step_scores)
        .map_err(|e| Error::Internal(format!("Serialize step scores failed: {}", e)))?;
    let coaching = score
        .coaching
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Serialize coaching failed: {}", e)))?;

    let result = sqlx::query(
        "UPDATE calls SET
            score_total = ?,
            step_scores = ?,
            coaching = ?,
            scoring_method = ?,
            scored_at = ?
         WHERE call_id = ?",
    )
    .bind(score.total)
    .bind(step_scores)
    .bind(coaching)
    .bind(score.scoring_method.as_str())
    .bind(to_db_string(&score.scored_at))
    .bind(call_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("call {}", call_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::heuristic_scorer::LocalHeuristicScorer;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        callscore_common::db::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_new_call_has_no_score() {
        let pool = setup_test_db().await;
        let call_id = insert_call(&pool, "org-1", "hello").await.unwrap();

        let record = get_call(&pool, &call_id).await.unwrap().unwrap();
        assert_eq!(record.tenant_id, "org-1");
        assert_eq!(record.transcript, "hello");
        assert!(record.score.is_none());
    }

    #[tokio::test]
    async fn test_score_roundtrip() {
        let pool = setup_test_db().await;
        let call_id = insert_call(&pool, "org-1", "what problem is costing you?").await.unwrap();
        let score = LocalHeuristicScorer::new().score("what problem is costing you?");

        update_call_score(&pool, &call_id, &score).await.unwrap();

        let stored = get_call(&pool, &call_id).await.unwrap().unwrap().score.unwrap();
        assert_eq!(stored.total, score.total);
        assert_eq!(stored.step_scores, score.step_scores);
        assert_eq!(stored.coaching, score.coaching);
        assert_eq!(stored.scoring_method, ScoringMethod::Local);
        assert_eq!(
            stored.scored_at.timestamp_millis(),
            score.scored_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_update_missing_call_is_not_found() {
        let pool = setup_test_db().await;
        let score = LocalHeuristicScorer::new().score("");

        let err = update_call_score(&pool, "missing", &score).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

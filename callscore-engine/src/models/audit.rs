//! Rescore audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScoringMethod;

/// Before/after record of one rescore; appended, never mutated
///
/// `old_total`/`old_method` are `None` when the call had not been scored before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescoreAuditEntry {
    pub call_id: String,
    pub old_total: Option<i64>,
    pub new_total: i64,
    pub old_method: Option<ScoringMethod>,
    pub new_method: ScoringMethod,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
}

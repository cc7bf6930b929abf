//! Data models for the call scoring engine
//!
//! All persisted/serialized shapes use camelCase field names so existing
//! consumers of the score JSON keep working.

pub mod audit;
pub mod bridge_step;
pub mod call_score;
pub mod tenant;

pub use audit::RescoreAuditEntry;
pub use bridge_step::{canonical_bridge_steps, BridgeStep, CanonicalStep};
pub use call_score::{
    weighted_total, CallScore, Coaching, ImprovementArea, ScoreColor, ScoreCredit, ScoringMethod,
    StepScore,
};
pub use tenant::{RemoteCredentials, ScoringContext, TenantScoringConfig};

//! Tenant scoring configuration and per-request scoring context

use serde::{Deserialize, Serialize};
use std::fmt;

use super::BridgeStep;

/// Scoring configuration for one organization or client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantScoringConfig {
    pub tenant_id: String,
    /// Parent organization for client tenants
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub bridge_steps: Vec<BridgeStep>,
}

/// Credentials for the remote assistant path
///
/// `Debug` redacts the API key so credentials never reach the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub assistant_id: String,
    pub api_key: String,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("assistant_id", &self.assistant_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Everything one scoring request needs; created per request, never persisted
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub transcript: String,
    pub org_or_client_id: String,
    pub remote_credentials: Option<RemoteCredentials>,
}

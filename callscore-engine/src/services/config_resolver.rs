//! Tenant scoring route resolution
//!
//! Decides, per organization or client, whether the remote assistant path is
//! usable and which rubric applies.
//!
//! **Rules:**
//! - Remote only when an assistant id, an API key and the tenant's own
//!   `enabled` flag are all present
//! - A client inherits missing assistant id, API key and bridge steps from its
//!   parent organization; `enabled` is never inherited
//! - With no tenant or parent key, the service-wide key is used
//! - No configured steps anywhere in the chain → canonical rubric
//! - Unknown tenant or invalid rubric → `ScoringError::Configuration`

use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::config::is_valid_key;
use crate::db::tenants;
use crate::error::ScoringError;
use crate::models::{canonical_bridge_steps, BridgeStep, RemoteCredentials, TenantScoringConfig};

/// Which scorer a call should go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringRoute {
    Remote(RemoteCredentials),
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScoringConfig {
    pub route: ScoringRoute,
    /// Sorted by `order`
    pub bridge_steps: Vec<BridgeStep>,
}

pub struct ConfigResolver {
    db: SqlitePool,
    service_api_key: Option<String>,
}

impl ConfigResolver {
    pub fn new(db: SqlitePool, service_api_key: Option<String>) -> Self {
        Self {
            db,
            service_api_key: service_api_key.filter(|k| is_valid_key(k)),
        }
    }

    pub async fn resolve(&self, tenant_id: &str) -> Result<ResolvedScoringConfig, ScoringError> {
        let tenant = tenants::get_tenant_config(&self.db, tenant_id)
            .await?
            .ok_or_else(|| ScoringError::Configuration(format!("no scoring configuration for tenant {}", tenant_id)))?;

        let parent = match tenant.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = tenants::get_tenant_config(&self.db, parent_id).await?;
                if parent.is_none() {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        parent_id = %parent_id,
                        "Parent organization has no scoring configuration"
                    );
                }
                parent
            }
            None => None,
        };

        let resolved = resolve_config(&tenant, parent.as_ref(), self.service_api_key.as_deref())?;

        tracing::debug!(
            tenant_id = %tenant_id,
            remote = matches!(resolved.route, ScoringRoute::Remote(_)),
            steps = resolved.bridge_steps.len(),
            "Resolved scoring configuration"
        );

        Ok(resolved)
    }
}

fn non_blank(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

/// Apply inheritance and the remote-route contract to loaded records
pub fn resolve_config(
    tenant: &TenantScoringConfig,
    parent: Option<&TenantScoringConfig>,
    service_api_key: Option<&str>,
) -> Result<ResolvedScoringConfig, ScoringError> {
    let assistant_id = non_blank(&tenant.assistant_id).or_else(|| parent.and_then(|p| non_blank(&p.assistant_id)));

    let api_key = non_blank(&tenant.api_key)
        .or_else(|| parent.and_then(|p| non_blank(&p.api_key)))
        .map(String::as_str)
        .or(service_api_key.filter(|k| is_valid_key(k)));

    let configured_steps = if !tenant.bridge_steps.is_empty() {
        tenant.bridge_steps.clone()
    } else {
        parent.map(|p| p.bridge_steps.clone()).unwrap_or_default()
    };

    let bridge_steps = if configured_steps.is_empty() {
        canonical_bridge_steps()
    } else {
        validate_bridge_steps(configured_steps)?
    };

    let route = match (tenant.enabled, assistant_id, api_key) {
        (true, Some(assistant_id), Some(api_key)) => ScoringRoute::Remote(RemoteCredentials {
            assistant_id: assistant_id.clone(),
            api_key: api_key.to_string(),
        }),
        _ => ScoringRoute::Local,
    };

    Ok(ResolvedScoringConfig { route, bridge_steps })
}

/// Reject empty or duplicate keys and non-positive weights; sort by order
pub fn validate_bridge_steps(mut steps: Vec<BridgeStep>) -> Result<Vec<BridgeStep>, ScoringError> {
    let mut keys = HashSet::new();

    for step in &steps {
        if step.key.trim().is_empty() {
            return Err(ScoringError::Configuration("bridge step with empty key".to_string()));
        }
        if step.weight == 0 {
            return Err(ScoringError::Configuration(format!(
                "bridge step '{}' must have a positive weight",
                step.key
            )));
        }
        if !keys.insert(step.key.as_str()) {
            return Err(ScoringError::Configuration(format!("duplicate bridge step key '{}'", step.key)));
        }
    }

    steps.sort_by_key(|s| s.order);
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantScoringConfig {
        TenantScoringConfig {
            tenant_id: id.to_string(),
            ..Default::default()
        }
    }

    fn remote_org() -> TenantScoringConfig {
        TenantScoringConfig {
            assistant_id: Some("asst_org".to_string()),
            api_key: Some("sk-org".to_string()),
            enabled: true,
            ..tenant("org-1")
        }
    }

    #[test]
    fn test_fully_configured_tenant_is_remote() {
        let resolved = resolve_config(&remote_org(), None, None).unwrap();

        assert_eq!(
            resolved.route,
            ScoringRoute::Remote(RemoteCredentials {
                assistant_id: "asst_org".to_string(),
                api_key: "sk-org".to_string(),
            })
        );
        assert_eq!(resolved.bridge_steps, canonical_bridge_steps());
    }

    #[test]
    fn test_each_missing_requirement_means_local() {
        let disabled = TenantScoringConfig { enabled: false, ..remote_org() };
        let no_assistant = TenantScoringConfig { assistant_id: None, ..remote_org() };
        let blank_key = TenantScoringConfig { api_key: Some("  ".to_string()), ..remote_org() };

        for config in [disabled, no_assistant, blank_key] {
            assert_eq!(resolve_config(&config, None, None).unwrap().route, ScoringRoute::Local);
        }
    }

    #[test]
    fn test_service_key_fills_missing_tenant_key() {
        let config = TenantScoringConfig { api_key: None, ..remote_org() };
        let resolved = resolve_config(&config, None, Some("sk-service")).unwrap();

        match resolved.route {
            ScoringRoute::Remote(creds) => assert_eq!(creds.api_key, "sk-service"),
            other => panic!("expected remote, got {:?}", other),
        }
    }

    #[test]
    fn test_client_inherits_from_parent_but_not_enabled() {
        let client = TenantScoringConfig {
            parent_id: Some("org-1".to_string()),
            enabled: true,
            ..tenant("client-1")
        };
        let resolved = resolve_config(&client, Some(&remote_org()), None).unwrap();
        match resolved.route {
            ScoringRoute::Remote(creds) => {
                assert_eq!(creds.assistant_id, "asst_org");
                assert_eq!(creds.api_key, "sk-org");
            }
            other => panic!("expected remote, got {:?}", other),
        }

        let disabled_client = TenantScoringConfig { enabled: false, ..client };
        let resolved = resolve_config(&disabled_client, Some(&remote_org()), None).unwrap();
        assert_eq!(resolved.route, ScoringRoute::Local);
    }

    #[test]
    fn test_client_steps_override_parent_steps() {
        let parent = TenantScoringConfig {
            bridge_steps: vec![BridgeStep::new("discovery", "Discovery", 4, 1)],
            ..remote_org()
        };
        let client = tenant("client-1");
        assert_eq!(
            resolve_config(&client, Some(&parent), None).unwrap().bridge_steps[0].key,
            "discovery"
        );

        let client = TenantScoringConfig {
            bridge_steps: vec![
                BridgeStep::new("close", "Close", 2, 2),
                BridgeStep::new("open", "Open", 1, 1),
            ],
            ..tenant("client-1")
        };
        let steps = resolve_config(&client, Some(&parent), None).unwrap().bridge_steps;
        assert_eq!(steps.iter().map(|s| s.key.as_str()).collect::<Vec<_>>(), vec!["open", "close"]);
    }

    #[test]
    fn test_invalid_steps_are_configuration_errors() {
        let duplicate = vec![BridgeStep::new("a", "A", 1, 1), BridgeStep::new("a", "A again", 2, 2)];
        assert!(matches!(
            validate_bridge_steps(duplicate),
            Err(ScoringError::Configuration(_))
        ));

        let zero_weight = vec![BridgeStep::new("a", "A", 0, 1)];
        assert!(validate_bridge_steps(zero_weight).is_err());

        let empty_key = vec![BridgeStep::new(" ", "Blank", 1, 1)];
        assert!(validate_bridge_steps(empty_key).is_err());
    }
}

//! callscore-engine library interface
//!
//! Exposes the scoring engine and its HTTP router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, ScoringError};

use axum::Router;
use callscore_common::config::TomlConfig;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{
    AssistantConnector, ConfigResolver, RunPoller, ScoreRecorder, ScoringCoordinator,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub coordinator: Arc<ScoringCoordinator>,
    pub recorder: Arc<ScoreRecorder>,
    /// Parent of every per-request cancellation token; cancelled on shutdown
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Public message of the last failed action request
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, coordinator: Arc<ScoringCoordinator>) -> Self {
        let recorder = Arc::new(ScoreRecorder::new(db.clone(), Arc::clone(&coordinator)));
        Self {
            db,
            coordinator,
            recorder,
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Wire the engine from stored settings and TOML
    ///
    /// The service-wide API key and poll budget are resolved once here.
    pub async fn from_config(
        db: SqlitePool,
        toml_config: &TomlConfig,
        connector: Arc<dyn AssistantConnector>,
    ) -> callscore_common::Result<Self> {
        let service_api_key = config::resolve_assistant_api_key(&db, toml_config).await?;
        let poll_settings = config::resolve_poll_settings(&db, toml_config).await?;

        tracing::info!(
            poll_interval_ms = poll_settings.interval.as_millis() as u64,
            max_poll_attempts = poll_settings.max_attempts,
            run_timeout_secs = poll_settings.timeout.as_secs(),
            service_key = service_api_key.is_some(),
            "Scoring engine configured"
        );

        let resolver = ConfigResolver::new(db.clone(), service_api_key);
        let coordinator = Arc::new(ScoringCoordinator::new(
            resolver,
            connector,
            RunPoller::new(poll_settings),
        ));

        Ok(Self::new(db, coordinator))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::action_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

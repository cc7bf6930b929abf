//! Scoring services

pub mod assistant_client;
pub mod config_resolver;
pub mod heuristic_scorer;
pub mod prompts;
pub mod remote_scorer;
pub mod response_parser;
pub mod run_poller;
pub mod score_recorder;
pub mod scoring_coordinator;

pub use assistant_client::{
    AssistantConnector, AssistantMessage, AssistantService, HttpAssistantClient, HttpAssistantConnector,
    MessageRole, Run, RunStatus,
};
pub use config_resolver::{ConfigResolver, ResolvedScoringConfig, ScoringRoute};
pub use heuristic_scorer::LocalHeuristicScorer;
pub use remote_scorer::RemoteAssistantScorer;
pub use run_poller::{PollSettings, RunPoller};
pub use score_recorder::ScoreRecorder;
pub use scoring_coordinator::ScoringCoordinator;

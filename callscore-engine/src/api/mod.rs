//! HTTP API

pub mod actions;
pub mod health;

pub use actions::action_routes;
pub use health::health_routes;

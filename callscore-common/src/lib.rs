//! # Callscore Common Library
//!
//! Shared code for the call scoring service including:
//! - Error types
//! - Bootstrap configuration (TOML, root folder resolution)
//! - Database initialization
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};

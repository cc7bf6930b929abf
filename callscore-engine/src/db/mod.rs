//! Database access for callscore-engine
//!
//! Schema creation lives in `callscore_common::db`; this module holds the
//! engine's reads and writes against it.

pub mod audit;
pub mod calls;
pub mod settings;
pub mod tenants;

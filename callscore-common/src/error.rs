//! Storage and bootstrap errors
//!
//! The engine wraps these in its own scoring taxonomy; nothing here is shown
//! to API callers except the `NotFound` text.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query, pool or migration failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or config file could not be read or created
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparsable TOML, or a settings row holding a value of the wrong type
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No call record (or tenant) with the given id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored JSON that no longer decodes, or lock retries exhausted
    #[error("Internal error: {0}")]
    Internal(String),
}

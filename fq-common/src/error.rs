//! Shared error type for the FarmQuest crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by bootstrap configuration, storage setup and settings
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite failure during open, schema creation, migration or settings access
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or config file could not be read or created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML or unparseable setting value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

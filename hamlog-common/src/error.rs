//! Error types shared by the HamLog crates

use thiserror::Error;

/// Result alias used throughout `hamlog-common` and the server's repositories
pub type Result<T> = std::result::Result<T, Error>;

/// Library-level errors
///
/// The server maps these onto HTTP status codes in its own `ApiError`.
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure (database directory, TOML file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record does not exist or is not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Field-level validation failure on user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credentials rejected (wrong password, unknown account, expired token)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Unexpected internal state (corrupt row, serialization failure)
    #[error("Internal error: {0}")]
    Internal(String),
}

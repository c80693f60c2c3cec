//! Error types for extfix.

use thiserror::Error;

/// Result type alias using extfix's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for extfix operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Search service failure
    #[error("Search error: {0}")]
    Search(String),

    /// A search result page could not be retrieved after retries
    #[error("Search page {offset} for search {search_id} failed after {attempts} attempts")]
    SearchPageExhausted {
        search_id: i64,
        offset: i64,
        attempts: u32,
    },

    /// File-record store failure
    #[error("File store error: {0}")]
    FileStore(String),

    /// File content could not be read for classification
    #[error("Content read error for {location}: {source}")]
    ContentRead {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

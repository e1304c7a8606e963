//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// Nothing is retried or recovered locally: connectivity, storage and
/// serialization failures all surface to the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed (connect, TLS, auth, fetch).
    #[error("IMAP error: {0}")]
    Imap(#[from] mailstash_imap::Error),

    /// Cache document could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache document could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Another writer holds the cache lock.
    #[error("cache is locked by another writer (lock file: {0})")]
    CacheLocked(PathBuf),

    /// HTTP request to the assistant provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Assistant provider returned an unusable response.
    #[error("Assistant error: {0}")]
    Assistant(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

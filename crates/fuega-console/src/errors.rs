//! Error types for the console runtime.
//!
//! Transport failures and malformed frames are absorbed by the pipeline
//! itself (they become state changes or dropped frames, never errors); what
//! remains here is what callers of the API client and configuration loader
//! can actually observe.

use thiserror::Error;

/// Errors surfaced by the console runtime.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Configuration file was present but unreadable or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The backend answered an API request with a non-success status.
    #[error("http {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The API request failed before a response arrived.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConsoleError>;

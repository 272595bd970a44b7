//! VetChat - chat synchronization core for the clinic admin console
//!
//! This library keeps an admin's view of customer chat rooms in sync with the
//! clinic backend. It provides:
//! - A short-lived room list cache that supports optimistic patches
//! - A data-access service wrapping the REST chat API
//! - A single polling coordinator that detects external changes
//! - Conversation and room list view models (pagination, scroll, optimistic send)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod model;
pub mod sync;
pub mod tui;
pub mod view;

#[cfg(test)]
mod tests;

/// Result type alias for VetChat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for VetChat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network-level failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied input that cannot be sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Media upload failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// The conversation was closed or reset while the operation was in flight
    #[error("Conversation closed")]
    Closed,
}

/// Initialize logging to stdout
pub fn init() {
    tracing_subscriber::fmt::init();
}

/// Initialize logging into a file, for terminal front-ends that own stdout
pub fn init_with_log_file<P: AsRef<std::path::Path>>(path: P) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

//! Error Types for the Advisory Context Engine

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Upstream market feed failures. Never reach cache readers.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed feed payload: {0}")]
    Malformed(String),

    #[error("Feed returned no quotes for the watch-list")]
    Empty,

    #[error("Feed did not respond within {0:?}")]
    Timeout(Duration),

    #[error("No market feed configured")]
    NotConfigured,
}

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

//! Error types for pulseboard-core

use thiserror::Error;

/// Main error type for the pulseboard-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream response/schema query failure
    #[error("response source error: {0}")]
    Source(String),

    /// Change-feed registration failure
    #[error("change feed error: {0}")]
    Feed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Survey not found
    #[error("survey not found: {0}")]
    SurveyNotFound(String),

    /// Subscription not found
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),
}

/// Result type alias for pulseboard-core
pub type Result<T> = std::result::Result<T, Error>;

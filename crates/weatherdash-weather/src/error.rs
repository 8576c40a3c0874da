//! Fetch-layer error types.

use thiserror::Error;

use crate::retry::RetryError;

/// Failure of a single proxy request.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("City name must not be empty")]
    InvalidCity,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx from the proxy; `message` is the body's `error` field when present
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// HTTP status of an upstream failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Informational only: the retry executor retries every failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidCity | Self::Parse(_) => false,
            Self::Network(_) => true,
            Self::Upstream { status, .. } => *status >= 500 || *status == 429 || *status == 408,
        }
    }
}

/// What a fetch operation returns once retries are exhausted
pub type FetchFailure = RetryError<FetchError>;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// How a call to the communications platform went wrong.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("upstream unavailable: {message}")]
    Unavailable {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl PlatformError {
    pub(crate) fn transport(err: reqwest::Error, deadline: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(deadline);
        }
        Self::Unavailable {
            status: err.status(),
            message: err.to_string(),
        }
    }

    /// Worth repeating for an idempotent read.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Unavailable { status: None, .. } => true,
            Self::Unavailable {
                status: Some(status),
                ..
            } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

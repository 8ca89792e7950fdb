//! REST error types

use guildlink_common::ClientError;
use thiserror::Error;

/// Errors from building the client or performing a request
#[derive(Debug, Error)]
pub enum RestError {
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {path}")]
    Status { status: u16, path: String },

    #[error("Malformed response from {path}: {message}")]
    Body { path: String, message: String },
}

impl RestError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl(_) => "INVALID_BASE_URL",
            Self::Http(_) => "HTTP_ERROR",
            Self::Status { .. } => "UNEXPECTED_STATUS",
            Self::Body { .. } => "MALFORMED_RESPONSE",
        }
    }
}

impl From<RestError> for ClientError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => ClientError::Transport(e.to_string()),
            other => ClientError::Internal(other.into()),
        }
    }
}

pub type RestResult<T> = Result<T, RestError>;

//! Gateway error types

use guildlink_common::ClientError;
use guildlink_core::DecodeError;
use std::time::Duration;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A send was attempted outside `Connected`/`Resuming`
    #[error("Not connected (state: {0})")]
    NotConnected(ConnectionState),

    /// `start` was called twice
    #[error("Connection already running")]
    AlreadyRunning,

    /// The socket failed or closed underneath us
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connecting or waiting for hello took too long
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Outbound message could not be serialized
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Inbound payload did not match its shape
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No token to identify with
    #[error("No credentials available")]
    MissingCredentials,
}

impl GatewayError {
    /// Get an error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected(_) => "NOT_CONNECTED",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::ConnectTimeout(_) => "CONNECT_TIMEOUT",
            Self::Encode(_) => "ENCODE_ERROR",
            Self::Decode(e) => e.code(),
            Self::MissingCredentials => "MISSING_CREDENTIALS",
        }
    }

    /// Whether the connection manager recovers from this on its own
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectTimeout(_) | Self::Decode(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingCredentials => Self::MissingCredentials,
            GatewayError::Decode(e) => Self::Decode(e),
            GatewayError::Transport(msg) => Self::Transport(msg),
            GatewayError::ConnectTimeout(after) => {
                Self::Transport(format!("connect timed out after {after:?}"))
            }
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GatewayError::NotConnected(ConnectionState::Reconnecting).error_code(),
            "NOT_CONNECTED"
        );
        assert_eq!(GatewayError::AlreadyRunning.error_code(), "ALREADY_RUNNING");
    }

    #[test]
    fn test_not_connected_display() {
        let err = GatewayError::NotConnected(ConnectionState::Authenticating);
        assert_eq!(err.to_string(), "Not connected (state: authenticating)");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_into_client_error() {
        let client: ClientError = GatewayError::MissingCredentials.into();
        assert_eq!(client.error_code(), "MISSING_CREDENTIALS");

        let client: ClientError = GatewayError::Transport("reset".to_string()).into();
        assert!(client.is_recoverable());

        let client: ClientError = GatewayError::AlreadyRunning.into();
        assert_eq!(client.error_code(), "INTERNAL_ERROR");
    }
}

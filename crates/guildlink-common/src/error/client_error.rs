//! Client error types
//!
//! Errors surfaced to whoever embeds the session layer. Recoverable transport
//! trouble never reaches this type; it is absorbed by reconnection.

use guildlink_core::DecodeError;

use crate::config::ConfigError;

/// Client-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Startup errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No credentials available")]
    MissingCredentials,

    // Session errors
    #[error("Authentication rejected by the gateway (close code {0})")]
    AuthenticationFailed(u16),

    #[error("Gateway closed the session permanently (close code {0})")]
    SessionClosed(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    // Payload errors
    #[error(transparent)]
    Decode(#[from] DecodeError),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl ClientError {
    /// Get an error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::SessionClosed(_) => "SESSION_CLOSED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Decode(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying later can succeed without user action
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

//! Connection states and the events observers receive

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport; either not started or stopped for good
    #[default]
    Disconnected,
    /// Opening the transport and waiting for hello
    Connecting,
    /// Identify sent, waiting for READY
    Authenticating,
    /// Session established; dispatches flowing
    Connected,
    /// Waiting out the backoff before the next attempt
    Reconnecting,
    /// Resume sent, waiting for RESUMED
    Resuming,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Resuming => "resuming",
        }
    }

    /// Check if application messages may be sent in this state
    #[must_use]
    pub const fn accepts_sends(self) -> bool {
        matches!(self, Self::Connected | Self::Resuming)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications from the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// READY (`resumed: false`) or RESUMED (`resumed: true`) arrived
    SessionEstablished { session_id: String, resumed: bool },
    /// Credentials were rejected, or none were available (`close_code: None`)
    AuthenticationFailed { close_code: Option<u16> },
    /// Closed with a code that rules out reconnecting
    Terminated { close_code: u16 },
}

//! Close codes and the reconnect policy attached to them

use std::fmt;

/// Sent on logout; the server forgets the session
pub const NORMAL_CLOSURE: u16 = 1000;

/// Sent when the client drops a socket it means to resume
pub const RESUMABLE_CLOSURE: u16 = 4000;

/// Application close codes the gateway may send (4000..=4014, 4006 unused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimeout = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        let code = match value {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSequence,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimeout,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            _ => return None,
        };
        Some(code)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Rejected credentials or a configuration the server will never accept
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::AuthenticationFailed) || self.as_u16() >= Self::InvalidShard.as_u16()
    }

    /// The session is gone server side; resuming would fail
    #[must_use]
    pub const fn discards_session(self) -> bool {
        matches!(self, Self::InvalidSequence | Self::SessionTimeout)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown error",
            Self::UnknownOpcode => "unknown op code",
            Self::DecodeError => "undecodable payload",
            Self::NotAuthenticated => "payload sent before identify",
            Self::AuthenticationFailed => "token rejected",
            Self::AlreadyAuthenticated => "identified twice",
            Self::InvalidSequence => "bad resume sequence",
            Self::RateLimited => "rate limited",
            Self::SessionTimeout => "session timed out",
            Self::InvalidShard => "invalid shard",
            Self::ShardingRequired => "sharding required",
            Self::InvalidApiVersion => "unsupported gateway version",
            Self::InvalidIntents => "invalid intents",
            Self::DisallowedIntents => "intents not permitted",
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.description())
    }
}

/// What the connection manager does once a socket has closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    Resume,
    Reidentify,
    AuthenticationFailed,
    Terminate,
}

impl CloseAction {
    /// `None` means the socket dropped without a close frame
    ///
    /// Codes outside the application range (1006 and friends) resume.
    #[must_use]
    pub fn for_code(code: Option<u16>) -> Self {
        let Some(code) = code.and_then(CloseCode::from_u16) else {
            return Self::Resume;
        };
        if code == CloseCode::AuthenticationFailed {
            Self::AuthenticationFailed
        } else if code.is_terminal() {
            Self::Terminate
        } else if code.discards_session() {
            Self::Reidentify
        } else {
            Self::Resume
        }
    }

    #[must_use]
    pub const fn reconnects(self) -> bool {
        matches!(self, Self::Resume | Self::Reidentify)
    }
}

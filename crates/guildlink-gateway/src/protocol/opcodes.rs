//! Gateway op codes
//!
//! Every frame carries an `op` integer. Codes 5, 12 and 13 are retired and
//! rejected on decode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the socket may send a code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum OpCode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    Resume = 6,
    Reconnect = 7,
    RequestGuildMembers = 8,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
    /// Member list and typing subscriptions for one guild
    SubscribeGuildEvents = 14,
}

/// Code, label and sender for every live op code
static OP_TABLE: [(OpCode, &str, Direction); 12] = [
    (OpCode::Dispatch, "Dispatch", Direction::ServerToClient),
    (OpCode::Heartbeat, "Heartbeat", Direction::Both),
    (OpCode::Identify, "Identify", Direction::ClientToServer),
    (OpCode::PresenceUpdate, "PresenceUpdate", Direction::ClientToServer),
    (OpCode::VoiceStateUpdate, "VoiceStateUpdate", Direction::ClientToServer),
    (OpCode::Resume, "Resume", Direction::ClientToServer),
    (OpCode::Reconnect, "Reconnect", Direction::ServerToClient),
    (OpCode::RequestGuildMembers, "RequestGuildMembers", Direction::ClientToServer),
    (OpCode::InvalidSession, "InvalidSession", Direction::ServerToClient),
    (OpCode::Hello, "Hello", Direction::ServerToClient),
    (OpCode::HeartbeatAck, "HeartbeatAck", Direction::ServerToClient),
    (OpCode::SubscribeGuildEvents, "SubscribeGuildEvents", Direction::ClientToServer),
];

impl OpCode {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        OP_TABLE
            .iter()
            .map(|(op, _, _)| *op)
            .find(|op| op.as_u8() == value)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    fn entry(self) -> &'static (OpCode, &'static str, Direction) {
        // The table is indexed by declaration order, which matches the enum
        let index = match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::PresenceUpdate => 3,
            Self::VoiceStateUpdate => 4,
            Self::Resume => 5,
            Self::Reconnect => 6,
            Self::RequestGuildMembers => 7,
            Self::InvalidSession => 8,
            Self::Hello => 9,
            Self::HeartbeatAck => 10,
            Self::SubscribeGuildEvents => 11,
        };
        &OP_TABLE[index]
    }

    #[must_use]
    pub fn direction(self) -> Direction {
        self.entry().2
    }

    #[must_use]
    pub fn is_client_op(self) -> bool {
        self.direction() != Direction::ServerToClient
    }

    /// Codes a well-behaved gateway may send; anything else is dropped on receipt
    #[must_use]
    pub fn is_server_op(self) -> bool {
        self.direction() != Direction::ClientToServer
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.entry().1
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.as_u8()
    }
}

impl TryFrom<u8> for OpCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("unknown op code {value}"))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.as_u8(), self.name())
    }
}

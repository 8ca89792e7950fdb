//! Online status carried by presences and outbound presence updates

use serde::{Deserialize, Serialize};

/// User online status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// User is online and active
    Online,
    /// User is idle (away from keyboard)
    Idle,
    /// Do not disturb
    Dnd,
    /// Online but shown as offline to others (only ever sent, never received)
    Invisible,
    /// User is offline
    #[default]
    Offline,
}

impl Status {
    /// Check if this status is shown to others as present
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Offline | Self::Invisible)
    }

    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct StatusParseError(pub String);

impl std::str::FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::Dnd),
            "invisible" => Ok(Self::Invisible),
            "offline" => Ok(Self::Offline),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

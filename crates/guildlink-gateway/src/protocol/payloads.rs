//! Control payload definitions
//!
//! Payloads of the handshake and of every client-to-server op.

use guildlink_common::IdentityConfig;
use guildlink_core::{Snowflake, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Create a Hello payload with custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Payload for op 2 (Identify)
///
/// Only sent when there is no session to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Account token
    pub token: String,

    /// Client connection properties
    pub properties: IdentifyProperties,

    /// Presence to start the session with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,

    /// Payload compression; always off
    #[serde(default)]
    pub compress: bool,

    /// Client capability flags
    #[serde(default)]
    pub capabilities: u32,
}

impl IdentifyPayload {
    /// No optional capabilities are requested
    pub const CAPABILITIES: u32 = 0;

    #[must_use]
    pub fn new(token: impl Into<String>, properties: IdentifyProperties) -> Self {
        Self {
            token: token.into(),
            properties,
            presence: None,
            compress: false,
            capabilities: Self::CAPABILITIES,
        }
    }

    /// Set the initial presence
    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,

    /// Browser or client name
    pub browser: String,

    /// Device type
    #[serde(default)]
    pub device: String,
}

impl From<&IdentityConfig> for IdentifyProperties {
    fn from(identity: &IdentityConfig) -> Self {
        Self {
            os: identity.os.clone(),
            browser: identity.browser.clone(),
            device: identity.device.clone(),
        }
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Account token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: Option<u64>,
}

/// Payload for op 3 (Presence Update)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    pub status: Status,

    /// Unix milliseconds the client went idle, if it did
    pub since: Option<i64>,

    #[serde(default)]
    pub activities: Vec<Value>,

    #[serde(default)]
    pub afk: bool,
}

impl PresenceUpdatePayload {
    /// Plain status change with no activities
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status,
            since: None,
            activities: Vec::new(),
            afk: false,
        }
    }
}

/// Payload for op 4 (Voice State Update)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdatePayload {
    pub guild_id: Snowflake,

    /// Channel to join; `None` leaves voice
    pub channel_id: Option<Snowflake>,

    pub self_mute: bool,
    pub self_deaf: bool,
}

impl VoiceStateUpdatePayload {
    /// Join a voice channel
    #[must_use]
    pub fn join(guild_id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_id: Some(channel_id),
            self_mute: false,
            self_deaf: false,
        }
    }

    /// Leave voice in a guild
    #[must_use]
    pub fn leave(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_id: None,
            self_mute: false,
            self_deaf: false,
        }
    }
}

/// Payload for op 8 (Request Guild Members)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,

    /// Username prefix; an empty query with limit 0 asks for everyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    pub limit: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
}

impl RequestGuildMembersPayload {
    /// Members whose username starts with `query`
    #[must_use]
    pub fn by_query(guild_id: Snowflake, query: impl Into<String>, limit: u32) -> Self {
        Self {
            guild_id,
            query: Some(query.into()),
            limit,
            user_ids: None,
        }
    }

    /// Specific members by user id
    #[must_use]
    pub fn by_ids(guild_id: Snowflake, user_ids: Vec<Snowflake>) -> Self {
        Self {
            guild_id,
            query: None,
            limit: 0,
            user_ids: Some(user_ids),
        }
    }
}

/// Payload for op 14 (Guild Subscriptions)
///
/// `members` lists the users whose member and presence updates are wanted;
/// an empty list drops the guild's member subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSubscriptionPayload {
    pub guild_id: Snowflake,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Snowflake>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing: Option<bool>,
}

impl GuildSubscriptionPayload {
    #[must_use]
    pub fn members(guild_id: Snowflake, members: Vec<Snowflake>) -> Self {
        Self {
            guild_id,
            members: Some(members),
            typing: None,
        }
    }

    #[must_use]
    pub fn typing(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            members: None,
            typing: Some(true),
        }
    }
}

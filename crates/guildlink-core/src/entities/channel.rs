//! Channel entity - text, voice, DM, category and thread channels

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::User;
use crate::value_objects::Snowflake;

/// Channel type as numbered on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelType {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildAnnouncement,
    AnnouncementThread,
    PublicThread,
    PrivateThread,
    GuildStageVoice,
    GuildDirectory,
    GuildForum,
    GuildMedia,
    /// A type this client does not know yet; kept so it re-encodes unchanged
    Unknown(u8),
}

impl ChannelType {
    /// Map a raw wire value
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildAnnouncement,
            10 => Self::AnnouncementThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::GuildStageVoice,
            14 => Self::GuildDirectory,
            15 => Self::GuildForum,
            16 => Self::GuildMedia,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::GuildText => 0,
            Self::Dm => 1,
            Self::GuildVoice => 2,
            Self::GroupDm => 3,
            Self::GuildCategory => 4,
            Self::GuildAnnouncement => 5,
            Self::AnnouncementThread => 10,
            Self::PublicThread => 11,
            Self::PrivateThread => 12,
            Self::GuildStageVoice => 13,
            Self::GuildDirectory => 14,
            Self::GuildForum => 15,
            Self::GuildMedia => 16,
            Self::Unknown(other) => other,
        }
    }

    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(
            self,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }

    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u8::deserialize(deserializer).map(Self::from_u8)
    }
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: ChannelType,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<User>,
}

impl Channel {
    /// Create a new guild text channel
    #[must_use]
    pub fn new_text(id: Snowflake, guild_id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: ChannelType::GuildText,
            guild_id: Some(guild_id),
            name: Some(name.into()),
            topic: None,
            position: None,
            parent_id: None,
            last_message_id: None,
            nsfw: false,
            recipients: Vec::new(),
        }
    }

    /// Create a new DM channel with a single recipient
    #[must_use]
    pub fn new_dm(id: Snowflake, recipient: User) -> Self {
        Self {
            id,
            kind: ChannelType::Dm,
            guild_id: None,
            name: None,
            topic: None,
            position: None,
            parent_id: None,
            last_message_id: None,
            nsfw: false,
            recipients: vec![recipient],
        }
    }

    #[inline]
    pub fn is_thread(&self) -> bool {
        self.kind.is_thread()
    }

    /// Attach the owning guild when the payload omitted it
    ///
    /// Channels nested inside a guild payload carry no `guild_id`.
    #[must_use]
    pub fn in_guild(mut self, guild_id: Snowflake) -> Self {
        self.guild_id.get_or_insert(guild_id);
        self
    }
}

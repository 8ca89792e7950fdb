//! Member entity - a user's membership in a guild

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::Snowflake;

/// Guild member (junction between User and Guild)
///
/// Members nested in a guild payload omit `guild_id`; member events carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub pending: bool,
}

impl Member {
    /// Create a member with no roles or nickname
    #[must_use]
    pub fn new(guild_id: Snowflake, user: User) -> Self {
        Self {
            guild_id: Some(guild_id),
            user,
            nick: None,
            roles: Vec::new(),
            joined_at: None,
            deaf: false,
            mute: false,
            pending: false,
        }
    }

    #[inline]
    pub fn user_id(&self) -> Snowflake {
        self.user.id
    }

    /// Nickname if set, otherwise the user's display name
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or_else(|| self.user.display_name())
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }
}

/// GUILD_MEMBER_REMOVE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRemove {
    pub guild_id: Snowflake,
    pub user: User,
}

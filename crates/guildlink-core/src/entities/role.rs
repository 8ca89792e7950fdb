//! Role entity

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Guild role
///
/// `permissions` stays a decimal string as sent; the client never evaluates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    /// The @everyone role shares its id with the guild
    #[inline]
    pub fn is_everyone(&self, guild_id: Snowflake) -> bool {
        self.id == guild_id
    }
}

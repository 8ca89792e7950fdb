//! Presence entity - a user's status and activities

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{Snowflake, Status};

/// Per-platform status breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<Status>,
}

/// Presence keyed by user id
///
/// The wire shape names the user either as `user: {id, ...}` or as a flat
/// `user_id`; both decode to the same value. A presence naming neither is
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PresenceWire")]
pub struct Presence {
    pub user_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub status: Status,
    pub activities: Vec<Value>,
    pub client_status: ClientStatus,
}

impl Presence {
    /// Presence with no activities
    #[must_use]
    pub fn new(user_id: Snowflake, status: Status) -> Self {
        Self {
            user_id,
            guild_id: None,
            status,
            activities: Vec::new(),
            client_status: ClientStatus::default(),
        }
    }
}

#[derive(Deserialize)]
struct PresenceUserRef {
    id: Snowflake,
}

#[derive(Deserialize)]
struct PresenceWire {
    #[serde(default)]
    user: Option<PresenceUserRef>,
    #[serde(default)]
    user_id: Option<Snowflake>,
    #[serde(default)]
    guild_id: Option<Snowflake>,
    #[serde(default)]
    status: Status,
    #[serde(default)]
    activities: Vec<Value>,
    #[serde(default)]
    client_status: ClientStatus,
}

impl TryFrom<PresenceWire> for Presence {
    type Error = &'static str;

    fn try_from(wire: PresenceWire) -> Result<Self, Self::Error> {
        let user_id = wire
            .user
            .map(|u| u.id)
            .or(wire.user_id)
            .ok_or("presence names no user")?;
        Ok(Self {
            user_id,
            guild_id: wire.guild_id,
            status: wire.status,
            activities: wire.activities,
            client_status: wire.client_status,
        })
    }
}

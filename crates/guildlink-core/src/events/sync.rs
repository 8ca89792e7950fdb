//! Session sync payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{Channel, CurrentUser, GuildPayload, Presence};
use crate::value_objects::Snowflake;

/// READY payload: the full initial state of a fresh session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    #[serde(default)]
    pub v: u8,
    pub user: CurrentUser,
    pub session_id: String,
    /// Endpoint to use when resuming this session
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    #[serde(default)]
    pub guilds: Vec<GuildPayload>,
    #[serde(default)]
    pub private_channels: Vec<Channel>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub user_settings: Option<Value>,
}

/// Presence lists delivered after READY
///
/// `guilds[i]` holds the presences of the i-th guild in READY order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedPresences {
    #[serde(default)]
    pub guilds: Vec<Vec<Presence>>,
    #[serde(default)]
    pub friends: Vec<Presence>,
}

impl MergedPresences {
    /// All presences, guild lists first, then friends
    pub fn iter(&self) -> impl Iterator<Item = &Presence> {
        self.guilds.iter().flatten().chain(self.friends.iter())
    }
}

/// READY_SUPPLEMENTAL payload
///
/// `merged_presences` is required; a payload without it would otherwise
/// wipe every cached presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadySupplementalEvent {
    pub merged_presences: MergedPresences,
}

/// TYPING_START payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStart {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: i64,
}

impl TypingStart {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_minimal() {
        let ready: ReadyEvent = serde_json::from_value(serde_json::json!({
            "v": 9,
            "user": { "id": "1", "username": "me" },
            "session_id": "abc",
            "resume_gateway_url": "wss://resume.example"
        }))
        .unwrap();
        assert_eq!(ready.session_id, "abc");
        assert!(ready.guilds.is_empty());
        assert!(ready.user_settings.is_none());
    }

    #[test]
    fn test_merged_presences_iter_order() {
        let supplemental: ReadySupplementalEvent = serde_json::from_value(serde_json::json!({
            "merged_presences": {
                "guilds": [
                    [{ "user_id": "1", "status": "online" }],
                    [{ "user_id": "2", "status": "idle" }]
                ],
                "friends": [{ "user": { "id": "3" }, "status": "dnd" }]
            }
        }))
        .unwrap();

        let ids: Vec<_> = supplemental
            .merged_presences
            .iter()
            .map(|p| p.user_id.into_inner())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_supplemental_requires_merged_presences() {
        assert!(serde_json::from_value::<ReadySupplementalEvent>(serde_json::json!({
            "guilds": []
        }))
        .is_err());

        let empty: ReadySupplementalEvent = serde_json::from_value(serde_json::json!({
            "merged_presences": {}
        }))
        .unwrap();
        assert_eq!(empty.merged_presences.iter().count(), 0);
    }

    #[test]
    fn test_typing_started_at() {
        let typing = TypingStart {
            channel_id: Snowflake::new(1),
            guild_id: None,
            user_id: Snowflake::new(2),
            timestamp: 1_700_000_000,
        };
        assert_eq!(typing.started_at().unwrap().timestamp(), 1_700_000_000);
    }
}

//! Typed dispatch events
//!
//! A dispatch is decoded from its `(t, d)` pair into one [`GatewayEvent`].
//! Unknown names decode to [`GatewayEvent::Unknown`] so they can still be
//! delivered; a payload that does not match its kind is a [`DecodeError`]
//! local to that one event.

use guildlink_core::{
    Channel, CurrentUser, DecodeError, GuildPayload, GuildProperties, Member, MemberRemove,
    Message, MessageDelete, MessageUpdate, Presence, ReadyEvent, ReadySupplementalEvent,
    Snowflake, TypingStart, UnavailableGuild,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GatewayEventType;

/// CHANNEL_DELETE / THREAD_DELETE payload; only the ids are needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
}

/// A decoded dispatch event
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Ready(Box<ReadyEvent>),
    ReadySupplemental(ReadySupplementalEvent),
    Resumed,
    GuildCreate(Box<GuildPayload>),
    GuildUpdate(GuildProperties),
    GuildDelete(UnavailableGuild),
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(ChannelRef),
    ThreadCreate(Channel),
    ThreadUpdate(Channel),
    ThreadDelete(ChannelRef),
    MessageCreate(Message),
    MessageUpdate(MessageUpdate),
    MessageDelete(MessageDelete),
    GuildMemberAdd(Member),
    GuildMemberUpdate(Member),
    GuildMemberRemove(MemberRemove),
    PresenceUpdate(Presence),
    TypingStart(TypingStart),
    UserUpdate(CurrentUser),
    UserSettingsUpdate(Value),
    /// An event name this client does not model
    Unknown(String),
}

impl GatewayEvent {
    /// Decode a dispatch from its event name and payload
    pub fn decode(kind: &str, payload: Option<&Value>) -> Result<Self, DecodeError> {
        let Some(event_type) = GatewayEventType::lookup(kind) else {
            return Ok(Self::Unknown(kind.to_string()));
        };
        if event_type == GatewayEventType::Resumed {
            return Ok(Self::Resumed);
        }

        let payload = payload
            .filter(|d| !d.is_null())
            .ok_or_else(|| DecodeError::MissingPayload(kind.to_string()))?;

        let event = match event_type {
            GatewayEventType::Ready => Self::Ready(Box::new(parse(kind, payload)?)),
            GatewayEventType::ReadySupplemental => Self::ReadySupplemental(parse(kind, payload)?),
            GatewayEventType::Resumed => Self::Resumed,
            GatewayEventType::GuildCreate => Self::GuildCreate(Box::new(parse(kind, payload)?)),
            GatewayEventType::GuildUpdate => Self::GuildUpdate(parse(kind, payload)?),
            GatewayEventType::GuildDelete => Self::GuildDelete(parse(kind, payload)?),
            GatewayEventType::ChannelCreate => Self::ChannelCreate(parse(kind, payload)?),
            GatewayEventType::ChannelUpdate => Self::ChannelUpdate(parse(kind, payload)?),
            GatewayEventType::ChannelDelete => Self::ChannelDelete(parse(kind, payload)?),
            GatewayEventType::ThreadCreate => Self::ThreadCreate(parse(kind, payload)?),
            GatewayEventType::ThreadUpdate => Self::ThreadUpdate(parse(kind, payload)?),
            GatewayEventType::ThreadDelete => Self::ThreadDelete(parse(kind, payload)?),
            GatewayEventType::MessageCreate => Self::MessageCreate(parse(kind, payload)?),
            GatewayEventType::MessageUpdate => Self::MessageUpdate(parse(kind, payload)?),
            GatewayEventType::MessageDelete => Self::MessageDelete(parse(kind, payload)?),
            GatewayEventType::GuildMemberAdd => Self::GuildMemberAdd(parse(kind, payload)?),
            GatewayEventType::GuildMemberUpdate => Self::GuildMemberUpdate(parse(kind, payload)?),
            GatewayEventType::GuildMemberRemove => Self::GuildMemberRemove(parse(kind, payload)?),
            GatewayEventType::PresenceUpdate => Self::PresenceUpdate(parse(kind, payload)?),
            GatewayEventType::TypingStart => Self::TypingStart(parse(kind, payload)?),
            GatewayEventType::UserUpdate => Self::UserUpdate(parse(kind, payload)?),
            GatewayEventType::UserSettingsUpdate => Self::UserSettingsUpdate(payload.clone()),
        };

        Ok(event)
    }
}

fn parse<T: DeserializeOwned>(kind: &str, payload: &Value) -> Result<T, DecodeError> {
    T::deserialize(payload).map_err(|e| DecodeError::payload(kind, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_ready() {
        let payload = json!({
            "v": 9,
            "session_id": "abc",
            "user": { "id": "1", "username": "me" },
            "guilds": [{ "id": "10", "name": "g" }]
        });
        let event = GatewayEvent::decode("READY", Some(&payload)).unwrap();
        match event {
            GatewayEvent::Ready(ready) => {
                assert_eq!(ready.session_id, "abc");
                assert_eq!(ready.guilds.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_resumed_ignores_payload() {
        assert_eq!(GatewayEvent::decode("RESUMED", None).unwrap(), GatewayEvent::Resumed);
        assert_eq!(
            GatewayEvent::decode("RESUMED", Some(&json!({ "_trace": [] }))).unwrap(),
            GatewayEvent::Resumed
        );
    }

    #[test]
    fn test_decode_unknown_name() {
        let event = GatewayEvent::decode("SESSIONS_REPLACE", Some(&json!([]))).unwrap();
        assert_eq!(event, GatewayEvent::Unknown("SESSIONS_REPLACE".to_string()));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = GatewayEvent::decode("MESSAGE_CREATE", Some(&json!({ "id": "not-a-number" })))
            .unwrap_err();
        assert_eq!(err.code(), "MALFORMED_PAYLOAD");
    }

    #[test]
    fn test_decode_missing_payload() {
        let err = GatewayEvent::decode("GUILD_UPDATE", Some(&Value::Null)).unwrap_err();
        assert_eq!(err, DecodeError::MissingPayload("GUILD_UPDATE".to_string()));
    }

    #[test]
    fn test_decode_channel_delete_needs_only_id() {
        let event = GatewayEvent::decode("THREAD_DELETE", Some(&json!({ "id": "5", "type": 11 })))
            .unwrap();
        assert_eq!(
            event,
            GatewayEvent::ThreadDelete(ChannelRef {
                id: Snowflake::new(5),
                guild_id: None,
                parent_id: None,
            })
        );
    }

    #[test]
    fn test_decode_presence_flat_user_id() {
        let event = GatewayEvent::decode(
            "PRESENCE_UPDATE",
            Some(&json!({ "user_id": "8", "status": "dnd" })),
        )
        .unwrap();
        match event {
            GatewayEvent::PresenceUpdate(p) => assert_eq!(p.user_id, Snowflake::new(8)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_user_settings_keeps_blob() {
        let blob = json!({ "theme": "dark" });
        let event = GatewayEvent::decode("USER_SETTINGS_UPDATE", Some(&blob)).unwrap();
        assert_eq!(event, GatewayEvent::UserSettingsUpdate(blob));
    }
}

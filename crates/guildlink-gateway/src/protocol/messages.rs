//! Frame envelope
//!
//! One JSON envelope per text frame: `{ op, d, s, t }`.

use super::{
    GuildSubscriptionPayload, HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload, VoiceStateUpdatePayload,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// All four keys are always written; absent ones decode as `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,
    #[serde(default)]
    pub d: Option<Value>,
    /// Dispatch sequence; `None` on every other op
    #[serde(default)]
    pub s: Option<u64>,
    /// Dispatch event name
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayMessage {
    fn control(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> Self {
        Self::control(op, Some(serde_json::to_value(payload).unwrap_or_default()))
    }

    // === Client-originated ===

    /// `d` is the last dispatch sequence seen, or null
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::control(OpCode::Heartbeat, last_sequence.map(Value::from))
    }

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::with_payload(OpCode::Identify, payload)
    }

    /// Create a Presence Update message (op=3)
    #[must_use]
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Self {
        Self::with_payload(OpCode::PresenceUpdate, payload)
    }

    /// Create a Voice State Update message (op=4)
    #[must_use]
    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> Self {
        Self::with_payload(OpCode::VoiceStateUpdate, payload)
    }

    /// Create a Resume message (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::with_payload(OpCode::Resume, payload)
    }

    /// Create a Request Guild Members message (op=8)
    #[must_use]
    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Self {
        Self::with_payload(OpCode::RequestGuildMembers, payload)
    }

    /// Create a Guild Subscriptions message (op=14)
    #[must_use]
    pub fn guild_subscription(payload: &GuildSubscriptionPayload) -> Self {
        Self::with_payload(OpCode::SubscribeGuildEvents, payload)
    }

    // === Server-originated (test peers) ===

    #[must_use]
    pub fn dispatch(name: impl Into<String>, seq: u64, payload: Value) -> Self {
        Self {
            t: Some(name.into()),
            s: Some(seq),
            ..Self::control(OpCode::Dispatch, Some(payload))
        }
    }

    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::with_payload(OpCode::Hello, &HelloPayload::with_interval(heartbeat_interval))
    }

    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::control(OpCode::HeartbeatAck, None)
    }

    #[must_use]
    pub fn reconnect() -> Self {
        Self::control(OpCode::Reconnect, None)
    }

    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::control(OpCode::InvalidSession, Some(Value::Bool(resumable)))
    }

    // === Decoding ===

    /// Typed `d` when the op matches; a payload of the wrong shape yields `None`
    fn payload<T: DeserializeOwned>(&self, op: OpCode) -> Option<T> {
        if self.op != op {
            return None;
        }
        T::deserialize(self.d.as_ref()?).ok()
    }

    pub fn as_hello(&self) -> Option<HelloPayload> {
        self.payload(OpCode::Hello)
    }

    /// A missing or non-boolean `d` counts as not resumable
    pub fn as_invalid_session(&self) -> Option<bool> {
        (self.op == OpCode::InvalidSession)
            .then(|| self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Outer `None` for other ops, inner `None` before any dispatch arrived
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        (self.op == OpCode::Heartbeat).then(|| self.d.as_ref().and_then(Value::as_u64))
    }

    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        self.payload(OpCode::Identify)
    }

    pub fn as_resume(&self) -> Option<ResumePayload> {
        self.payload(OpCode::Resume)
    }

    pub fn as_guild_subscription(&self) -> Option<GuildSubscriptionPayload> {
        self.payload(OpCode::SubscribeGuildEvents)
    }

    // === Text frames ===

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Fails on unknown op codes as well as bad JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[op {}]", self.op)?;
        match (&self.t, self.s) {
            (Some(name), Some(seq)) => write!(f, " {name} #{seq}"),
            (Some(name), None) => write!(f, " {name}"),
            _ => Ok(()),
        }
    }
}

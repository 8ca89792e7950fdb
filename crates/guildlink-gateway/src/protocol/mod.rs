//! Gateway protocol definitions
//!
//! Frame envelope, op codes, payloads and close codes.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseAction, CloseCode, NORMAL_CLOSURE, RESUMABLE_CLOSURE};
pub use messages::GatewayMessage;
pub use opcodes::{Direction, OpCode};
pub use payloads::{
    GuildSubscriptionPayload, HelloPayload, IdentifyPayload, IdentifyProperties,
    PresenceUpdatePayload, RequestGuildMembersPayload, ResumePayload, VoiceStateUpdatePayload,
};

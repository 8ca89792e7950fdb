//! # guildlink-core
//!
//! Domain layer containing ids, cached entities, dispatch payloads and the
//! collaborator traits the session layer depends on.
//! This crate has zero dependencies on infrastructure (transport, HTTP, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Channel, ChannelType, ClientStatus, CurrentUser, Guild, GuildParts, GuildPayload,
    GuildProperties, Member, MemberRemove, Message, MessageDelete, MessageUpdate, Presence, Role,
    ScheduledEvent, StageInstance, UnavailableGuild, User, VoiceState,
};
pub use error::DecodeError;
pub use events::{MergedPresences, ReadyEvent, ReadySupplementalEvent, TypingStart};
pub use traits::{CredentialStore, GuildDirectory};
pub use value_objects::{Snowflake, SnowflakeParseError, Status, StatusParseError};

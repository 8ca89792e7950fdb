//! Cached entities - the records held in the local snapshot

mod channel;
mod guild;
mod member;
mod message;
mod presence;
mod role;
mod user;
mod voice;

pub use channel::{Channel, ChannelType};
pub use guild::{Guild, GuildParts, GuildPayload, GuildProperties, UnavailableGuild};
pub use member::{Member, MemberRemove};
pub use message::{Message, MessageDelete, MessageUpdate};
pub use presence::{ClientStatus, Presence};
pub use role::Role;
pub use user::{CurrentUser, User};
pub use voice::{ScheduledEvent, StageInstance, VoiceState};

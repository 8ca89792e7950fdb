//! Dispatch event names
//!
//! Names outside this list are still routed to listeners by their raw string;
//! they just never reach the cache.

use std::fmt;

macro_rules! event_names {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GatewayEventType {
            $($variant,)*
        }

        impl GatewayEventType {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// The `t` field this event arrives under
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Exact, case-sensitive match on the `t` field
            #[must_use]
            pub fn lookup(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

event_names! {
    Ready => "READY",
    ReadySupplemental => "READY_SUPPLEMENTAL",
    Resumed => "RESUMED",
    GuildCreate => "GUILD_CREATE",
    GuildUpdate => "GUILD_UPDATE",
    GuildDelete => "GUILD_DELETE",
    ChannelCreate => "CHANNEL_CREATE",
    ChannelUpdate => "CHANNEL_UPDATE",
    ChannelDelete => "CHANNEL_DELETE",
    ThreadCreate => "THREAD_CREATE",
    ThreadUpdate => "THREAD_UPDATE",
    ThreadDelete => "THREAD_DELETE",
    MessageCreate => "MESSAGE_CREATE",
    MessageUpdate => "MESSAGE_UPDATE",
    MessageDelete => "MESSAGE_DELETE",
    GuildMemberAdd => "GUILD_MEMBER_ADD",
    GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
    GuildMemberRemove => "GUILD_MEMBER_REMOVE",
    PresenceUpdate => "PRESENCE_UPDATE",
    TypingStart => "TYPING_START",
    UserUpdate => "USER_UPDATE",
    UserSettingsUpdate => "USER_SETTINGS_UPDATE",
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

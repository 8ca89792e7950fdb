//! Guild entity and its wire forms
//!
//! A guild arrives in two shapes. The full form (READY, GUILD_CREATE) nests
//! channels, members and presences and carries fields that only the initial
//! sync knows. The partial form (GUILD_UPDATE) carries the guild's own
//! properties and nothing else, so applying it must keep the sync-only state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Channel, Member, Presence, Role, ScheduledEvent, StageInstance, VoiceState};
use crate::value_objects::Snowflake;

/// Cached guild
///
/// Channels, members, threads and presences are referenced by id and resolved
/// through the snapshot's entity maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub system_channel_id: Option<Snowflake>,
    pub premium_tier: u8,
    pub roles: Vec<Role>,

    // Populated only by full sync (READY / GUILD_CREATE)
    pub joined_at: Option<DateTime<Utc>>,
    pub large: bool,
    pub unavailable: bool,
    pub member_count: Option<u64>,
    pub voice_states: Vec<VoiceState>,
    pub members: Vec<Snowflake>,
    pub channels: Vec<Snowflake>,
    pub threads: Vec<Snowflake>,
    pub presences: Vec<Snowflake>,
    pub stage_instances: Vec<StageInstance>,
    pub guild_scheduled_events: Vec<ScheduledEvent>,
}

impl Guild {
    /// Cached guild holding only the given properties
    #[must_use]
    pub fn from_properties(properties: GuildProperties) -> Self {
        Self {
            id: properties.id,
            name: properties.name,
            icon: properties.icon,
            banner: properties.banner,
            description: properties.description,
            owner_id: properties.owner_id,
            system_channel_id: properties.system_channel_id,
            premium_tier: properties.premium_tier,
            roles: properties.roles,
            joined_at: None,
            large: false,
            unavailable: false,
            member_count: None,
            voice_states: Vec::new(),
            members: Vec::new(),
            channels: Vec::new(),
            threads: Vec::new(),
            presences: Vec::new(),
            stage_instances: Vec::new(),
            guild_scheduled_events: Vec::new(),
        }
    }

    /// Copy every field that only full sync delivers from `other`
    pub fn carry_sync_fields(&mut self, other: &Guild) {
        self.joined_at = other.joined_at;
        self.large = other.large;
        self.unavailable = other.unavailable;
        self.member_count = other.member_count;
        self.voice_states.clone_from(&other.voice_states);
        self.members.clone_from(&other.members);
        self.channels.clone_from(&other.channels);
        self.threads.clone_from(&other.threads);
        self.presences.clone_from(&other.presences);
        self.stage_instances.clone_from(&other.stage_instances);
        self.guild_scheduled_events
            .clone_from(&other.guild_scheduled_events);
    }

    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Get the guild icon path if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("/icons/{}/{}.png", self.id, hash))
    }

    pub fn role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }
}

/// Guild properties; also the GUILD_UPDATE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildProperties {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub system_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub premium_tier: u8,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl GuildProperties {
    /// Build the cached guild for this update
    ///
    /// Sync-only fields come from `existing`, never from the update.
    #[must_use]
    pub fn merge_into(self, existing: Option<&Guild>) -> Guild {
        let mut guild = Guild::from_properties(self);
        if let Some(existing) = existing {
            guild.carry_sync_fields(existing);
        }
        guild
    }
}

/// Full guild as delivered in READY and GUILD_CREATE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildPayload {
    #[serde(flatten)]
    pub properties: GuildProperties,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub threads: Vec<Channel>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub stage_instances: Vec<StageInstance>,
    #[serde(default)]
    pub guild_scheduled_events: Vec<ScheduledEvent>,
}

/// A full guild split into the cached guild and the entities it references
#[derive(Debug, Clone, PartialEq)]
pub struct GuildParts {
    pub guild: Guild,
    /// Channels and threads, each stamped with the guild id
    pub channels: Vec<Channel>,
    /// Members, each stamped with the guild id
    pub members: Vec<Member>,
    pub presences: Vec<Presence>,
}

impl GuildPayload {
    #[inline]
    pub fn id(&self) -> Snowflake {
        self.properties.id
    }

    /// Split into the cached guild plus its nested entities
    #[must_use]
    pub fn into_parts(self) -> GuildParts {
        let guild_id = self.properties.id;
        let mut guild = Guild::from_properties(self.properties);
        guild.joined_at = self.joined_at;
        guild.large = self.large;
        guild.unavailable = self.unavailable;
        guild.member_count = self.member_count;
        guild.voice_states = self.voice_states;
        guild.stage_instances = self.stage_instances;
        guild.guild_scheduled_events = self.guild_scheduled_events;
        guild.channels = self.channels.iter().map(|c| c.id).collect();
        guild.threads = self.threads.iter().map(|c| c.id).collect();
        guild.members = self.members.iter().map(Member::user_id).collect();
        guild.presences = self.presences.iter().map(|p| p.user_id).collect();

        let channels = self
            .channels
            .into_iter()
            .chain(self.threads)
            .map(|c| c.in_guild(guild_id))
            .collect();
        let members = self
            .members
            .into_iter()
            .map(|mut m| {
                m.guild_id = Some(guild_id);
                m
            })
            .collect();

        GuildParts {
            guild,
            channels,
            members,
            presences: self.presences,
        }
    }
}

/// GUILD_DELETE payload; `unavailable` marks an outage rather than a leave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

//! Snapshot - one consistent view of the cached state
//!
//! Every entity map sits behind its own `Arc`. Cloning a snapshot clones
//! pointers only, and a mutation copies just the maps it touches
//! (`Arc::make_mut`), so older snapshots held by readers stay valid and
//! unchanged.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use guildlink_core::{
    Channel, CurrentUser, Guild, GuildParts, GuildPayload, GuildProperties, Member, Message,
    MessageUpdate, Presence, ReadyEvent, Role, Snowflake,
};
use serde_json::Value;

/// Recent messages kept per channel unless configured otherwise
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;

type MemberKey = (Snowflake, Snowflake);

/// Immutable-by-sharing view of the local state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    current_user: Option<Arc<CurrentUser>>,
    guilds: Arc<HashMap<Snowflake, Guild>>,
    channels: Arc<HashMap<Snowflake, Channel>>,
    presences: Arc<HashMap<Snowflake, Presence>>,
    members: Arc<HashMap<MemberKey, Member>>,
    messages: Arc<HashMap<Snowflake, VecDeque<Message>>>,
    user_settings: Option<Arc<Value>>,
    message_limit: usize,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LIMIT)
    }
}

impl Snapshot {
    /// Empty snapshot keeping at most `message_limit` messages per channel
    #[must_use]
    pub fn new(message_limit: usize) -> Self {
        Self {
            current_user: None,
            guilds: Arc::default(),
            channels: Arc::default(),
            presences: Arc::default(),
            members: Arc::default(),
            messages: Arc::default(),
            user_settings: None,
            message_limit: message_limit.max(1),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[inline]
    pub fn message_limit(&self) -> usize {
        self.message_limit
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.current_user.is_none()
            && self.user_settings.is_none()
            && self.guilds.is_empty()
            && self.channels.is_empty()
            && self.presences.is_empty()
            && self.members.is_empty()
            && self.messages.is_empty()
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_deref()
    }

    pub fn guild(&self, guild_id: Snowflake) -> Option<&Guild> {
        self.guilds.get(&guild_id)
    }

    pub fn guilds(&self) -> impl Iterator<Item = &Guild> {
        self.guilds.values()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn channel(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.channels.get(&channel_id)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Channels and threads currently cached for a guild, by position
    ///
    /// Resolved from the channel map, so channels created after the initial
    /// sync are included.
    pub fn guild_channels(&self, guild_id: Snowflake) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self
            .channels
            .values()
            .filter(|c| c.guild_id == Some(guild_id))
            .collect();
        channels.sort_by_key(|c| (c.position.unwrap_or(i32::MAX), c.id));
        channels
    }

    /// DM and group DM channels
    pub fn private_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values().filter(|c| c.guild_id.is_none())
    }

    pub fn presence(&self, user_id: Snowflake) -> Option<&Presence> {
        self.presences.get(&user_id)
    }

    pub fn presences(&self) -> impl Iterator<Item = &Presence> {
        self.presences.values()
    }

    pub fn presence_count(&self) -> usize {
        self.presences.len()
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<&Member> {
        self.members.get(&(guild_id, user_id))
    }

    /// Cached members of a guild
    pub fn guild_members(&self, guild_id: Snowflake) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|((g, _), _)| *g == guild_id)
            .map(|(_, m)| m)
            .collect()
    }

    /// Recent messages of a channel, oldest first
    pub fn messages(&self, channel_id: Snowflake) -> impl Iterator<Item = &Message> {
        self.messages.get(&channel_id).into_iter().flatten()
    }

    pub fn message(&self, channel_id: Snowflake, message_id: Snowflake) -> Option<&Message> {
        self.messages(channel_id).find(|m| m.id == message_id)
    }

    pub fn user_settings(&self) -> Option<&Value> {
        self.user_settings.as_deref()
    }

    // =========================================================================
    // Whole-state operations
    // =========================================================================

    /// Drop everything, keeping the message limit
    pub fn clear(&mut self) {
        *self = Self::new(self.message_limit);
    }

    /// Replace the entire state with a READY payload
    pub fn apply_full_sync(&mut self, ready: ReadyEvent) {
        let mut next = Self::new(self.message_limit);
        next.current_user = Some(Arc::new(ready.user));
        next.user_settings = ready.user_settings.map(Arc::new);
        next.presences = Arc::new(
            ready
                .presences
                .into_iter()
                .map(|p| (p.user_id, p))
                .collect(),
        );
        next.channels = Arc::new(
            ready
                .private_channels
                .into_iter()
                .map(|c| (c.id, c))
                .collect(),
        );
        for guild in ready.guilds {
            next.insert_guild_parts(guild.into_parts());
        }
        *self = next;
    }

    // =========================================================================
    // Presences
    // =========================================================================

    /// Swap in a new presence map; every previous entry is discarded
    pub fn replace_presences<I>(&mut self, presences: I)
    where
        I: IntoIterator<Item = Presence>,
    {
        self.presences = Arc::new(presences.into_iter().map(|p| (p.user_id, p)).collect());
    }

    /// Insert or overwrite one user's presence
    pub fn upsert_presence(&mut self, presence: Presence) {
        Arc::make_mut(&mut self.presences).insert(presence.user_id, presence);
    }

    // =========================================================================
    // Guilds
    // =========================================================================

    /// Insert or fully replace a guild along with its channels and members
    pub fn upsert_guild(&mut self, payload: GuildPayload) {
        self.remove_guild(payload.id());
        self.insert_guild_parts(payload.into_parts());
    }

    fn insert_guild_parts(&mut self, parts: GuildParts) {
        let guild_id = parts.guild.id;

        if !parts.channels.is_empty() {
            let channels = Arc::make_mut(&mut self.channels);
            channels.extend(parts.channels.into_iter().map(|c| (c.id, c)));
        }
        if !parts.members.is_empty() {
            let members = Arc::make_mut(&mut self.members);
            members.extend(
                parts
                    .members
                    .into_iter()
                    .map(|m| ((guild_id, m.user_id()), m)),
            );
        }
        if !parts.presences.is_empty() {
            let presences = Arc::make_mut(&mut self.presences);
            presences.extend(parts.presences.into_iter().map(|p| (p.user_id, p)));
        }
        Arc::make_mut(&mut self.guilds).insert(guild_id, parts.guild);
    }

    /// Remove a guild with its channels, their messages and its members
    pub fn remove_guild(&mut self, guild_id: Snowflake) -> Option<Guild> {
        if !self.guilds.contains_key(&guild_id) {
            return None;
        }
        let guild = Arc::make_mut(&mut self.guilds).remove(&guild_id);

        let orphaned: Vec<Snowflake> = self
            .channels
            .values()
            .filter(|c| c.guild_id == Some(guild_id))
            .map(|c| c.id)
            .collect();
        if !orphaned.is_empty() {
            let channels = Arc::make_mut(&mut self.channels);
            for id in &orphaned {
                channels.remove(id);
            }
            if orphaned.iter().any(|id| self.messages.contains_key(id)) {
                let messages = Arc::make_mut(&mut self.messages);
                for id in &orphaned {
                    messages.remove(id);
                }
            }
        }
        if self.members.keys().any(|(g, _)| *g == guild_id) {
            Arc::make_mut(&mut self.members).retain(|(g, _), _| *g != guild_id);
        }

        guild
    }

    /// Apply a partial guild update without losing sync-only fields
    pub fn merge_guild_update(&mut self, update: GuildProperties) {
        let guild_id = update.id;
        let merged = update.merge_into(self.guilds.get(&guild_id));
        Arc::make_mut(&mut self.guilds).insert(guild_id, merged);
    }

    /// Store a guild fetched out of band, keeping the cached sync-only fields
    pub fn refresh_guild(&mut self, mut guild: Guild) {
        if let Some(existing) = self.guilds.get(&guild.id) {
            guild.carry_sync_fields(existing);
        }
        Arc::make_mut(&mut self.guilds).insert(guild.id, guild);
    }

    /// Replace a cached guild's roles; unknown guilds are ignored
    pub fn set_guild_roles(&mut self, guild_id: Snowflake, roles: Vec<Role>) -> bool {
        if !self.guilds.contains_key(&guild_id) {
            return false;
        }
        if let Some(guild) = Arc::make_mut(&mut self.guilds).get_mut(&guild_id) {
            guild.roles = roles;
        }
        true
    }

    // =========================================================================
    // Current user and settings
    // =========================================================================

    pub fn set_current_user(&mut self, user: CurrentUser) {
        self.current_user = Some(Arc::new(user));
    }

    /// Shallow-merge an object patch into the settings blob
    ///
    /// A non-object patch, or a patch onto a non-object blob, replaces it.
    pub fn merge_user_settings(&mut self, patch: Value) {
        let merged = match (self.user_settings.as_deref(), patch) {
            (Some(Value::Object(existing)), Value::Object(patch)) => {
                let mut merged = existing.clone();
                merged.extend(patch);
                Value::Object(merged)
            }
            (_, patch) => patch,
        };
        self.user_settings = Some(Arc::new(merged));
    }

    // =========================================================================
    // Channels
    // =========================================================================

    pub fn insert_channel(&mut self, channel: Channel) {
        Arc::make_mut(&mut self.channels).insert(channel.id, channel);
    }

    /// Replace a channel by id; an unknown id is inserted
    pub fn replace_channel(&mut self, channel: Channel) {
        self.insert_channel(channel);
    }

    /// Remove a channel and its cached messages
    pub fn remove_channel(&mut self, channel_id: Snowflake) -> Option<Channel> {
        if self.messages.contains_key(&channel_id) {
            Arc::make_mut(&mut self.messages).remove(&channel_id);
        }
        if !self.channels.contains_key(&channel_id) {
            return None;
        }
        Arc::make_mut(&mut self.channels).remove(&channel_id)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Insert or replace a message in its channel's recent list
    ///
    /// New messages go to the back; the oldest are evicted past the limit.
    pub fn push_message(&mut self, message: Message) {
        let limit = self.message_limit;
        let channel_id = message.channel_id;
        let message_id = message.id;

        let recent = Arc::make_mut(&mut self.messages)
            .entry(channel_id)
            .or_default();
        if let Some(slot) = recent.iter_mut().find(|m| m.id == message_id) {
            *slot = message;
        } else {
            recent.push_back(message);
            while recent.len() > limit {
                recent.pop_front();
            }
        }

        let advances = self
            .channels
            .get(&channel_id)
            .is_some_and(|c| c.last_message_id.map_or(true, |last| last < message_id));
        if advances {
            if let Some(channel) = Arc::make_mut(&mut self.channels).get_mut(&channel_id) {
                channel.last_message_id = Some(message_id);
            }
        }
    }

    /// Merge a partial edit into a cached message; returns whether it was cached
    pub fn update_message(&mut self, update: &MessageUpdate) -> bool {
        if self.message(update.channel_id, update.id).is_none() {
            return false;
        }
        let target = Arc::make_mut(&mut self.messages)
            .get_mut(&update.channel_id)
            .and_then(|recent| recent.iter_mut().find(|m| m.id == update.id));
        if let Some(message) = target {
            update.apply_to(message);
        }
        true
    }

    pub fn remove_message(&mut self, channel_id: Snowflake, message_id: Snowflake) -> Option<Message> {
        let index = self
            .messages
            .get(&channel_id)?
            .iter()
            .position(|m| m.id == message_id)?;
        Arc::make_mut(&mut self.messages)
            .get_mut(&channel_id)
            .and_then(|recent| recent.remove(index))
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Insert or replace a member; members without a guild id are ignored
    pub fn upsert_member(&mut self, member: Member) -> bool {
        let Some(guild_id) = member.guild_id else {
            return false;
        };
        Arc::make_mut(&mut self.members).insert((guild_id, member.user_id()), member);
        true
    }

    pub fn remove_member(&mut self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        if !self.members.contains_key(&(guild_id, user_id)) {
            return None;
        }
        Arc::make_mut(&mut self.members).remove(&(guild_id, user_id))
    }

    /// Whether two snapshots share the given maps without copying
    #[cfg(test)]
    fn shares_guilds_with(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.guilds, &other.guilds)
    }

    #[cfg(test)]
    fn shares_channels_with(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.channels, &other.channels)
    }
}

//! State cache
//!
//! Holds the current [`Snapshot`] behind an `Arc`. Readers clone the pointer
//! and keep a consistent view for as long as they like. Writers are
//! serialized: each commit clones the snapshot (pointers only), mutates the
//! copy, swaps it in and then notifies observers with the new snapshot while
//! still holding the writer gate, so observers see commits in order.

use std::sync::Arc;

use guildlink_common::{CacheConfig, ListenerRegistry, Subscription};
use guildlink_core::{
    Channel, CurrentUser, Guild, GuildPayload, GuildProperties, Member, Message, MessageUpdate,
    Presence, ReadyEvent, Role, Snowflake,
};
use parking_lot::{ReentrantMutex, RwLock};
use serde_json::Value;

use crate::snapshot::{Snapshot, DEFAULT_MESSAGE_LIMIT};

/// Authoritative local snapshot with change observation
pub struct StateCache {
    current: RwLock<Arc<Snapshot>>,
    // Reentrant so an observer may commit from inside a notification
    writer: ReentrantMutex<()>,
    observers: ListenerRegistry<Arc<Snapshot>>,
}

impl std::fmt::Debug for StateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::with_message_limit(DEFAULT_MESSAGE_LIMIT)
    }
}

impl StateCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_message_limit(config.message_limit)
    }

    #[must_use]
    pub fn with_message_limit(message_limit: usize) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::new(message_limit))),
            writer: ReentrantMutex::new(()),
            observers: ListenerRegistry::new("state_cache"),
        }
    }

    /// Current snapshot; never changes after it is returned
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Observe every committed snapshot
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.observers.register(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Apply `mutate` to a copy of the snapshot and publish the result
    pub fn commit<F, R>(&self, mutate: F) -> R
    where
        F: FnOnce(&mut Snapshot) -> R,
    {
        let _gate = self.writer.lock();

        let mut next = Snapshot::clone(&self.current.read());
        let output = mutate(&mut next);
        let next = Arc::new(next);
        *self.current.write() = Arc::clone(&next);

        let report = self.observers.notify(&next);
        if report.failed > 0 {
            tracing::debug!(failed = report.failed, "Some snapshot observers failed");
        }

        output
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Drop all cached state
    pub fn reset(&self) {
        tracing::debug!("Resetting state cache");
        self.commit(Snapshot::clear);
    }

    pub fn apply_full_sync(&self, ready: ReadyEvent) {
        tracing::debug!(
            session_id = %ready.session_id,
            guilds = ready.guilds.len(),
            "Applying full sync"
        );
        self.commit(|s| s.apply_full_sync(ready));
    }

    pub fn replace_presences(&self, presences: Vec<Presence>) {
        self.commit(|s| s.replace_presences(presences));
    }

    pub fn upsert_presence(&self, presence: Presence) {
        self.commit(|s| s.upsert_presence(presence));
    }

    pub fn upsert_guild(&self, payload: GuildPayload) {
        self.commit(|s| s.upsert_guild(payload));
    }

    pub fn remove_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        self.commit(|s| s.remove_guild(guild_id))
    }

    pub fn merge_guild_update(&self, update: GuildProperties) {
        self.commit(|s| s.merge_guild_update(update));
    }

    pub fn refresh_guild(&self, guild: Guild) {
        self.commit(|s| s.refresh_guild(guild));
    }

    pub fn set_guild_roles(&self, guild_id: Snowflake, roles: Vec<Role>) -> bool {
        self.commit(|s| s.set_guild_roles(guild_id, roles))
    }

    pub fn set_current_user(&self, user: CurrentUser) {
        self.commit(|s| s.set_current_user(user));
    }

    pub fn merge_user_settings(&self, patch: Value) {
        self.commit(|s| s.merge_user_settings(patch));
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.commit(|s| s.insert_channel(channel));
    }

    pub fn replace_channel(&self, channel: Channel) {
        self.commit(|s| s.replace_channel(channel));
    }

    pub fn remove_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        self.commit(|s| s.remove_channel(channel_id))
    }

    pub fn push_message(&self, message: Message) {
        self.commit(|s| s.push_message(message));
    }

    pub fn update_message(&self, update: &MessageUpdate) -> bool {
        self.commit(|s| s.update_message(update))
    }

    pub fn remove_message(&self, channel_id: Snowflake, message_id: Snowflake) -> Option<Message> {
        self.commit(|s| s.remove_message(channel_id, message_id))
    }

    pub fn upsert_member(&self, member: Member) -> bool {
        self.commit(|s| s.upsert_member(member))
    }

    pub fn remove_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.commit(|s| s.remove_member(guild_id, user_id))
    }
}

//! Subscription manager
//!
//! At most one guild is subscribed for member presence at a time; moving to
//! another guild subscribes the new one first and then unsubscribes the old
//! one. Typing subscriptions only ever grow for the life of a session.

use guildlink_core::Snowflake;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use super::ControlSink;
use crate::error::GatewayResult;
use crate::protocol::{GatewayMessage, GuildSubscriptionPayload};

#[derive(Debug, Default)]
struct SubscriptionState {
    member_guild: Option<Snowflake>,
    typing: HashSet<Snowflake>,
}

/// Guild member and typing subscriptions for one session
pub struct SubscriptionManager {
    sink: Arc<dyn ControlSink>,
    // Serializes check-then-send so two callers cannot interleave messages
    ops: tokio::sync::Mutex<()>,
    state: Mutex<SubscriptionState>,
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    #[must_use]
    pub fn new(sink: Arc<dyn ControlSink>) -> Self {
        Self {
            sink,
            ops: tokio::sync::Mutex::new(()),
            state: Mutex::new(SubscriptionState::default()),
        }
    }

    /// Subscribe to member presence for `guild_id`, listing `members`
    ///
    /// Replaces any previous member subscription. The old guild's
    /// unsubscribe (an empty member list) is sent after the new subscribe.
    pub async fn subscribe_members(
        &self,
        guild_id: Snowflake,
        members: Vec<Snowflake>,
    ) -> GatewayResult<()> {
        let _op = self.ops.lock().await;
        let previous = self.state.lock().member_guild;

        let subscribe = GuildSubscriptionPayload::members(guild_id, members);
        self.sink
            .send_control(GatewayMessage::guild_subscription(&subscribe))
            .await?;
        self.state.lock().member_guild = Some(guild_id);

        tracing::debug!(guild_id = %guild_id, previous = ?previous, "Member subscription moved");

        if let Some(previous) = previous.filter(|p| *p != guild_id) {
            let unsubscribe = GuildSubscriptionPayload::members(previous, Vec::new());
            self.sink
                .send_control(GatewayMessage::guild_subscription(&unsubscribe))
                .await?;
        }
        Ok(())
    }

    /// Subscribe to typing indicators in `guild_id`
    ///
    /// Returns `false` without sending anything if already subscribed.
    pub async fn subscribe_typing(&self, guild_id: Snowflake) -> GatewayResult<bool> {
        let _op = self.ops.lock().await;
        if self.state.lock().typing.contains(&guild_id) {
            return Ok(false);
        }

        let subscribe = GuildSubscriptionPayload::typing(guild_id);
        self.sink
            .send_control(GatewayMessage::guild_subscription(&subscribe))
            .await?;
        self.state.lock().typing.insert(guild_id);

        tracing::debug!(guild_id = %guild_id, "Typing subscription added");
        Ok(true)
    }

    /// Guild currently subscribed for member presence
    pub fn member_guild(&self) -> Option<Snowflake> {
        self.state.lock().member_guild
    }

    pub fn is_typing_subscribed(&self, guild_id: Snowflake) -> bool {
        self.state.lock().typing.contains(&guild_id)
    }

    pub fn typing_guilds(&self) -> HashSet<Snowflake> {
        self.state.lock().typing.clone()
    }

    /// Forget everything; the server drops subscriptions with a new session
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if state.member_guild.is_some() || !state.typing.is_empty() {
            tracing::debug!(
                typing = state.typing.len(),
                "Subscriptions cleared for new session"
            );
        }
        *state = SubscriptionState::default();
    }
}

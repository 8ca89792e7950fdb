//! Gateway runtime
//!
//! Wires the cache, dispatcher, connection and subscriptions together and
//! exposes the client-facing operations.

use guildlink_cache::StateCache;
use guildlink_common::{ClientConfig, ScopedListeners};
use guildlink_core::{CredentialStore, GuildDirectory, Snowflake};
use std::sync::Arc;

use crate::connection::{ConnectionEvent, ConnectionManager};
use crate::dispatcher::EventDispatcher;
use crate::error::GatewayResult;
use crate::protocol::{
    GatewayMessage, PresenceUpdatePayload, RequestGuildMembersPayload, VoiceStateUpdatePayload,
};
use crate::subscriptions::{ControlSink, SubscriptionManager};
use crate::transport::Transport;

/// One client session: connection, cache and subscriptions
pub struct GatewayRuntime {
    cache: Arc<StateCache>,
    dispatcher: Arc<EventDispatcher>,
    connection: Arc<ConnectionManager>,
    subscriptions: Arc<SubscriptionManager>,
    credentials: Arc<dyn CredentialStore>,
    directory: Option<Arc<dyn GuildDirectory>>,
    // Dropped with the runtime, which releases the session listener
    listeners: ScopedListeners,
}

impl std::fmt::Debug for GatewayRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRuntime")
            .field("connection", &self.connection)
            .field("subscriptions", &self.subscriptions)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl GatewayRuntime {
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let cache = Arc::new(StateCache::new(&config.cache));
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&cache)));
        let connection = Arc::new(ConnectionManager::new(
            config.gateway.clone(),
            &config.identity,
            transport,
            Arc::clone(&credentials),
            Arc::clone(&dispatcher),
        ));
        let subscriptions = Arc::new(SubscriptionManager::new(
            Arc::clone(&connection) as Arc<dyn ControlSink>
        ));

        let listeners = ScopedListeners::new();
        let on_session = Arc::clone(&subscriptions);
        listeners.add(connection.subscribe_events(move |event| {
            if let ConnectionEvent::SessionEstablished { resumed: false, .. } = event {
                on_session.reset();
            }
            Ok(())
        }));

        Self {
            cache,
            dispatcher,
            connection,
            subscriptions,
            credentials,
            directory: None,
            listeners,
        }
    }

    /// Use `directory` for guild refreshes
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn GuildDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    #[inline]
    pub fn cache(&self) -> &Arc<StateCache> {
        &self.cache
    }

    #[inline]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    #[inline]
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    #[inline]
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// Start connecting
    pub fn start(&self) -> GatewayResult<()> {
        self.connection.start()
    }

    /// Close the connection, drop the cached state and the stored credential
    pub async fn logout(&self) {
        self.connection.logout().await;
        self.subscriptions.reset();
        self.cache.reset();
        self.credentials.discard().await;
        tracing::info!("Logged out");
    }

    // === Outbound ===

    pub async fn update_presence(&self, presence: PresenceUpdatePayload) -> GatewayResult<()> {
        self.connection
            .send(GatewayMessage::presence_update(&presence))
            .await
    }

    pub async fn update_voice_state(&self, voice: VoiceStateUpdatePayload) -> GatewayResult<()> {
        self.connection
            .send(GatewayMessage::voice_state_update(&voice))
            .await
    }

    pub async fn request_guild_members(
        &self,
        request: RequestGuildMembersPayload,
    ) -> GatewayResult<()> {
        self.connection
            .send(GatewayMessage::request_guild_members(&request))
            .await
    }

    // === REST refresh ===

    /// Re-fetch a guild, its channels and its roles into the cache
    ///
    /// Returns `false` when there is no directory or the guild fetch failed.
    /// Channels that fail to decode are skipped individually.
    pub async fn refresh_guild(&self, guild_id: Snowflake) -> bool {
        let Some(directory) = self.directory.as_ref() else {
            tracing::debug!(guild_id = %guild_id, "No guild directory configured");
            return false;
        };

        let Some(guild) = directory.fetch_guild(guild_id).await else {
            tracing::warn!(guild_id = %guild_id, "Guild fetch failed");
            return false;
        };
        self.cache.refresh_guild(guild);

        if let Some(channels) = directory.fetch_guild_channels(guild_id).await {
            let mut decoded = Vec::with_capacity(channels.len());
            for channel in channels {
                match channel {
                    Ok(channel) => decoded.push(channel.in_guild(guild_id)),
                    Err(e) => {
                        tracing::warn!(guild_id = %guild_id, error = %e, "Skipping malformed channel");
                    }
                }
            }
            self.cache.commit(|snapshot| {
                for channel in decoded {
                    snapshot.insert_channel(channel);
                }
            });
        }

        if let Some(roles) = directory.fetch_guild_roles(guild_id).await {
            self.cache.set_guild_roles(guild_id, roles);
        }

        tracing::debug!(guild_id = %guild_id, "Guild refreshed");
        true
    }
}

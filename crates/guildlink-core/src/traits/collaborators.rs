//! Interfaces for the stateless collaborators around the session

use async_trait::async_trait;

use crate::entities::{Channel, Guild, Role};
use crate::error::DecodeError;
use crate::value_objects::Snowflake;

/// Request/response lookups against the platform's HTTP API
///
/// Implementations carry no retry or caching policy. A failed request yields
/// `None`; list responses decode each element on its own so one malformed
/// entry fails alone.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Fetch a guild's properties
    async fn fetch_guild(&self, guild_id: Snowflake) -> Option<Guild>;

    /// Fetch a guild's channels, one decode result per element
    async fn fetch_guild_channels(
        &self,
        guild_id: Snowflake,
    ) -> Option<Vec<Result<Channel, DecodeError>>>;

    /// Fetch a guild's roles
    async fn fetch_guild_roles(&self, guild_id: Snowflake) -> Option<Vec<Role>>;
}

/// Storage for the account token
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current token, if one is stored
    async fn load(&self) -> Option<String>;

    /// Forget the stored token
    async fn discard(&self);
}

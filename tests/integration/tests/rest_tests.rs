//! REST Integration Tests
//!
//! Exercise the HTTP guild directory against an in-process API server.
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use std::sync::Arc;

use guildlink_common::{ApiConfig, StaticCredentialStore};
use guildlink_core::{CredentialStore, DecodeError, GuildDirectory, Snowflake};
use guildlink_gateway::protocol::OpCode;
use guildlink_gateway::{create_runtime, ConnectionState};
use guildlink_rest::HttpGuildDirectory;
use integration_tests::*;

fn directory(rest: &MockRestServer) -> HttpGuildDirectory {
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(StaticCredentialStore::new(Some("test-token".to_string())));
    HttpGuildDirectory::new(&ApiConfig::new(rest.base_url()), credentials).unwrap()
}

fn guild_id() -> Snowflake {
    Snowflake::parse(GUILD_ID).unwrap()
}

// ============================================================================
// Directory Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_guild_sends_token() {
    let rest = MockRestServer::start().await.unwrap();
    rest.respond(&format!("/guilds/{GUILD_ID}"), guild_body("Fetched"));

    let guild = directory(&rest).fetch_guild(guild_id()).await.unwrap();

    assert_eq!(guild.name, "Fetched");
    assert_eq!(guild.owner_id, Some(Snowflake::new(1)));
    assert_eq!(rest.authorizations(), vec!["test-token".to_string()]);
}

#[tokio::test]
async fn test_channels_decode_per_element() {
    let rest = MockRestServer::start().await.unwrap();
    rest.respond(&format!("/guilds/{GUILD_ID}/channels"), channels_body());

    let channels = directory(&rest)
        .fetch_guild_channels(guild_id())
        .await
        .unwrap();

    assert_eq!(channels.len(), 3);
    assert_eq!(channels[0].as_ref().unwrap().id, Snowflake::new(900));
    assert!(matches!(
        channels[1],
        Err(DecodeError::Element { index: 1, .. })
    ));
    assert_eq!(channels[2].as_ref().unwrap().id, Snowflake::new(901));
}

#[tokio::test]
async fn test_fetch_roles() {
    let rest = MockRestServer::start().await.unwrap();
    rest.respond(&format!("/guilds/{GUILD_ID}/roles"), roles_body());

    let roles = directory(&rest).fetch_guild_roles(guild_id()).await.unwrap();
    assert_eq!(roles.len(), 2);
    assert!(roles[0].is_everyone(guild_id()));
    assert!(roles[1].hoist);
}

#[tokio::test]
async fn test_missing_resource_is_absent() {
    let rest = MockRestServer::start().await.unwrap();
    let directory = directory(&rest);

    assert!(directory.fetch_guild(guild_id()).await.is_none());
    assert!(directory.fetch_guild_channels(guild_id()).await.is_none());
    assert!(directory.fetch_guild_roles(guild_id()).await.is_none());
}

// ============================================================================
// Refresh Tests
// ============================================================================

#[tokio::test]
async fn test_refresh_guild_keeps_sync_fields() {
    let mut gateway = MockGateway::start().await.unwrap();
    let rest = MockRestServer::start().await.unwrap();
    rest.respond(&format!("/guilds/{GUILD_ID}"), guild_body("Renamed"));
    rest.respond(&format!("/guilds/{GUILD_ID}/channels"), channels_body());
    rest.respond(&format!("/guilds/{GUILD_ID}/roles"), roles_body());

    let runtime = create_runtime(&test_config(&gateway.url(), &rest.base_url())).unwrap();
    runtime.start().unwrap();
    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.expect(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload(&gateway.url()))
        .await
        .unwrap();
    wait_for_state(&runtime, ConnectionState::Connected)
        .await
        .unwrap();
    eventually(|| runtime.cache().snapshot().guild_count() == 1)
        .await
        .unwrap();

    assert!(runtime.refresh_guild(guild_id()).await);

    let snapshot = runtime.cache().snapshot();
    let guild = snapshot.guild(guild_id()).unwrap();
    assert_eq!(guild.name, "Renamed");
    assert_eq!(guild.premium_tier, 2);
    // Only READY and GUILD_CREATE carry these
    assert_eq!(guild.member_count, Some(2));
    assert_eq!(guild.roles.len(), 2);

    assert!(snapshot.channel(Snowflake::new(900)).is_some());
    assert!(snapshot.channel(Snowflake::new(901)).is_some());
    assert_eq!(
        snapshot.channel(Snowflake::new(900)).unwrap().guild_id,
        Some(guild_id())
    );

    runtime.logout().await;
}

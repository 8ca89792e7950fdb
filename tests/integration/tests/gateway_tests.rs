//! Gateway Integration Tests
//!
//! Drive the real WebSocket transport against an in-process gateway.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use guildlink_core::{Snowflake, Status};
use guildlink_gateway::protocol::{OpCode, PresenceUpdatePayload, NORMAL_CLOSURE};
use guildlink_gateway::{create_runtime, ConnectionEvent, ConnectionState, GatewayRuntime};
use integration_tests::*;
use parking_lot::Mutex;
use serde_json::json;

async fn connected(gateway: &mut MockGateway, runtime: &GatewayRuntime) -> GatewayPeer {
    runtime.start().expect("start");
    let mut peer = gateway.accept().await.expect("accept");
    peer.hello(45_000).await.unwrap();

    let identify = peer.expect(OpCode::Identify).await.unwrap();
    assert_eq!(identify.as_identify().unwrap().token, "test-token");

    peer.dispatch("READY", 1, ready_payload(&gateway.url()))
        .await
        .unwrap();
    wait_for_state(runtime, ConnectionState::Connected)
        .await
        .unwrap();
    eventually(|| runtime.cache().snapshot().guild_count() == 1)
        .await
        .unwrap();
    peer
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_identify_ready_populates_cache() {
    let mut gateway = MockGateway::start().await.unwrap();
    let rest = MockRestServer::start().await.unwrap();
    let runtime = create_runtime(&test_config(&gateway.url(), &rest.base_url())).unwrap();

    let mut peer = connected(&mut gateway, &runtime).await;

    let guild_id = Snowflake::parse(GUILD_ID).unwrap();
    let channel_id = Snowflake::parse(CHANNEL_ID).unwrap();
    let snapshot = runtime.cache().snapshot();
    assert_eq!(snapshot.current_user().unwrap().id(), Snowflake::new(1));
    assert!(snapshot.channel(channel_id).is_some());
    assert_eq!(snapshot.guild_members(guild_id).len(), 1);
    assert_eq!(runtime.connection().session().id(), Some(SESSION_ID));

    peer.dispatch("MESSAGE_CREATE", 2, message_create("5000", "hello"))
        .await
        .unwrap();
    eventually(|| {
        runtime
            .cache()
            .snapshot()
            .message(channel_id, Snowflake::new(5000))
            .is_some()
    })
    .await
    .unwrap();
    assert_eq!(runtime.connection().session().sequence(), Some(2));

    runtime.logout().await;
}

#[tokio::test]
async fn test_server_close_resumes_session() {
    let mut gateway = MockGateway::start().await.unwrap();
    let rest = MockRestServer::start().await.unwrap();
    let runtime = create_runtime(&test_config(&gateway.url(), &rest.base_url())).unwrap();

    let mut peer = connected(&mut gateway, &runtime).await;
    peer.dispatch("MESSAGE_CREATE", 2, message_create("5000", "kept"))
        .await
        .unwrap();
    let channel_id = Snowflake::parse(CHANNEL_ID).unwrap();
    eventually(|| runtime.cache().snapshot().message(channel_id, Snowflake::new(5000)).is_some())
        .await
        .unwrap();

    // Resumable close; the client comes back on the resume URL
    peer.close(4000).await.unwrap();

    let mut resumed = gateway.accept().await.unwrap();
    resumed.hello(45_000).await.unwrap();
    let resume = resumed.expect(OpCode::Resume).await.unwrap();
    let payload = resume.as_resume().unwrap();
    assert_eq!(payload.token, "test-token");
    assert_eq!(payload.session_id, SESSION_ID);
    assert_eq!(payload.seq, Some(2));
    wait_for_state(&runtime, ConnectionState::Resuming)
        .await
        .unwrap();

    resumed.dispatch("RESUMED", 3, json!({})).await.unwrap();
    wait_for_state(&runtime, ConnectionState::Connected)
        .await
        .unwrap();

    // Nothing was re-synced; the cache carried over
    let snapshot = runtime.cache().snapshot();
    assert!(snapshot.message(channel_id, Snowflake::new(5000)).is_some());
    assert_eq!(snapshot.guild_count(), 1);

    runtime.logout().await;
}

#[tokio::test]
async fn test_logout_closes_normally_and_clears_state() {
    let mut gateway = MockGateway::start().await.unwrap();
    let rest = MockRestServer::start().await.unwrap();
    let runtime = create_runtime(&test_config(&gateway.url(), &rest.base_url())).unwrap();

    let mut peer = connected(&mut gateway, &runtime).await;
    runtime.logout().await;

    assert_eq!(peer.recv_close().await.unwrap(), Some(NORMAL_CLOSURE));
    assert_eq!(runtime.connection().state(), ConnectionState::Disconnected);
    assert!(runtime.cache().snapshot().is_empty());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!gateway.has_pending());
}

#[tokio::test]
async fn test_rejected_token_is_terminal() {
    let mut gateway = MockGateway::start().await.unwrap();
    let rest = MockRestServer::start().await.unwrap();
    let runtime = create_runtime(&test_config(&gateway.url(), &rest.base_url())).unwrap();

    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let _sub = runtime.connection().subscribe_events(move |event| {
        if let ConnectionEvent::AuthenticationFailed { close_code } = event {
            sink.lock().push(*close_code);
        }
        Ok(())
    });

    runtime.start().unwrap();
    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.expect(OpCode::Identify).await.unwrap();
    peer.close(4004).await.unwrap();

    wait_for_state(&runtime, ConnectionState::Disconnected)
        .await
        .unwrap();
    eventually(|| !failures.lock().is_empty()).await.unwrap();
    assert_eq!(*failures.lock(), vec![Some(4004)]);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!gateway.has_pending());
}

// ============================================================================
// Outbound Tests
// ============================================================================

#[tokio::test]
async fn test_outbound_commands_reach_gateway() {
    let mut gateway = MockGateway::start().await.unwrap();
    let rest = MockRestServer::start().await.unwrap();
    let runtime = create_runtime(&test_config(&gateway.url(), &rest.base_url())).unwrap();

    let mut peer = connected(&mut gateway, &runtime).await;

    runtime
        .update_presence(PresenceUpdatePayload::status(Status::Idle))
        .await
        .unwrap();
    let presence = peer.expect(OpCode::PresenceUpdate).await.unwrap();
    assert_eq!(presence.d.unwrap()["status"], "idle");

    let guild_id = Snowflake::parse(GUILD_ID).unwrap();
    runtime
        .subscriptions()
        .subscribe_members(guild_id, vec![Snowflake::new(1)])
        .await
        .unwrap();
    let subscription = peer.expect(OpCode::SubscribeGuildEvents).await.unwrap();
    assert_eq!(
        subscription.as_guild_subscription().unwrap().guild_id,
        guild_id
    );

    runtime.logout().await;
}

//! Client runtime
//!
//! Builds a session from configuration and keeps it running until Ctrl+C or
//! a terminal close.

mod gateway_runtime;

pub use gateway_runtime::GatewayRuntime;

use guildlink_common::{ClientConfig, ClientError, ClientResult, StaticCredentialStore};
use guildlink_core::{CredentialStore, GuildDirectory};
use guildlink_rest::HttpGuildDirectory;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::connection::ConnectionEvent;
use crate::transport::{Transport, TungsteniteTransport};

/// Build the runtime from configuration
///
/// Uses the WebSocket transport, the configured token and the REST directory.
pub fn create_runtime(config: &ClientConfig) -> ClientResult<GatewayRuntime> {
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(StaticCredentialStore::from_config(config));
    tracing::info!(
        has_token = config.auth_token.is_some(),
        "Credential store created"
    );

    let directory = HttpGuildDirectory::new(&config.api, Arc::clone(&credentials))?;
    tracing::info!(base_url = %config.api.base_url, "Guild directory created");

    let transport: Arc<dyn Transport> = Arc::new(TungsteniteTransport::new());
    let runtime = GatewayRuntime::new(config, transport, credentials)
        .with_directory(Arc::new(directory) as Arc<dyn GuildDirectory>);
    tracing::info!(url = %config.gateway.url, "Gateway runtime created");

    Ok(runtime)
}

/// Run a session until Ctrl+C or a terminal close
pub async fn run(config: ClientConfig) -> ClientResult<()> {
    let runtime = create_runtime(&config)?;

    let (ended_tx, mut ended_rx) = mpsc::unbounded_channel();
    let _events = runtime.connection().subscribe_events(move |event| {
        match event {
            ConnectionEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Connection state changed");
            }
            ConnectionEvent::SessionEstablished {
                session_id,
                resumed,
            } => {
                tracing::info!(session_id = %session_id, resumed, "Session established");
            }
            ConnectionEvent::AuthenticationFailed { close_code } => {
                let _ = ended_tx.send(close_code.map_or(
                    ClientError::MissingCredentials,
                    ClientError::AuthenticationFailed,
                ));
            }
            ConnectionEvent::Terminated { close_code } => {
                let _ = ended_tx.send(ClientError::SessionClosed(*close_code));
            }
        }
        Ok(())
    });

    runtime.start()?;

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            tracing::info!("Shutdown requested");
            Ok(())
        }
        Some(err) = ended_rx.recv() => {
            tracing::error!(error = %err, code = err.error_code(), "Session ended");
            Err(err)
        }
    };

    runtime.logout().await;
    outcome
}

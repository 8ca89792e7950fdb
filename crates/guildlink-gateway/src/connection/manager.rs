//! Connection manager
//!
//! Owns the single gateway connection. One task runs the whole lifecycle:
//! connect, hello, identify or resume, the dispatch loop, and reconnecting
//! with backoff. Inbound frames are handled to completion before the next one
//! is read, so cache mutations follow wire order.

use guildlink_common::{GatewayConfig, IdentityConfig, ListenerRegistry, Subscription};
use guildlink_core::CredentialStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};

use super::backoff::{invalid_session_delay, Backoff};
use super::{ConnectionEvent, ConnectionState, Session};
use crate::dispatcher::EventDispatcher;
use crate::error::{GatewayError, GatewayResult};
use crate::events::GatewayEventType;
use crate::heartbeat::{HeartbeatMonitor, HeartbeatState, HeartbeatTick, Pulse, MISSED_ACK_TOLERANCE};
use crate::protocol::{
    CloseAction, GatewayMessage, IdentifyPayload, IdentifyProperties, OpCode, ResumePayload,
    NORMAL_CLOSURE, RESUMABLE_CLOSURE,
};
use crate::transport::{Frame, Transport, TransportHandle};

/// Gateway connection with automatic reconnect and resume
pub struct ConnectionManager {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    config: GatewayConfig,
    properties: IdentifyProperties,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    dispatcher: Arc<EventDispatcher>,
    state: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
    events: ListenerRegistry<ConnectionEvent>,
    /// Writer for application sends; present only while sends are accepted
    outbound: Mutex<Option<mpsc::Sender<Frame>>>,
    session: Mutex<Session>,
    backoff: Mutex<Backoff>,
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    /// Logout requested
    Shutdown,
    /// The server closed, or the socket dropped (`None`)
    Closed(Option<u16>),
    /// We gave up on the connection; the session stays resumable
    Dropped(&'static str),
}

/// Per-connection bookkeeping
struct Link {
    generation: u64,
    outgoing: mpsc::Sender<Frame>,
    heartbeat: HeartbeatState,
    protocol_errors: u32,
    /// Re-run the handshake at this instant (after an invalid session)
    retry_handshake_at: Option<Instant>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        identity: &IdentityConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        if let Some(configured) = config.legacy_max_missed_acks {
            tracing::warn!(
                configured,
                tolerance = MISSED_ACK_TOLERANCE,
                "GATEWAY_MAX_MISSED_ACKS is ignored; the missed-ack tolerance is fixed"
            );
        }

        let backoff = Backoff::from_config(&config);
        Self {
            shared: Arc::new(Shared {
                config,
                properties: IdentifyProperties::from(identity),
                transport,
                credentials,
                dispatcher,
                state: watch::Sender::new(ConnectionState::Disconnected),
                shutdown: watch::Sender::new(false),
                events: ListenerRegistry::new("connection"),
                outbound: Mutex::new(None),
                session: Mutex::new(Session::new()),
                backoff: Mutex::new(backoff),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start connecting in the background
    pub fn start(&self) -> GatewayResult<()> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(GatewayError::AlreadyRunning);
        }

        self.shared.shutdown.send_replace(false);
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(shared.run()));
        Ok(())
    }

    /// Close with 1000, forget the session and stay disconnected
    pub async fn logout(&self) {
        tracing::info!("Logging out of gateway");
        self.shared.shutdown.send_replace(true);

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Connection task ended abnormally");
            }
        }

        self.shared.close_outbound();
        self.shared.session.lock().invalidate();
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Send an application message
    ///
    /// Only `Connected` and `Resuming` accept sends; anything else is a
    /// reported no-op.
    pub async fn send(&self, message: GatewayMessage) -> GatewayResult<()> {
        let state = self.state();
        let sender = if state.accepts_sends() {
            self.shared.outbound.lock().clone()
        } else {
            None
        };

        let Some(sender) = sender else {
            tracing::warn!(op = %message.op, state = %state, "Send while not connected; dropped");
            return Err(GatewayError::NotConnected(state));
        };

        write(&sender, &message).await
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Async view of the current state
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Observe state changes, session establishment and failures
    pub fn subscribe_events<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.events.register(listener)
    }

    /// Copy of the current session bookkeeping
    pub fn session(&self) -> Session {
        self.shared.session.lock().clone()
    }

    #[inline]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.shared.dispatcher
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("session_id", &self.shared.session.lock().id())
            .finish_non_exhaustive()
    }
}

impl Shared {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut generation = 0_u64;

        loop {
            let Some(token) = self.credentials.load().await else {
                tracing::warn!("No credentials available; staying disconnected");
                self.session.lock().invalidate();
                self.set_state(ConnectionState::Disconnected);
                self.events
                    .notify(&ConnectionEvent::AuthenticationFailed { close_code: None });
                return;
            };

            generation += 1;
            let ending = self.connect_once(generation, &token, &mut shutdown).await;
            self.close_outbound();

            match ending {
                Ending::Shutdown => {
                    self.session.lock().invalidate();
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
                Ending::Dropped(reason) => {
                    tracing::info!(reason, generation, "Connection dropped; will resume");
                }
                Ending::Closed(code) => {
                    let action = CloseAction::for_code(code);
                    if !action.reconnects() {
                        self.session.lock().invalidate();
                        self.set_state(ConnectionState::Disconnected);
                        let event = if action == CloseAction::AuthenticationFailed {
                            tracing::error!(close_code = ?code, "Authentication failed; not retrying");
                            ConnectionEvent::AuthenticationFailed { close_code: code }
                        } else {
                            let close_code = code.unwrap_or_default();
                            tracing::error!(close_code, "Gateway rejected the session permanently");
                            ConnectionEvent::Terminated { close_code }
                        };
                        self.events.notify(&event);
                        return;
                    }

                    if action == CloseAction::Reidentify {
                        tracing::info!(close_code = ?code, "Session discarded by server");
                        self.session.lock().invalidate();
                    } else {
                        tracing::info!(close_code = ?code, "Connection closed; will resume");
                    }
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            let (delay, attempt) = {
                let mut backoff = self.backoff.lock();
                (backoff.next_delay(), backoff.attempt())
            };
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt,
                "Reconnecting after backoff"
            );

            tokio::select! {
                () = sleep(delay) => {}
                () = stopped(&mut shutdown) => {
                    self.session.lock().invalidate();
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
            }
        }
    }

    async fn connect_once(
        &self,
        generation: u64,
        token: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Ending {
        let url = {
            let session = self.session.lock();
            session
                .resume_url()
                .filter(|_| session.is_resumable())
                .unwrap_or(&self.config.url)
                .to_string()
        };
        let limit = self.config.connect_timeout();

        self.set_state(ConnectionState::Connecting);
        tracing::info!(url = %url, generation, "Connecting to gateway");

        let handle = tokio::select! {
            result = timeout(limit, self.transport.connect(&url)) => match result {
                Ok(Ok(handle)) => handle,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, code = e.error_code(), "Gateway connect failed");
                    return Ending::Dropped("connect failed");
                }
                Err(_) => {
                    tracing::warn!(timeout_ms = self.config.connect_timeout_ms, "Gateway connect timed out");
                    return Ending::Dropped("connect timed out");
                }
            },
            () = stopped(shutdown) => return Ending::Shutdown,
        };
        let TransportHandle {
            outgoing,
            mut incoming,
        } = handle;

        let interval = tokio::select! {
            result = timeout(limit, wait_for_hello(&mut incoming)) => match result {
                Ok(Ok(interval)) => interval,
                Ok(Err(code)) => return Ending::Closed(code),
                Err(_) => {
                    tracing::warn!(timeout_ms = self.config.connect_timeout_ms, "No hello from gateway");
                    close(&outgoing, RESUMABLE_CLOSURE).await;
                    return Ending::Dropped("hello timed out");
                }
            },
            () = stopped(shutdown) => {
                close(&outgoing, NORMAL_CLOSURE).await;
                return Ending::Shutdown;
            }
        };

        tracing::debug!(
            generation,
            heartbeat_interval_ms = interval.as_millis() as u64,
            "Hello received"
        );
        self.session.lock().set_heartbeat_interval(interval);

        let (tick_tx, mut ticks) = mpsc::unbounded_channel();
        let monitor = HeartbeatMonitor::start(generation, interval, tick_tx);
        let mut link = Link {
            generation,
            outgoing,
            heartbeat: HeartbeatState::new(),
            protocol_errors: 0,
            retry_handshake_at: None,
        };

        let ending = match self.handshake(&link, token).await {
            Ok(()) => self.pump(&mut link, &mut incoming, &mut ticks, token, shutdown).await,
            Err(e) => {
                tracing::warn!(error = %e, "Handshake could not be sent");
                Ending::Dropped("handshake send failed")
            }
        };

        monitor.stop();
        ending
    }

    /// Identify, or resume when a session exists
    async fn handshake(&self, link: &Link, token: &str) -> GatewayResult<()> {
        let resume = {
            let session = self.session.lock();
            session.id().map(|id| ResumePayload {
                token: token.to_string(),
                session_id: id.to_string(),
                seq: session.sequence(),
            })
        };

        if let Some(resume) = resume {
            tracing::info!(session_id = %resume.session_id, seq = ?resume.seq, "Resuming session");
            write(&link.outgoing, &GatewayMessage::resume(&resume)).await?;
            self.open_outbound(&link.outgoing);
            self.set_state(ConnectionState::Resuming);
        } else {
            tracing::info!("Identifying");
            self.set_state(ConnectionState::Authenticating);
            let identify = IdentifyPayload::new(token, self.properties.clone());
            write(&link.outgoing, &GatewayMessage::identify(&identify)).await?;
        }
        Ok(())
    }

    /// Process frames, heartbeat ticks and shutdown until the connection ends
    async fn pump(
        &self,
        link: &mut Link,
        incoming: &mut mpsc::Receiver<Frame>,
        ticks: &mut mpsc::UnboundedReceiver<HeartbeatTick>,
        token: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Ending {
        loop {
            let retry_at = link.retry_handshake_at;

            tokio::select! {
                frame = incoming.recv() => match frame {
                    Some(Frame::Text(text)) => {
                        if let Some(ending) = self.on_text(link, &text).await {
                            return ending;
                        }
                    }
                    Some(Frame::Close(code)) => {
                        tracing::info!(close_code = ?code, "Gateway closed connection");
                        return Ending::Closed(code);
                    }
                    None => {
                        tracing::warn!("Transport ended without a close frame");
                        return Ending::Closed(None);
                    }
                },
                Some(tick) = ticks.recv() => {
                    if tick.generation != link.generation {
                        tracing::trace!(tick = tick.generation, current = link.generation, "Stale heartbeat tick ignored");
                        continue;
                    }
                    match link.heartbeat.on_tick() {
                        Pulse::Beat => self.beat(link).await,
                        Pulse::Stale => {
                            let missed = link.heartbeat.missed();
                            tracing::warn!(missed, "Heartbeat not acknowledged; connection is stale");
                            self.session.lock().set_missed_acks(missed);
                            close(&link.outgoing, RESUMABLE_CLOSURE).await;
                            return Ending::Dropped("heartbeat stale");
                        }
                    }
                    self.session.lock().set_missed_acks(link.heartbeat.missed());
                }
                () = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    link.retry_handshake_at = None;
                    if let Err(e) = self.handshake(link, token).await {
                        tracing::warn!(error = %e, "Handshake retry could not be sent");
                        return Ending::Dropped("handshake send failed");
                    }
                }
                () = stopped(shutdown) => {
                    close(&link.outgoing, NORMAL_CLOSURE).await;
                    return Ending::Shutdown;
                }
            }
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    async fn on_text(&self, link: &mut Link, text: &str) -> Option<Ending> {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) if message.op.is_server_op() => message,
            Ok(message) => {
                tracing::warn!(op = %message.op, "Client-only op received from gateway");
                return self.protocol_error(link).await;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Malformed frame dropped");
                return self.protocol_error(link).await;
            }
        };
        link.protocol_errors = 0;

        tracing::trace!(op = %message.op, seq = ?message.s, "Received message");

        match message.op {
            OpCode::Dispatch => self.on_dispatch(link, message),
            OpCode::Heartbeat => {
                tracing::debug!("Gateway requested a heartbeat");
                link.heartbeat.on_forced_beat();
                self.beat(link).await;
            }
            OpCode::HeartbeatAck => {
                link.heartbeat.on_ack();
                self.session.lock().set_missed_acks(0);
            }
            OpCode::Reconnect => {
                tracing::info!("Gateway requested reconnect");
                close(&link.outgoing, RESUMABLE_CLOSURE).await;
                return Some(Ending::Dropped("reconnect requested"));
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                let delay = invalid_session_delay(&self.config);
                if !resumable {
                    self.session.lock().invalidate();
                }
                tracing::warn!(
                    resumable,
                    delay_ms = delay.as_millis() as u64,
                    "Invalid session"
                );
                self.close_outbound();
                self.set_state(ConnectionState::Authenticating);
                link.retry_handshake_at = Some(Instant::now() + delay);
            }
            OpCode::Hello => tracing::debug!("Repeated hello ignored"),
            op => tracing::warn!(op = %op, "Unexpected op from gateway; dropped"),
        }
        None
    }

    async fn protocol_error(&self, link: &mut Link) -> Option<Ending> {
        link.protocol_errors += 1;
        if link.protocol_errors > self.config.max_protocol_errors {
            tracing::warn!(
                count = link.protocol_errors,
                "Too many consecutive protocol errors; reconnecting"
            );
            close(&link.outgoing, RESUMABLE_CLOSURE).await;
            return Some(Ending::Dropped("protocol errors"));
        }
        None
    }

    fn on_dispatch(&self, link: &Link, message: GatewayMessage) {
        if let Some(sequence) = message.s {
            self.session.lock().observe_sequence(sequence);
        }
        let Some(kind) = message.t else {
            tracing::debug!(seq = ?message.s, "Dispatch without an event name dropped");
            return;
        };

        match GatewayEventType::lookup(&kind) {
            Some(GatewayEventType::Ready) => {
                let established = self.on_ready(link, message.d.as_ref());
                self.dispatcher.dispatch(&kind, message.d);
                if let Some(session_id) = established {
                    self.events.notify(&ConnectionEvent::SessionEstablished {
                        session_id,
                        resumed: false,
                    });
                }
            }
            Some(GatewayEventType::Resumed) => {
                let session_id = self.session.lock().id().map(str::to_string);
                self.enter_connected(link);
                tracing::info!(session_id = ?session_id, "Session resumed");
                self.dispatcher.dispatch(&kind, message.d);
                if let Some(session_id) = session_id {
                    self.events.notify(&ConnectionEvent::SessionEstablished {
                        session_id,
                        resumed: true,
                    });
                }
            }
            _ => {
                self.dispatcher.dispatch(&kind, message.d);
            }
        }
    }

    /// Record the new session; returns its id
    fn on_ready(&self, link: &Link, payload: Option<&Value>) -> Option<String> {
        let session_id = payload
            .and_then(|d| d.get("session_id"))
            .and_then(Value::as_str)?
            .to_string();
        let resume_url = payload
            .and_then(|d| d.get("resume_gateway_url"))
            .and_then(Value::as_str)
            .map(str::to_string);

        self.session.lock().establish(&session_id, resume_url);
        self.enter_connected(link);
        tracing::info!(session_id = %session_id, "Session established");
        Some(session_id)
    }

    fn enter_connected(&self, link: &Link) {
        self.backoff.lock().reset();
        self.open_outbound(&link.outgoing);
        self.set_state(ConnectionState::Connected);
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    async fn beat(&self, link: &Link) {
        let sequence = self.session.lock().sequence();
        tracing::trace!(seq = ?sequence, "Sending heartbeat");
        if let Err(e) = write(&link.outgoing, &GatewayMessage::heartbeat(sequence)).await {
            tracing::debug!(error = %e, "Heartbeat not sent");
        }
    }

    fn open_outbound(&self, outgoing: &mpsc::Sender<Frame>) {
        *self.outbound.lock() = Some(outgoing.clone());
    }

    fn close_outbound(&self) {
        self.outbound.lock().take();
    }

    fn set_state(&self, to: ConnectionState) {
        let from = self.state.send_replace(to);
        if from != to {
            tracing::debug!(from = %from, to = %to, "Connection state changed");
            self.events.notify(&ConnectionEvent::StateChanged { from, to });
        }
    }
}

async fn write(outgoing: &mpsc::Sender<Frame>, message: &GatewayMessage) -> GatewayResult<()> {
    let json = message.to_json()?;
    outgoing
        .send(Frame::Text(json))
        .await
        .map_err(|_| GatewayError::Transport("connection writer closed".to_string()))
}

async fn close(outgoing: &mpsc::Sender<Frame>, code: u16) {
    let _ = outgoing.send(Frame::Close(Some(code))).await;
}

/// Resolves once logout was requested
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Wait for hello; `Err` carries the close code if the socket closed first
async fn wait_for_hello(incoming: &mut mpsc::Receiver<Frame>) -> Result<Duration, Option<u16>> {
    while let Some(frame) = incoming.recv().await {
        match frame {
            Frame::Text(text) => match GatewayMessage::from_json(&text) {
                Ok(message) => match message.as_hello() {
                    Some(hello) => return Ok(Duration::from_millis(hello.heartbeat_interval)),
                    None => tracing::debug!(op = %message.op, "Message before hello ignored"),
                },
                Err(e) => tracing::debug!(error = %e, "Malformed frame before hello"),
            },
            Frame::Close(code) => return Err(code),
        }
    }
    Err(None)
}

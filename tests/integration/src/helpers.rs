//! Test helpers for integration tests
//!
//! Provides an in-process WebSocket gateway, a canned REST server and a few
//! waiting utilities. Both servers bind ephemeral ports on localhost.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use guildlink_common::ClientConfig;
use guildlink_gateway::protocol::{GatewayMessage, OpCode};
use guildlink_gateway::{ConnectionState, GatewayRuntime};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long a helper waits before failing the test
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Client configuration pointing at the given servers
pub fn test_config(gateway_url: &str, api_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(gateway_url, api_url);
    config.auth_token = Some("test-token".to_string());
    config
}

/// Wait until the runtime's connection reaches `state`
pub async fn wait_for_state(runtime: &GatewayRuntime, state: ConnectionState) -> Result<()> {
    let mut states = runtime.connection().watch_state();
    tokio::time::timeout(WAIT_LIMIT, states.wait_for(|s| *s == state))
        .await
        .map_err(|_| anyhow!("timed out waiting for {state}"))??;
    Ok(())
}

/// Poll `check` until it holds
pub async fn eventually<F>(mut check: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(WAIT_LIMIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("condition never held"))
}

// ============================================================================
// Mock gateway
// ============================================================================

/// WebSocket gateway that hands every accepted socket to the test
pub struct MockGateway {
    pub addr: SocketAddr,
    peers: mpsc::UnboundedReceiver<GatewayPeer>,
    _handle: JoinHandle<()>,
}

impl MockGateway {
    pub async fn start() -> Result<Self> {
        let (tx, peers) = mpsc::unbounded_channel();
        let app = Router::new()
            .route("/gateway", get(upgrade))
            .with_state(tx);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            peers,
            _handle: handle,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Next client connection
    pub async fn accept(&mut self) -> Result<GatewayPeer> {
        tokio::time::timeout(WAIT_LIMIT, self.peers.recv())
            .await
            .map_err(|_| anyhow!("no client connected"))?
            .ok_or_else(|| anyhow!("gateway stopped"))
    }

    /// Whether a connection arrived that nobody accepted yet
    pub fn has_pending(&mut self) -> bool {
        !self.peers.is_empty()
    }
}

async fn upgrade(
    State(peers): State<mpsc::UnboundedSender<GatewayPeer>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let _ = peers.send(GatewayPeer { socket });
    })
}

/// Server side of one client connection
pub struct GatewayPeer {
    socket: WebSocket,
}

impl GatewayPeer {
    pub async fn send(&mut self, message: &GatewayMessage) -> Result<()> {
        self.socket.send(Message::Text(message.to_json()?)).await?;
        Ok(())
    }

    pub async fn hello(&mut self, heartbeat_interval_ms: u64) -> Result<()> {
        self.send(&GatewayMessage::hello(heartbeat_interval_ms)).await
    }

    pub async fn dispatch(&mut self, event_type: &str, sequence: u64, data: Value) -> Result<()> {
        self.send(&GatewayMessage::dispatch(event_type, sequence, data))
            .await
    }

    /// Close the socket with a gateway close code
    pub async fn close(mut self, code: u16) -> Result<()> {
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: "".into(),
            })))
            .await?;
        Ok(())
    }

    /// Next client message, answering heartbeats along the way
    ///
    /// Returns `None` once the client closes.
    pub async fn recv(&mut self) -> Result<Option<GatewayMessage>> {
        loop {
            match self.next_frame().await? {
                Frame::Message(message) if message.op == OpCode::Heartbeat => {
                    self.send(&GatewayMessage::heartbeat_ack()).await?;
                }
                Frame::Message(message) => return Ok(Some(message)),
                Frame::Closed(_) => return Ok(None),
            }
        }
    }

    /// Next client message that is not a heartbeat; fails on close
    pub async fn expect(&mut self, op: OpCode) -> Result<GatewayMessage> {
        let message = self
            .recv()
            .await?
            .ok_or_else(|| anyhow!("client closed while waiting for {op:?}"))?;
        if message.op != op {
            return Err(anyhow!("expected {op:?}, got {:?}", message.op));
        }
        Ok(message)
    }

    /// Wait for the client to close; returns its close code
    pub async fn recv_close(&mut self) -> Result<Option<u16>> {
        loop {
            if let Frame::Closed(code) = self.next_frame().await? {
                return Ok(code);
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        loop {
            let next = tokio::time::timeout(WAIT_LIMIT, self.socket.recv())
                .await
                .map_err(|_| anyhow!("client went quiet"))?;
            match next {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Frame::Message(GatewayMessage::from_json(&text)?));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Frame::Closed(frame.map(|f| f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(Frame::Closed(None)),
            }
        }
    }
}

enum Frame {
    Message(GatewayMessage),
    Closed(Option<u16>),
}

// ============================================================================
// Mock REST API
// ============================================================================

#[derive(Default)]
struct RestRoutes {
    bodies: HashMap<String, Value>,
    authorizations: Vec<String>,
}

/// REST server answering `GET /guilds/...` with canned bodies
pub struct MockRestServer {
    pub addr: SocketAddr,
    routes: Arc<Mutex<RestRoutes>>,
    _handle: JoinHandle<()>,
}

impl MockRestServer {
    pub async fn start() -> Result<Self> {
        let routes = Arc::new(Mutex::new(RestRoutes::default()));
        let app = Router::new()
            .route("/guilds/:id", get(guild_route))
            .route("/guilds/:id/:collection", get(guild_collection_route))
            .with_state(Arc::clone(&routes));

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            routes,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve `body` for `path`; unknown paths answer 404
    pub fn respond(&self, path: &str, body: Value) {
        self.routes.lock().bodies.insert(path.to_string(), body);
    }

    /// `Authorization` headers seen so far
    pub fn authorizations(&self) -> Vec<String> {
        self.routes.lock().authorizations.clone()
    }
}

type Routes = State<Arc<Mutex<RestRoutes>>>;

async fn guild_route(State(routes): Routes, headers: HeaderMap, Path(id): Path<String>) -> Response {
    canned(&routes, &headers, &format!("/guilds/{id}"))
}

async fn guild_collection_route(
    State(routes): Routes,
    headers: HeaderMap,
    Path((id, collection)): Path<(String, String)>,
) -> Response {
    canned(&routes, &headers, &format!("/guilds/{id}/{collection}"))
}

fn canned(routes: &Mutex<RestRoutes>, headers: &HeaderMap, path: &str) -> Response {
    let mut routes = routes.lock();
    if let Some(token) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        routes.authorizations.push(token.to_string());
    }
    match routes.bodies.get(path) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

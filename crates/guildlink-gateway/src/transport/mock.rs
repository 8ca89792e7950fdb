//! In-memory transport for deterministic connection tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{Frame, Transport, TransportHandle, INBOUND_BUFFER_SIZE, OUTBOUND_BUFFER_SIZE};
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{GatewayMessage, OpCode};

/// Hands every accepted connection to the test as a [`MockPeer`]
pub(crate) struct MockTransport {
    peers: mpsc::UnboundedSender<MockPeer>,
    refusals: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

/// The test's side of the transport
pub(crate) struct MockServer {
    peers: mpsc::UnboundedReceiver<MockPeer>,
}

/// Server end of one connection
pub(crate) struct MockPeer {
    pub url: String,
    to_client: mpsc::Sender<Frame>,
    from_client: mpsc::Receiver<Frame>,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, MockServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            peers: tx,
            refusals: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        (transport, MockServer { peers: rx })
    }

    /// Fail the next `count` connection attempts
    pub fn refuse_next(&self, count: usize) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    /// Every URL a connection was attempted against
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> GatewayResult<TransportHandle> {
        self.urls.lock().push(url.to_string());

        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }

        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER_SIZE);
        let (in_tx, in_rx) = mpsc::channel(INBOUND_BUFFER_SIZE);
        let peer = MockPeer {
            url: url.to_string(),
            to_client: in_tx,
            from_client: out_rx,
        };
        self.peers
            .send(peer)
            .map_err(|_| GatewayError::Transport("mock server gone".to_string()))?;

        Ok(TransportHandle {
            outgoing: out_tx,
            incoming: in_rx,
        })
    }
}

impl MockServer {
    pub async fn accept(&mut self) -> MockPeer {
        self.peers.recv().await.expect("transport dropped")
    }

    /// Whether a connection was attempted and not yet accepted
    pub fn has_pending(&mut self) -> bool {
        !self.peers.is_empty()
    }
}

impl MockPeer {
    pub async fn send(&self, message: GatewayMessage) {
        let json = message.to_json().expect("encode");
        self.send_raw(json).await;
    }

    pub async fn send_raw(&self, text: impl Into<String>) {
        // The client may already have hung up
        let _ = self.to_client.send(Frame::Text(text.into())).await;
    }

    pub async fn hello(&self, interval_ms: u64) {
        self.send(GatewayMessage::hello(interval_ms)).await;
    }

    pub async fn dispatch(&self, event: &str, sequence: u64, data: Value) {
        self.send(GatewayMessage::dispatch(event, sequence, data)).await;
    }

    /// Send a READY for `session_id`
    pub async fn ready(&self, session_id: &str, sequence: u64) {
        self.dispatch(
            "READY",
            sequence,
            serde_json::json!({
                "v": 9,
                "session_id": session_id,
                "resume_gateway_url": "wss://resume.gateway.test",
                "user": { "id": "1", "username": "me" },
                "guilds": []
            }),
        )
        .await;
    }

    pub async fn close(&self, code: u16) {
        let _ = self.to_client.send(Frame::Close(Some(code))).await;
    }

    /// Next raw frame from the client; `None` once the client hung up
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next message that is not a heartbeat; `None` on close
    pub async fn recv_message(&mut self) -> Option<GatewayMessage> {
        loop {
            match self.from_client.recv().await? {
                Frame::Text(text) => {
                    let message = GatewayMessage::from_json(&text).expect("client sent bad json");
                    if message.op != OpCode::Heartbeat {
                        return Some(message);
                    }
                }
                Frame::Close(_) => return None,
            }
        }
    }

    /// Next heartbeat, skipping anything else
    pub async fn recv_heartbeat(&mut self) -> Option<GatewayMessage> {
        loop {
            match self.from_client.recv().await? {
                Frame::Text(text) => {
                    let message = GatewayMessage::from_json(&text).expect("client sent bad json");
                    if message.op == OpCode::Heartbeat {
                        return Some(message);
                    }
                }
                Frame::Close(_) => return None,
            }
        }
    }

    /// Drain until the client closes; returns the close code it sent
    pub async fn recv_close(&mut self) -> Option<u16> {
        loop {
            match self.from_client.recv().await? {
                Frame::Close(code) => return code,
                Frame::Text(_) => {}
            }
        }
    }
}

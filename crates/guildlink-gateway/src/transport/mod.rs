//! Transport seam
//!
//! The connection manager only sees two channels per connection: frames to
//! write and frames read. Whatever owns the socket sits behind [`Transport`].

mod websocket;

#[cfg(test)]
pub(crate) mod mock;

pub use websocket::TungsteniteTransport;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::GatewayResult;

/// Channel buffer size for outgoing frames
pub const OUTBOUND_BUFFER_SIZE: usize = 100;

/// Channel buffer size for incoming frames
pub const INBOUND_BUFFER_SIZE: usize = 256;

/// One unit on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A JSON envelope
    Text(String),
    /// Close with an optional code; inbound `None` means no close frame
    Close(Option<u16>),
}

/// Both ends of an open connection
///
/// Dropping `outgoing` (and every clone of it) closes the socket. The
/// `incoming` channel ends when the socket does.
#[derive(Debug)]
pub struct TransportHandle {
    pub outgoing: mpsc::Sender<Frame>,
    pub incoming: mpsc::Receiver<Frame>,
}

/// Opens connections to the gateway
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> GatewayResult<TransportHandle>;
}

//! WebSocket transport
//!
//! One writer task owns the sink and one reader task owns the stream; both
//! talk to the connection manager through bounded channels.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use super::{Frame, Transport, TransportHandle, INBOUND_BUFFER_SIZE, OUTBOUND_BUFFER_SIZE};
use crate::error::GatewayResult;

/// `tokio-tungstenite` client transport
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> GatewayResult<TransportHandle> {
        let (socket, response) = connect_async(url).await?;

        tracing::debug!(
            url = %url,
            status = %response.status(),
            "WebSocket connection established"
        );

        let (mut ws_sink, mut ws_stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Frame>(OUTBOUND_BUFFER_SIZE);
        let (in_tx, in_rx) = mpsc::channel::<Frame>(INBOUND_BUFFER_SIZE);

        // Writer: drains outgoing frames until a close or until every sender is gone
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    Frame::Text(text) => {
                        if ws_sink.send(Message::Text(text)).await.is_err() {
                            tracing::warn!("Failed to write to WebSocket");
                            break;
                        }
                    }
                    Frame::Close(code) => {
                        let close = code.map(|code| CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: Cow::Borrowed(""),
                        });
                        tracing::debug!(close_code = ?code, "Closing WebSocket");
                        let _ = ws_sink.send(Message::Close(close)).await;
                        break;
                    }
                }
            }

            let _ = ws_sink.close().await;
        });

        // Reader: forwards text frames; ends on close, error or a dropped receiver
        tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(Frame::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let code = frame.map(|f| u16::from(f.code));
                        tracing::debug!(close_code = ?code, "Server closed connection");
                        let _ = in_tx.send(Frame::Close(code)).await;
                        break;
                    }
                    Ok(Message::Binary(_)) => {
                        tracing::debug!("Binary frames not supported; dropped");
                    }
                    Ok(_) => {
                        tracing::trace!("Control frame received");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        });

        Ok(TransportHandle {
            outgoing: out_tx,
            incoming: in_rx,
        })
    }
}

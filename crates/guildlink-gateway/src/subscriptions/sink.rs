//! Outbound control channel used by subscriptions

use async_trait::async_trait;

use crate::connection::ConnectionManager;
use crate::error::GatewayResult;
use crate::protocol::GatewayMessage;

/// Where subscription control messages go
#[async_trait]
pub trait ControlSink: Send + Sync {
    async fn send_control(&self, message: GatewayMessage) -> GatewayResult<()>;
}

#[async_trait]
impl ControlSink for ConnectionManager {
    async fn send_control(&self, message: GatewayMessage) -> GatewayResult<()> {
        self.send(message).await
    }
}

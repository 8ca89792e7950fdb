//! # guildlink-gateway
//!
//! Client side of the realtime gateway: keeps one authenticated session alive
//! across dropped sockets, folds dispatches into the state cache and manages
//! guild subscriptions.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod protocol;
pub mod runtime;
pub mod subscriptions;
pub mod transport;

pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState, Session};
pub use dispatcher::{DispatchOutcome, EventDispatcher, RawEvent};
pub use error::{GatewayError, GatewayResult};
pub use runtime::{create_runtime, run, GatewayRuntime};
pub use subscriptions::{ControlSink, SubscriptionManager};
pub use transport::{Frame, Transport, TransportHandle, TungsteniteTransport};

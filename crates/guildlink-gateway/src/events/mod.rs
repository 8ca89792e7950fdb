//! Gateway events
//!
//! Dispatch event names and their typed payloads.

mod event_types;
mod gateway_event;

pub use event_types::GatewayEventType;
pub use gateway_event::{ChannelRef, GatewayEvent};

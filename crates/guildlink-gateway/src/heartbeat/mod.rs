//! Heartbeat monitoring
//!
//! Keeps the connection alive and detects a zombied one.

mod monitor;

pub use monitor::{HeartbeatMonitor, HeartbeatState, HeartbeatTick, Pulse, MISSED_ACK_TOLERANCE};

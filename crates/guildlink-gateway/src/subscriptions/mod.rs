//! Guild event subscriptions
//!
//! Tracks which guild's member list and which guilds' typing indicators the
//! server has been asked to stream.

mod manager;
mod sink;

pub use manager::SubscriptionManager;
pub use sink::ControlSink;

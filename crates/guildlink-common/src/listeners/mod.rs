//! Change-notification plumbing shared by the cache and the connection

mod registry;

pub use registry::{DeliveryReport, ListenerId, ListenerRegistry, ScopedListeners, Subscription};

//! Shared, observable holder of the current snapshot

mod state_cache;

pub use state_cache::StateCache;

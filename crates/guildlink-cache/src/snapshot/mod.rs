//! Copy-on-write snapshot of the cached state

mod snapshot;

pub use snapshot::{Snapshot, DEFAULT_MESSAGE_LIMIT};

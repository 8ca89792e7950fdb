//! Dispatch payloads that are not themselves cached entities
//!
//! These are the session-level envelopes (full sync, supplemental sync, typing)
//! whose contents the state cache unpacks into entities.

mod sync;

pub use sync::{MergedPresences, ReadyEvent, ReadySupplementalEvent, TypingStart};

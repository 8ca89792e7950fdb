//! Event dispatch
//!
//! Routes each decoded dispatch event to its state cache mutation, then hands
//! the raw event to subscribers.

mod apply;
mod router;

pub use apply::apply_event;
pub use router::{DispatchOutcome, EventDispatcher, RawEvent};

//! Gateway connection
//!
//! The state machine that keeps one session alive across dropped sockets.

mod backoff;
mod manager;
mod session;
mod state;

pub use backoff::{invalid_session_delay, Backoff};
pub use manager::ConnectionManager;
pub use session::Session;
pub use state::{ConnectionEvent, ConnectionState};

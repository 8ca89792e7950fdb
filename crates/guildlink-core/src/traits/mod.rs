//! Collaborator traits (ports)
//!
//! The session layer defines what it needs from the outside world; other
//! crates provide the implementations.

mod collaborators;

pub use collaborators::{CredentialStore, GuildDirectory};

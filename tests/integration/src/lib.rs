//! Integration test utilities for the guildlink client
//!
//! This crate provides in-process mock gateway and REST servers for running
//! the client end to end over real sockets.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

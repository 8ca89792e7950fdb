//! # guildlink-rest
//!
//! Stateless HTTP lookups used to refresh cached guilds out of band.

pub mod directory;
pub mod error;

pub use directory::HttpGuildDirectory;
pub use error::{RestError, RestResult};

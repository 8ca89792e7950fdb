//! # guildlink-cache
//!
//! Local state cache for a gateway session.
//!
//! ## Features
//!
//! - **Snapshot**: guilds, channels, members, presences, recent messages and
//!   user settings, with per-map structural sharing
//! - **StateCache**: serialized writers, cheap snapshot reads and change
//!   observation with unsubscribe handles
//!
//! ## Example
//!
//! ```ignore
//! use guildlink_cache::StateCache;
//!
//! let cache = StateCache::with_message_limit(50);
//! let _sub = cache.subscribe(|snapshot| {
//!     tracing::info!(guilds = snapshot.guild_count(), "State changed");
//!     Ok(())
//! });
//! cache.apply_full_sync(ready);
//! let snapshot = cache.snapshot();
//! ```

pub mod snapshot;
pub mod store;

pub use snapshot::{Snapshot, DEFAULT_MESSAGE_LIMIT};
pub use store::StateCache;

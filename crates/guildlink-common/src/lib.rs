//! # guildlink-common
//!
//! Shared utilities including configuration, error handling, telemetry,
//! listener registries and credential storage.

pub mod config;
pub mod credentials;
pub mod error;
pub mod listeners;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    ApiConfig, AppSettings, CacheConfig, ClientConfig, ConfigError, Environment, GatewayConfig,
    IdentityConfig,
};
pub use credentials::StaticCredentialStore;
pub use error::{ClientError, ClientResult};
pub use listeners::{DeliveryReport, ListenerId, ListenerRegistry, ScopedListeners, Subscription};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};

//! In-process credential store, optionally seeded from configuration

use async_trait::async_trait;
use guildlink_core::CredentialStore;
use parking_lot::Mutex;

use crate::config::ClientConfig;

/// Holds the token in memory; `discard` forgets it for the life of the process
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    token: Mutex<Option<String>>,
}

impl StaticCredentialStore {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    /// Seed from `AUTH_TOKEN`
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.auth_token.clone())
    }

    /// Replace the stored token
    pub fn store(&self, token: impl Into<String>) {
        *self.token.lock() = Some(token.into());
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    async fn discard(&self) {
        if self.token.lock().take().is_some() {
            tracing::debug!("Stored credential discarded");
        }
    }
}

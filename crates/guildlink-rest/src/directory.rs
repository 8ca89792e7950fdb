//! HTTP guild directory
//!
//! `GET {base}/guilds/{id}`, `/channels` and `/roles` with the account token
//! in the `Authorization` header. No retries and no caching; any failure is
//! logged and reported as an absent result.

use async_trait::async_trait;
use guildlink_common::ApiConfig;
use guildlink_core::{
    Channel, CredentialStore, DecodeError, Guild, GuildDirectory, GuildProperties, Role, Snowflake,
};
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{RestError, RestResult};

/// `GuildDirectory` backed by the platform's REST API
pub struct HttpGuildDirectory {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for HttpGuildDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGuildDirectory")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpGuildDirectory {
    /// Build a directory for `config.base_url`
    ///
    /// # Errors
    /// Returns an error if the base URL is not http(s) or the client cannot be built
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialStore>) -> RestResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RestError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> RestResult<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http_client.get(&url);
        if let Some(token) = self.credentials.load().await {
            request = request.header(AUTHORIZATION, token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RestError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        response.json::<Value>().await.map_err(|e| RestError::Body {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Run a lookup, logging and swallowing any failure
    async fn lookup<T>(
        &self,
        path: String,
        decode: impl FnOnce(Value) -> RestResult<T>,
    ) -> Option<T> {
        match self.get(&path).await.and_then(decode) {
            Ok(value) => {
                tracing::debug!(path = %path, "Lookup succeeded");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, code = e.error_code(), "Lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl GuildDirectory for HttpGuildDirectory {
    async fn fetch_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        let path = format!("/guilds/{guild_id}");
        let body_path = path.clone();
        self.lookup(path, move |body| {
            serde_json::from_value::<GuildProperties>(body)
                .map(Guild::from_properties)
                .map_err(|e| RestError::Body {
                    path: body_path,
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn fetch_guild_channels(
        &self,
        guild_id: Snowflake,
    ) -> Option<Vec<Result<Channel, DecodeError>>> {
        let path = format!("/guilds/{guild_id}/channels");
        let body_path = path.clone();
        self.lookup(path, move |body| {
            decode_channels(body).ok_or(RestError::Body {
                path: body_path,
                message: "expected an array".to_string(),
            })
        })
        .await
    }

    async fn fetch_guild_roles(&self, guild_id: Snowflake) -> Option<Vec<Role>> {
        let path = format!("/guilds/{guild_id}/roles");
        let body_path = path.clone();
        self.lookup(path, move |body| {
            serde_json::from_value::<Vec<Role>>(body).map_err(|e| RestError::Body {
                path: body_path,
                message: e.to_string(),
            })
        })
        .await
    }
}

/// Decode a channel array element by element
///
/// Returns `None` when the body is not an array at all.
fn decode_channels(body: Value) -> Option<Vec<Result<Channel, DecodeError>>> {
    let Value::Array(elements) = body else {
        return None;
    };

    let channels = elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_value::<Channel>(element)
                .map_err(|e| DecodeError::element("channel", index, &e))
        })
        .collect::<Vec<_>>();

    let failed = channels.iter().filter(|c| c.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed, total = channels.len(), "Some channels failed to decode");
    }
    Some(channels)
}

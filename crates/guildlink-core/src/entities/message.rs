//! Message entity and its partial update/delete forms

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::User;
use crate::value_objects::Snowflake;

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub attachments: Vec<Value>,
    #[serde(default)]
    pub embeds: Vec<Value>,
    #[serde(default)]
    pub nonce: Option<Value>,
}

impl Message {
    /// Create a plain text message
    #[must_use]
    pub fn new(id: Snowflake, channel_id: Snowflake, content: impl Into<String>) -> Self {
        Self {
            id,
            channel_id,
            guild_id: None,
            author: None,
            content: content.into(),
            timestamp: None,
            edited_timestamp: None,
            pinned: false,
            mention_everyone: false,
            attachments: Vec::new(),
            embeds: Vec::new(),
            nonce: None,
        }
    }

    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }
}

/// MESSAGE_UPDATE payload; only changed fields are present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub attachments: Option<Vec<Value>>,
    #[serde(default)]
    pub embeds: Option<Vec<Value>>,
}

impl MessageUpdate {
    /// Overwrite the fields this update carries
    pub fn apply_to(&self, message: &mut Message) {
        if let Some(content) = &self.content {
            message.content.clone_from(content);
        }
        if self.edited_timestamp.is_some() {
            message.edited_timestamp = self.edited_timestamp;
        }
        if let Some(pinned) = self.pinned {
            message.pinned = pinned;
        }
        if let Some(attachments) = &self.attachments {
            message.attachments.clone_from(attachments);
        }
        if let Some(embeds) = &self.embeds {
            message.embeds.clone_from(embeds);
        }
    }
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

//! User entities - other users and the signed-in account

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Public user record as embedded in messages, members and relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Create a user with only the required fields
    #[must_use]
    pub fn new(id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            discriminator: None,
            global_name: None,
            avatar: None,
            bot: false,
        }
    }

    /// Name to show in UI: global display name, falling back to username
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Legacy `username#discriminator` tag; `0` marks migrated accounts
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}

/// The signed-in account, delivered in READY and USER_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub mfa_enabled: bool,
    #[serde(default)]
    pub premium_type: Option<u8>,
}

impl CurrentUser {
    #[inline]
    pub fn id(&self) -> Snowflake {
        self.user.id
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            user,
            email: None,
            verified: false,
            mfa_enabled: false,
            premium_type: None,
        }
    }
}

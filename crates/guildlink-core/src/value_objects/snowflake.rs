//! Snowflake ids
//!
//! The server assigns every id. On the wire an id is usually a decimal string
//! (64-bit integers do not survive JavaScript clients) but a bare number is
//! accepted too.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Milliseconds between the Unix epoch and the platform epoch (2015-01-01)
const PLATFORM_EPOCH_MS: i64 = 1_420_070_400_000;

/// Bits below the timestamp
const TIMESTAMP_SHIFT: u32 = 22;

/// Server-assigned 64-bit id; ordering follows creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(i64);

impl Snowflake {
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// When the id was minted
    pub fn created_at(self) -> DateTime<Utc> {
        let millis = (self.0 >> TIMESTAMP_SHIFT) + PLATFORM_EPOCH_MS;
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }

    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| SnowflakeParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a snowflake: {0:?}")]
pub struct SnowflakeParseError(pub String);

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Either wire form of an id
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match WireId::deserialize(deserializer)? {
            WireId::Number(id) => Ok(Self(id)),
            WireId::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

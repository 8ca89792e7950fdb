//! Decode errors - a payload or list element that did not match its schema
//!
//! Decoding failures are always local: one bad event or one bad list element
//! never takes its neighbours down with it.

use thiserror::Error;

/// Domain layer decode errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed {event} payload: {message}")]
    Payload { event: String, message: String },

    #[error("Malformed {entity} at index {index}: {message}")]
    Element {
        entity: &'static str,
        index: usize,
        message: String,
    },

    #[error("Missing payload for {0}")]
    MissingPayload(String),
}

impl DecodeError {
    /// Build a payload error from a serde failure
    pub fn payload(event: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Payload {
            event: event.into(),
            message: err.to_string(),
        }
    }

    /// Build a list element error from a serde failure
    pub fn element(entity: &'static str, index: usize, err: &serde_json::Error) -> Self {
        Self::Element {
            entity,
            index,
            message: err.to_string(),
        }
    }

    /// Get an error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Payload { .. } => "MALFORMED_PAYLOAD",
            Self::Element { .. } => "MALFORMED_ELEMENT",
            Self::MissingPayload(_) => "MISSING_PAYLOAD",
        }
    }
}

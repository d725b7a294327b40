//! Feed Codec
//!
//! Decodes inbound Finnhub JSON frames into [`FeedMessage`] values.
//! Unknown message types and malformed payloads are surfaced as
//! [`CodecError`] so the connector can drop and count them without
//! tearing down the connection.

use super::messages::FeedMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` discriminator is missing.
    #[error("message has no type field: {0}")]
    MissingType(String),

    /// Unknown message type.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

/// JSON codec for the Finnhub feed.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame into a [`FeedMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON, has no `type`
    /// field, or carries a type this service does not handle.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let Some(msg_type) = value.get("type").and_then(|v| v.as_str()) else {
            return Err(CodecError::MissingType(truncate(text)));
        };

        match msg_type {
            "trade" | "ping" | "error" => Ok(serde_json::from_value(value)?),
            other => Err(CodecError::UnknownMessageType(other.to_string())),
        }
    }

    /// Encode a value to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

fn truncate(text: &str) -> String {
    const MAX: usize = 80;
    if text.len() <= MAX {
        text.to_string()
    } else {
        let mut end = MAX;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

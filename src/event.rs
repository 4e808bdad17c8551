//! Ingest events
//!
//! Normalizes the notifications an ingest server sends when a publisher
//! connects or disconnects. Two shapes are accepted:
//!
//! - JSON bodies `{"stream_key": "...", "action": "publish", "timestamp": ...}`,
//!   or a bare stream key as the whole body
//! - nginx-rtmp callbacks, which carry the key in `name` and the callback type
//!   in `call` (`publish_done` means the publisher left)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from decoding an ingest event
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event has no stream key")]
    MissingKey,
}

/// What happened to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamAction {
    Publish,
    Unpublish,
    /// Any action this service does not handle
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for StreamAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamAction::Publish => f.write_str("publish"),
            StreamAction::Unpublish => f.write_str("unpublish"),
            StreamAction::Unknown => f.write_str("unknown"),
        }
    }
}

/// A publish or unpublish notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub stream_key: String,
    pub action: StreamAction,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    pub fn publish(stream_key: impl Into<String>) -> Self {
        Self {
            stream_key: stream_key.into(),
            action: StreamAction::Publish,
            timestamp: Utc::now(),
        }
    }

    pub fn unpublish(stream_key: impl Into<String>) -> Self {
        Self {
            stream_key: stream_key.into(),
            action: StreamAction::Unpublish,
            timestamp: Utc::now(),
        }
    }

    /// Decode a request body
    ///
    /// Bodies starting with `{` are JSON events; anything else is taken as a
    /// bare stream key announcing a publish.
    pub fn from_body(body: &str) -> Result<Self, EventError> {
        let body = body.trim();

        let event = if body.starts_with('{') {
            serde_json::from_str::<StreamEvent>(body)?
        } else {
            StreamEvent::publish(body)
        };

        if event.stream_key.is_empty() {
            return Err(EventError::MissingKey);
        }
        Ok(event)
    }

    /// Build an event from nginx-rtmp callback parameters
    pub fn from_callback(call: Option<&str>, name: &str) -> Result<Self, EventError> {
        if name.is_empty() {
            return Err(EventError::MissingKey);
        }

        Ok(match call {
            Some("publish_done") => StreamEvent::unpublish(name),
            _ => StreamEvent::publish(name),
        })
    }
}

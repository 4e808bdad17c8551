//! Stream key type
//!
//! A stream key joins the ingest session, the local output directory, the
//! storage prefix and the registry row, so it is validated once on
//! construction and passed around as a typed value afterwards.

use std::borrow::Borrow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted stream key, in bytes
pub const MAX_STREAM_KEY_LEN: usize = 128;

/// Reason a stream key was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStreamKey {
    #[error("stream key is empty")]
    Empty,
    #[error("stream key is longer than {MAX_STREAM_KEY_LEN} bytes")]
    TooLong,
    #[error("stream key {0:?} is a relative path component")]
    Relative(String),
    #[error("stream key contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

/// Unique identifier for an ingest session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamKey(String);

impl StreamKey {
    /// Validate and wrap a stream key
    pub fn parse(key: impl Into<String>) -> Result<Self, InvalidStreamKey> {
        let key = key.into();

        if key.is_empty() {
            return Err(InvalidStreamKey::Empty);
        }
        if key.len() > MAX_STREAM_KEY_LEN {
            return Err(InvalidStreamKey::TooLong);
        }
        if key == "." || key == ".." {
            return Err(InvalidStreamKey::Relative(key));
        }
        if let Some(c) = key
            .chars()
            .find(|c| matches!(*c, '/' | '\\') || c.is_control())
        {
            return Err(InvalidStreamKey::ForbiddenChar(c));
        }

        Ok(Self(key))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamKey {
    type Err = InvalidStreamKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StreamKey {
    type Error = InvalidStreamKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for StreamKey {
    type Error = InvalidStreamKey;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StreamKey> for String {
    fn from(key: StreamKey) -> Self {
        key.0
    }
}

impl AsRef<str> for StreamKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StreamKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let key = StreamKey::parse("stream_key_123").unwrap();
        assert_eq!(key.as_str(), "stream_key_123");
        assert_eq!(key.to_string(), "stream_key_123");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(StreamKey::parse(""), Err(InvalidStreamKey::Empty));
    }

    #[test]
    fn test_parse_rejects_path_components() {
        assert!(matches!(
            StreamKey::parse(".."),
            Err(InvalidStreamKey::Relative(_))
        ));
        assert_eq!(
            StreamKey::parse("../etc"),
            Err(InvalidStreamKey::ForbiddenChar('/'))
        );
        assert_eq!(
            StreamKey::parse("a\\b"),
            Err(InvalidStreamKey::ForbiddenChar('\\'))
        );
        assert_eq!(
            StreamKey::parse("a\nb"),
            Err(InvalidStreamKey::ForbiddenChar('\n'))
        );
    }

    #[test]
    fn test_parse_rejects_long_keys() {
        let key = "k".repeat(MAX_STREAM_KEY_LEN + 1);
        assert_eq!(StreamKey::parse(key), Err(InvalidStreamKey::TooLong));

        let key = "k".repeat(MAX_STREAM_KEY_LEN);
        assert!(StreamKey::parse(key).is_ok());
    }

    #[test]
    fn test_serde_validates() {
        let key: StreamKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(key.as_str(), "abc");

        let result: Result<StreamKey, _> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());
    }
}

//! Segment publishing to durable storage
//!
//! The encoder writes HLS artifacts to local disk; a [`SegmentPublisher`]
//! copies them to object storage where players fetch them. Publishers treat
//! the backend as opaque put/list/delete/sign operations.
//!
//! Remote object keys are laid out as `<root>/<stream key>/<file name>`, see
//! [`RemoteLayout`].

pub mod error;
pub mod memory;
#[cfg(feature = "oss")]
pub mod oss;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::StreamKey;

pub use error::StorageError;
pub use memory::MemoryPublisher;
#[cfg(feature = "oss")]
pub use oss::{OssConfig, OssPublisher};

/// Object stored in the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Full object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, when the backend reports one
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type derived from the key's extension
    pub content_type: &'static str,
}

/// Moves local output artifacts to durable storage
///
/// Uploads must be safe to repeat: the upload monitor re-sends every artifact
/// on each pass and relies on the backend overwriting.
#[async_trait]
pub trait SegmentPublisher: Send + Sync {
    /// Copy the file at `local_path` to `remote_key`
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError>;

    /// Delete every object whose key starts with `prefix`
    ///
    /// Returns the number of objects deleted.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError>;

    /// List objects whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;

    /// Time-limited read URL for `remote_key`
    async fn signed_url(&self, remote_key: &str, expires: Duration)
        -> Result<String, StorageError>;
}

/// Maps stream keys and file names to remote object keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    root: String,
}

impl RemoteLayout {
    /// Create a layout rooted at `root` (e.g. `"hls"`)
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into().trim_matches('/').to_string();
        Self { root }
    }

    /// Prefix holding every object of one stream, with trailing slash
    pub fn stream_prefix(&self, key: &StreamKey) -> String {
        if self.root.is_empty() {
            format!("{}/", key)
        } else {
            format!("{}/{}/", self.root, key)
        }
    }

    /// Object key for one artifact of a stream
    pub fn object_key(&self, key: &StreamKey, file_name: &str) -> String {
        format!("{}{}", self.stream_prefix(key), file_name)
    }
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self::new("hls")
    }
}

/// MIME type for an artifact, by file extension
pub fn content_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_layout() {
        let layout = RemoteLayout::default();
        let key = StreamKey::parse("abc").unwrap();

        assert_eq!(layout.stream_prefix(&key), "hls/abc/");
        assert_eq!(
            layout.object_key(&key, "segment_001.ts"),
            "hls/abc/segment_001.ts"
        );
    }

    #[test]
    fn test_remote_layout_trims_slashes() {
        let key = StreamKey::parse("abc").unwrap();

        assert_eq!(RemoteLayout::new("/live/").stream_prefix(&key), "live/abc/");
        assert_eq!(RemoteLayout::new("").stream_prefix(&key), "abc/");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            content_type("hls/abc/playlist.m3u8"),
            "application/vnd.apple.mpegurl"
        );
        assert_eq!(content_type("segment_000.ts"), "video/mp2t");
        assert_eq!(content_type("clip.mp4"), "video/mp4");
        assert_eq!(content_type("notes.txt"), "application/octet-stream");
        assert_eq!(content_type("no_extension"), "application/octet-stream");
    }
}

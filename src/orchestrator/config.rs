//! Orchestrator configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::OutputLayout;
use crate::registry::StreamKey;
use crate::storage::RemoteLayout;

/// Where the transcoder pulls each stream from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSource {
    /// URL scheme
    pub scheme: String,
    /// Ingest server host
    pub host: String,
    /// Ingest server port
    pub port: u16,
    /// Application name
    pub app: String,
}

impl Default for IngestSource {
    fn default() -> Self {
        Self {
            scheme: "rtmp".into(),
            host: "rtmp".into(),
            port: 1935,
            app: "live".into(),
        }
    }
}

impl IngestSource {
    /// Input URL for one stream (e.g. `rtmp://rtmp:1935/live/abc`)
    pub fn url(&self, key: &StreamKey) -> String {
        format!(
            "{}://{}:{}/{}/{}",
            self.scheme, self.host, self.port, self.app, key
        )
    }
}

/// Orchestrator configuration options
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Directory holding one output directory per stream
    pub output_root: PathBuf,

    /// Ingest server the transcoder reads from
    pub ingest: IngestSource,

    /// File naming inside each output directory
    pub layout: OutputLayout,

    /// Object key layout in storage
    pub remote: RemoteLayout,

    /// Delay before the first upload pass, giving the transcoder time to write
    pub upload_initial_delay: Duration,

    /// Interval between upload passes
    pub upload_interval: Duration,

    /// Capacity of the task event channel
    pub event_capacity: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("/tmp/hls"),
            ingest: IngestSource::default(),
            layout: OutputLayout::default(),
            remote: RemoteLayout::default(),
            upload_initial_delay: Duration::from_secs(3),
            upload_interval: Duration::from_secs(5),
            event_capacity: 64,
        }
    }
}

impl EncoderConfig {
    /// Create a config writing under `output_root`
    pub fn with_output_root(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// Output directory for one stream
    pub fn output_dir(&self, key: &StreamKey) -> PathBuf {
        self.output_root.join(key.as_str())
    }

    /// Set the output root
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Set the ingest server
    pub fn ingest(mut self, host: impl Into<String>, port: u16) -> Self {
        self.ingest.host = host.into();
        self.ingest.port = port;
        self
    }

    /// Set the ingest application name
    pub fn ingest_app(mut self, app: impl Into<String>) -> Self {
        self.ingest.app = app.into();
        self
    }

    /// Set the output file layout
    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the root prefix for uploaded objects
    pub fn remote_root(mut self, root: impl Into<String>) -> Self {
        self.remote = RemoteLayout::new(root);
        self
    }

    /// Set the delay before the first upload pass
    pub fn upload_initial_delay(mut self, delay: Duration) -> Self {
        self.upload_initial_delay = delay;
        self
    }

    /// Set the upload interval; a zero interval is raised to one millisecond
    pub fn upload_interval(mut self, interval: Duration) -> Self {
        self.upload_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the task event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncoderConfig::default();

        assert_eq!(config.output_root, PathBuf::from("/tmp/hls"));
        assert_eq!(config.ingest.port, 1935);
        assert_eq!(config.upload_initial_delay, Duration::from_secs(3));
        assert_eq!(config.upload_interval, Duration::from_secs(5));
        assert_eq!(config.layout, OutputLayout::default());
    }

    #[test]
    fn test_ingest_url() {
        let config = EncoderConfig::default().ingest("media.local", 1936);
        let key = StreamKey::parse("abc").unwrap();

        assert_eq!(config.ingest.url(&key), "rtmp://media.local:1936/live/abc");
    }

    #[test]
    fn test_output_dir() {
        let config = EncoderConfig::with_output_root("/var/hls");
        let key = StreamKey::parse("abc").unwrap();

        assert_eq!(config.output_dir(&key), PathBuf::from("/var/hls/abc"));
    }

    #[test]
    fn test_builder_interval_floor() {
        let config = EncoderConfig::default().upload_interval(Duration::ZERO);
        assert_eq!(config.upload_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_builder_chaining() {
        let key = StreamKey::parse("k").unwrap();
        let config = EncoderConfig::default()
            .output_root("/data")
            .ingest("ingest", 1940)
            .ingest_app("stream")
            .remote_root("vod")
            .upload_initial_delay(Duration::from_millis(10))
            .upload_interval(Duration::from_millis(20))
            .event_capacity(0);

        assert_eq!(config.output_dir(&key), PathBuf::from("/data/k"));
        assert_eq!(config.ingest.url(&key), "rtmp://ingest:1940/stream/k");
        assert_eq!(config.remote.stream_prefix(&key), "vod/k/");
        assert_eq!(config.upload_initial_delay, Duration::from_millis(10));
        assert_eq!(config.upload_interval, Duration::from_millis(20));
        assert_eq!(config.event_capacity, 1);
    }
}

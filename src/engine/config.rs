//! FFmpeg engine configuration

use std::path::PathBuf;

/// Options for the FFmpeg HLS engine
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// Path or name of the ffmpeg binary
    pub program: PathBuf,

    /// Video codec
    pub video_codec: String,

    /// Encoder preset
    pub preset: String,

    /// Encoder tuning
    pub tune: Option<String>,

    /// Audio codec
    pub audio_codec: String,

    /// Audio bitrate (ffmpeg syntax, e.g. "128k")
    pub audio_bitrate: String,

    /// Target segment duration in seconds
    pub hls_time: u32,

    /// Number of segments kept in the playlist
    pub hls_list_size: u32,

    /// Let ffmpeg delete segments that fell out of the playlist
    pub delete_segments: bool,

    /// Extra arguments inserted before the output options
    pub extra_args: Vec<String>,

    /// Forward the child's stdout/stderr to ours instead of discarding them
    pub inherit_output: bool,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            video_codec: "libx264".into(),
            preset: "ultrafast".into(),
            tune: Some("zerolatency".into()),
            audio_codec: "aac".into(),
            audio_bitrate: "128k".into(),
            hls_time: 3,
            hls_list_size: 60,
            delete_segments: true,
            extra_args: Vec::new(),
            inherit_output: true,
        }
    }
}

impl FfmpegConfig {
    /// Set the ffmpeg binary
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the encoder preset
    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Set segment duration, at least one second
    pub fn hls_time(mut self, seconds: u32) -> Self {
        self.hls_time = seconds.max(1);
        self
    }

    /// Set playlist length
    pub fn hls_list_size(mut self, size: u32) -> Self {
        self.hls_list_size = size;
        self
    }

    /// Keep every segment on disk
    pub fn keep_segments(mut self) -> Self {
        self.delete_segments = false;
        self
    }

    /// Append an extra argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Discard the child's output
    pub fn quiet(mut self) -> Self {
        self.inherit_output = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FfmpegConfig::default();

        assert_eq!(config.program, PathBuf::from("ffmpeg"));
        assert_eq!(config.video_codec, "libx264");
        assert_eq!(config.hls_time, 3);
        assert_eq!(config.hls_list_size, 60);
        assert!(config.delete_segments);
        assert!(config.inherit_output);
    }

    #[test]
    fn test_builder_hls_time_floor() {
        let config = FfmpegConfig::default().hls_time(0);
        assert_eq!(config.hls_time, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = FfmpegConfig::default()
            .program("/usr/local/bin/ffmpeg")
            .preset("veryfast")
            .hls_time(6)
            .hls_list_size(10)
            .keep_segments()
            .arg("-loglevel")
            .arg("warning")
            .quiet();

        assert_eq!(config.program, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.preset, "veryfast");
        assert_eq!(config.hls_time, 6);
        assert_eq!(config.hls_list_size, 10);
        assert!(!config.delete_segments);
        assert_eq!(config.extra_args, vec!["-loglevel", "warning"]);
        assert!(!config.inherit_output);
    }
}

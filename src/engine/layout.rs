//! Output directory layout
//!
//! Names of the files an engine writes, shared by the engine (to build its
//! arguments) and the upload monitor (to find what to publish).

use std::path::{Path, PathBuf};

/// File naming inside one stream's output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Manifest file name
    pub manifest_name: String,

    /// Segment file name prefix
    pub segment_prefix: String,

    /// Segment file extension, without the dot
    pub segment_extension: String,

    /// Digits in the segment sequence number
    pub segment_digits: u8,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            manifest_name: "playlist.m3u8".into(),
            segment_prefix: "segment_".into(),
            segment_extension: "ts".into(),
            segment_digits: 3,
        }
    }
}

impl OutputLayout {
    /// Path of the manifest inside `dir`
    pub fn manifest_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.manifest_name)
    }

    /// printf-style segment pattern inside `dir` (e.g. `segment_%03d.ts`)
    pub fn segment_pattern(&self, dir: &Path) -> PathBuf {
        dir.join(format!(
            "{}%0{}d.{}",
            self.segment_prefix, self.segment_digits, self.segment_extension
        ))
    }

    /// Whether `file_name` is a segment written under this layout
    pub fn is_segment(&self, file_name: &str) -> bool {
        let Some(rest) = file_name.strip_prefix(self.segment_prefix.as_str()) else {
            return false;
        };
        let Some(number) = rest
            .strip_suffix(self.segment_extension.as_str())
            .and_then(|r| r.strip_suffix('.'))
        else {
            return false;
        };

        !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())
    }

    /// Whether `file_name` is the manifest
    pub fn is_manifest(&self, file_name: &str) -> bool {
        file_name == self.manifest_name
    }
}

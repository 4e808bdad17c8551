//! FFmpeg HLS engine
//!
//! Runs one `ffmpeg` child per stream, reading the ingest URL and writing an
//! HLS playlist with numbered MPEG-TS segments.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::config::FfmpegConfig;
use super::layout::OutputLayout;
use super::{EngineProcess, ExitReport, TranscodingEngine};

/// Engine that shells out to ffmpeg
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    config: FfmpegConfig,
    layout: OutputLayout,
}

impl FfmpegEngine {
    pub fn new(config: FfmpegConfig, layout: OutputLayout) -> Self {
        Self { config, layout }
    }

    /// Get the engine configuration
    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    /// Arguments for transcoding `input` into `output_dir`
    pub fn build_args(&self, input: &str, output_dir: &Path) -> Vec<OsString> {
        let c = &self.config;
        let mut args: Vec<OsString> = Vec::with_capacity(32);
        let mut push = |s: &str| args.push(s.into());

        push("-i");
        push(input);
        push("-c:v");
        push(&c.video_codec);
        push("-preset");
        push(&c.preset);
        if let Some(tune) = &c.tune {
            push("-tune");
            push(tune);
        }
        push("-c:a");
        push(&c.audio_codec);
        push("-b:a");
        push(&c.audio_bitrate);
        for extra in &c.extra_args {
            push(extra);
        }
        push("-f");
        push("hls");
        push("-hls_time");
        push(&c.hls_time.to_string());
        push("-hls_list_size");
        push(&c.hls_list_size.to_string());
        if c.delete_segments {
            push("-hls_flags");
            push("delete_segments");
        }
        push("-hls_segment_filename");

        args.push(self.layout.segment_pattern(output_dir).into_os_string());
        args.push(self.layout.manifest_path(output_dir).into_os_string());
        args
    }

    fn command(&self, input: &str, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.build_args(input, output_dir))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if self.config.inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        cmd
    }
}

impl TranscodingEngine for FfmpegEngine {
    fn spawn(&self, input: &str, output_dir: &Path) -> io::Result<Box<dyn EngineProcess>> {
        let child = self.command(input, output_dir).spawn()?;

        tracing::debug!(
            pid = ?child.id(),
            program = %self.config.program.display(),
            input = input,
            "Spawned transcoder"
        );

        Ok(Box::new(ChildProcess(child)))
    }
}

/// [`EngineProcess`] over a tokio child process
pub struct ChildProcess(Child);

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self(child)
    }
}

#[async_trait]
impl EngineProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.0.id()
    }

    async fn wait(&mut self) -> io::Result<ExitReport> {
        self.0.wait().await.map(ExitReport::from)
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.0.start_kill()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_args_default() {
        let engine = FfmpegEngine::default();
        let args = args_as_strings(
            engine.build_args("rtmp://rtmp:1935/live/abc", Path::new("/tmp/hls/abc")),
        );

        assert_eq!(
            args,
            vec![
                "-i",
                "rtmp://rtmp:1935/live/abc",
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-tune",
                "zerolatency",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-f",
                "hls",
                "-hls_time",
                "3",
                "-hls_list_size",
                "60",
                "-hls_flags",
                "delete_segments",
                "-hls_segment_filename",
                "/tmp/hls/abc/segment_%03d.ts",
                "/tmp/hls/abc/playlist.m3u8",
            ]
        );
    }

    #[test]
    fn test_build_args_without_tune_or_deletion() {
        let mut config = FfmpegConfig::default().keep_segments().arg("-an");
        config.tune = None;
        let engine = FfmpegEngine::new(config, OutputLayout::default());

        let args = args_as_strings(engine.build_args("in", Path::new("out")));

        assert!(!args.iter().any(|a| a == "-tune"));
        assert!(!args.iter().any(|a| a == "delete_segments"));
        let an = args.iter().position(|a| a == "-an").unwrap();
        let format = args.iter().position(|a| a == "-f").unwrap();
        assert!(an < format);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_reports_success() {
        // `true` ignores its arguments and exits 0
        let engine = FfmpegEngine::new(
            FfmpegConfig::default().program("true").quiet(),
            OutputLayout::default(),
        );
        let dir = tempfile::tempdir().unwrap();

        let mut process = engine.spawn("input", dir.path()).unwrap();
        let exit = process.wait().await.unwrap();

        assert!(exit.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_reports_failure() {
        let engine = FfmpegEngine::new(
            FfmpegConfig::default().program("false").quiet(),
            OutputLayout::default(),
        );
        let dir = tempfile::tempdir().unwrap();

        let mut process = engine.spawn("input", dir.path()).unwrap();
        let exit = process.wait().await.unwrap();

        assert!(!exit.success());
        assert_eq!(exit.code, Some(1));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let engine = FfmpegEngine::new(
            FfmpegConfig::default()
                .program("/nonexistent/bin/ffmpeg")
                .quiet(),
            OutputLayout::default(),
        );
        let dir = tempfile::tempdir().unwrap();

        let result = engine.spawn("input", dir.path());
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_running_process() {
        // `sleep` rejects ffmpeg arguments, so drive a real child directly
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let mut process = ChildProcess::new(child);

        assert!(process.id().is_some());
        process.start_kill().unwrap();
        let exit = process.wait().await.unwrap();

        assert_eq!(exit, ExitReport::signaled());
    }
}

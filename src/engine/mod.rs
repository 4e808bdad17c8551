//! Transcoding engine abstraction
//!
//! The engine is an external process that reads one input stream and writes a
//! manifest plus numbered segment files into an output directory until it is
//! terminated. The orchestrator only needs to spawn it, wait for it and ask it
//! to die; everything about codecs and muxing stays inside the process.

pub mod config;
pub mod ffmpeg;
pub mod layout;

use std::io;
use std::path::Path;

use async_trait::async_trait;

pub use config::FfmpegConfig;
pub use ffmpeg::{ChildProcess, FfmpegEngine};
pub use layout::OutputLayout;

/// How an engine process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ExitReport {
    /// Exit with a status code
    pub fn code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Termination by signal
    pub fn signaled() -> Self {
        Self { code: None }
    }

    /// Whether the process reported success
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitReport {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl std::fmt::Display for ExitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => f.write_str("signal"),
        }
    }
}

/// Handle to a running engine process
#[async_trait]
pub trait EngineProcess: Send {
    /// OS process id, if the process is still known to the OS
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit
    ///
    /// Must be cancel-safe: dropping the future and calling again later
    /// still observes the exit.
    async fn wait(&mut self) -> io::Result<ExitReport>;

    /// Request termination without waiting for it
    fn start_kill(&mut self) -> io::Result<()>;
}

/// Spawns engine processes
pub trait TranscodingEngine: Send + Sync {
    /// Start transcoding `input` into `output_dir`
    fn spawn(&self, input: &str, output_dir: &Path) -> io::Result<Box<dyn EngineProcess>>;
}

//! Scripted collaborators for orchestrator tests

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::engine::{EngineProcess, ExitReport, OutputLayout, TranscodingEngine};
use crate::registry::{
    MemoryRegistry, RegistryError, StreamKey, StreamRecord, StreamRegistry, StreamStatus,
};
use crate::stats::StatsSnapshot;
use crate::storage::{MemoryPublisher, SegmentPublisher, StorageError, StoredObject};

type ExitSender = Arc<watch::Sender<Option<ExitReport>>>;

struct Spawned {
    input: String,
    output_dir: PathBuf,
    exit: ExitSender,
    killed: Arc<AtomicBool>,
}

/// Engine whose processes run until told to exit
///
/// Each spawn writes a manifest and one segment into the output directory.
#[derive(Default)]
pub struct FakeEngine {
    spawned: Mutex<Vec<Spawned>>,
    fail_spawn: AtomicBool,
    kill_delay: Mutex<Duration>,
    next_pid: AtomicU32,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make following spawns fail
    pub fn fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Delay between a kill request and the process exiting
    pub fn kill_delay(&self, delay: Duration) {
        *self.kill_delay.lock().unwrap() = delay;
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    /// Input URL of the `index`th spawn
    pub fn input(&self, index: usize) -> String {
        self.spawned.lock().unwrap()[index].input.clone()
    }

    /// Output directory of the `index`th spawn
    pub fn output_dir(&self, index: usize) -> PathBuf {
        self.spawned.lock().unwrap()[index].output_dir.clone()
    }

    /// Whether the `index`th process was asked to die
    pub fn was_killed(&self, index: usize) -> bool {
        self.spawned.lock().unwrap()[index]
            .killed
            .load(Ordering::SeqCst)
    }

    /// Make the `index`th process exit with `code`
    pub fn exit(&self, index: usize, code: i32) {
        let spawned = self.spawned.lock().unwrap();
        spawned[index].exit.send_if_modified(|exit| {
            if exit.is_some() {
                return false;
            }
            *exit = Some(ExitReport::code(code));
            true
        });
    }
}

impl TranscodingEngine for FakeEngine {
    fn spawn(&self, input: &str, output_dir: &Path) -> io::Result<Box<dyn EngineProcess>> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "transcoder not found",
            ));
        }

        let layout = OutputLayout::default();
        std::fs::write(layout.manifest_path(output_dir), b"#EXTM3U\n")?;
        std::fs::write(output_dir.join("segment_000.ts"), b"segment")?;

        let (tx, rx) = watch::channel(None);
        let exit = Arc::new(tx);
        let killed = Arc::new(AtomicBool::new(false));

        self.spawned.lock().unwrap().push(Spawned {
            input: input.to_string(),
            output_dir: output_dir.to_path_buf(),
            exit: Arc::clone(&exit),
            killed: Arc::clone(&killed),
        });

        Ok(Box::new(FakeProcess {
            pid: 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst),
            exit,
            rx,
            killed,
            kill_delay: *self.kill_delay.lock().unwrap(),
        }))
    }
}

struct FakeProcess {
    pid: u32,
    exit: ExitSender,
    rx: watch::Receiver<Option<ExitReport>>,
    killed: Arc<AtomicBool>,
    kill_delay: Duration,
}

#[async_trait]
impl EngineProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> io::Result<ExitReport> {
        let exit = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| io::Error::other("exit channel closed"))?;

        Ok((*exit).unwrap_or_else(ExitReport::signaled))
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);

        let exit = Arc::clone(&self.exit);
        let delay = self.kill_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            exit.send_if_modified(|exit| {
                if exit.is_some() {
                    return false;
                }
                *exit = Some(ExitReport::signaled());
                true
            });
        });

        Ok(())
    }
}

/// Registry with scripted failures and delays
///
/// Records the name of every write in call order.
#[derive(Default)]
pub struct ScriptedRegistry {
    inner: MemoryRegistry,
    fail_writes: AtomicBool,
    set_active_delay: Mutex<Duration>,
    writes: Mutex<Vec<&'static str>>,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold every `set_active` for `delay` before it lands
    pub fn set_active_delay(&self, delay: Duration) {
        *self.set_active_delay.lock().unwrap() = delay;
    }

    /// Writes seen so far, successful or not
    pub fn writes(&self) -> Vec<&'static str> {
        self.writes.lock().unwrap().clone()
    }

    pub async fn status(&self, key: &StreamKey) -> Option<StreamStatus> {
        self.inner.status(key).await
    }

    fn check(&self, write: &'static str) -> Result<(), RegistryError> {
        self.writes.lock().unwrap().push(write);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("database offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StreamRegistry for ScriptedRegistry {
    async fn create_if_absent(&self, key: &StreamKey) -> Result<StreamRecord, RegistryError> {
        self.check("create_if_absent")?;
        self.inner.create_if_absent(key).await
    }

    async fn set_active(&self, key: &StreamKey) -> Result<(), RegistryError> {
        let delay = *self.set_active_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.check("set_active")?;
        self.inner.set_active(key).await
    }

    async fn set_inactive(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.check("set_inactive")?;
        self.inner.set_inactive(key).await
    }

    async fn set_error(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.check("set_error")?;
        self.inner.set_error(key).await
    }

    async fn get(&self, key: &StreamKey) -> Result<Option<StreamRecord>, RegistryError> {
        self.inner.get(key).await
    }

    async fn list_active(&self) -> Result<Vec<StreamRecord>, RegistryError> {
        self.inner.list_active().await
    }

    async fn stats(&self) -> Result<StatsSnapshot, RegistryError> {
        self.inner.stats().await
    }
}

/// Publisher whose `delete_prefix` takes a while to start
pub struct SlowCleanupPublisher {
    inner: Arc<MemoryPublisher>,
    delay: Duration,
}

impl SlowCleanupPublisher {
    pub fn new(inner: Arc<MemoryPublisher>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl SegmentPublisher for SlowCleanupPublisher {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError> {
        self.inner.upload(local_path, remote_key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_prefix(prefix).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        self.inner.list(prefix).await
    }

    async fn signed_url(&self, remote_key: &str, expires: Duration) -> Result<String, StorageError> {
        self.inner.signed_url(remote_key, expires).await
    }
}

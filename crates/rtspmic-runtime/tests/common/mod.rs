//! Fake ports shared by the supervisor integration tests.
//!
//! The fake launcher hands every "process" to the test as a [`FakeStream`]:
//! the write half of a duplex pipe standing in for ffmpeg's stderr, plus a
//! flag telling whether the supervisor terminated it.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rtspmic_core::{
    DeviceError, DeviceResolver, LaunchError, LoopbackDevice, ProcessControl, ProcessTablePort,
    StreamConfig, StreamLauncher, StreamProcess,
};
use rtspmic_runtime::{PublishedState, StreamSupervisor};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::{mpsc, watch};

pub const URL: &str = "rtsp://cam/stream";

// ── Device resolver ────────────────────────────────────────────────

pub struct FakeResolver {
    device: Option<LoopbackDevice>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn loopback(card: u32) -> Self {
        Self {
            device: Some(LoopbackDevice::new(card, 0, "Loopback")),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            device: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DeviceResolver for FakeResolver {
    async fn resolve_loopback_device(&self) -> Result<LoopbackDevice, DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.device.clone().ok_or(DeviceError::NotFound {
            module_error: Some("modprobe: FATAL: Module snd-aloop not found".to_string()),
        })
    }
}

// ── Stream launcher ────────────────────────────────────────────────

/// The test's end of one launched fake process.
pub struct FakeStream {
    pub pid: u32,
    pub url: String,
    pub hw_path: String,
    writer: DuplexStream,
    terminated: Arc<AtomicBool>,
}

impl FakeStream {
    /// Emit an output line as ffmpeg would on stderr.
    pub async fn line(&mut self, text: &str) {
        // The monitor may already be gone after a restart
        let _ = self.writer.write_all(format!("{text}\n").as_bytes()).await;
    }

    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

struct FakeControl {
    pid: u32,
    terminated: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl ProcessControl for FakeControl {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn has_exited(&mut self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    async fn terminate(&mut self, _grace: Duration) -> io::Result<()> {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    streams: mpsc::UnboundedSender<FakeStream>,
    pub launches: AtomicUsize,
    live: Arc<AtomicUsize>,
    pub max_live: AtomicUsize,
    fail_with: Mutex<Option<LaunchError>>,
}

impl FakeLauncher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeStream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let launcher = Self {
            streams: tx,
            launches: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
        };
        (launcher, rx)
    }

    /// Make every following launch fail with `error`.
    pub fn fail_with(&self, error: LaunchError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamLauncher for FakeLauncher {
    fn program(&self) -> &str {
        "ffmpeg"
    }

    async fn launch(
        &self,
        rtsp_url: &str,
        device: &LoopbackDevice,
    ) -> Result<StreamProcess, LaunchError> {
        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Err(error);
        }

        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        let pid = 4000 + n as u32;
        let terminated = Arc::new(AtomicBool::new(false));
        let (writer, reader) = tokio::io::duplex(4096);

        let control = FakeControl {
            pid,
            terminated: Arc::clone(&terminated),
            live: Arc::clone(&self.live),
        };
        let _ = self.streams.send(FakeStream {
            pid,
            url: rtsp_url.to_string(),
            hw_path: device.hw_path(),
            writer,
            terminated,
        });
        Ok(StreamProcess::new(Box::new(control), Box::new(reader)))
    }
}

// ── Process table ──────────────────────────────────────────────────

/// Process table with fixed `(pid, command line)` rows.
#[derive(Default)]
pub struct FakeProcessTable {
    rows: Vec<(u32, String)>,
    pub terminated: Mutex<Vec<u32>>,
}

impl FakeProcessTable {
    pub fn with_rows(rows: &[(u32, &str)]) -> Self {
        Self {
            rows: rows.iter().map(|(pid, cmd)| (*pid, (*cmd).to_string())).collect(),
            terminated: Mutex::new(Vec::new()),
        }
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessTablePort for FakeProcessTable {
    fn find(&self, _program: &str, needles: &[&str]) -> Vec<u32> {
        self.rows
            .iter()
            .filter(|(_, cmd)| needles.iter().all(|n| cmd.contains(n)))
            .map(|(pid, _)| *pid)
            .collect()
    }

    async fn terminate(&self, pid: u32) -> io::Result<()> {
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub supervisor: StreamSupervisor,
    pub launcher: Arc<FakeLauncher>,
    pub resolver: Arc<FakeResolver>,
    pub table: Arc<FakeProcessTable>,
    pub streams: mpsc::UnboundedReceiver<FakeStream>,
    pub states: watch::Receiver<PublishedState>,
}

/// Test configuration: short check interval, no restart delay, no cooldown.
pub fn fast_config() -> StreamConfig {
    let mut config = StreamConfig::new(URL);
    config.check_interval_ms = 100;
    config.restart_delay_ms = 0;
    config.restart_cooldown_secs = 0.0;
    config
}

pub fn harness(config: StreamConfig) -> Harness {
    harness_with(config, FakeResolver::loopback(4), FakeProcessTable::default())
}

pub fn harness_with(
    config: StreamConfig,
    resolver: FakeResolver,
    table: FakeProcessTable,
) -> Harness {
    let (launcher, streams) = FakeLauncher::new();
    let launcher = Arc::new(launcher);
    let resolver = Arc::new(resolver);
    let table = Arc::new(table);

    let supervisor = StreamSupervisor::new(
        config,
        resolver.clone(),
        launcher.clone(),
        table.clone(),
    )
    .expect("valid config");
    let states = supervisor.subscribe();

    Harness {
        supervisor,
        launcher,
        resolver,
        table,
        streams,
        states,
    }
}

impl Harness {
    /// Wait (in virtual time) until the published state matches.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&PublishedState) -> bool,
    ) -> PublishedState {
        tokio::time::timeout(Duration::from_secs(3600), self.states.wait_for(|s| predicate(s)))
            .await
            .expect("state never reached")
            .expect("supervisor dropped")
            .clone()
    }

    pub async fn next_stream(&mut self) -> FakeStream {
        tokio::time::timeout(Duration::from_secs(3600), self.streams.recv())
            .await
            .expect("no launch")
            .expect("launcher dropped")
    }
}

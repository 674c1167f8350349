//! Stream supervisor owning the ffmpeg lifecycle.
//!
//! The supervisor owns its state internally behind a `tokio::sync::Mutex`;
//! callers (the CLI, tests) hold a `StreamSupervisor` and call methods on it
//! without keeping process handles themselves.
//!
//! Key design decisions:
//! - **One transition lock**: the process, restart bookkeeping and per-process
//!   cancellation token only change under `core`
//! - **Serialized restarts**: `restart_lock` is held for a whole restart
//!   sequence, so automatic and manual restarts never interleave. `stop` does
//!   not take it and can cancel a restart that is waiting out its delay
//! - **Generations**: every launch bumps a counter and monitor signals carry
//!   it, so a late signal from a replaced process is ignored
//! - **Lock-free reads**: status goes through a `watch` channel and the shared
//!   activity record, so `snapshot()` never waits on a transition

mod commands;
mod control;

use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use rtspmic_core::{
    CommandError, ConfigError, DeviceError, DeviceResolver, LaunchError, LoopbackDevice,
    ProcessTablePort, Readings, RestartState, StreamConfig, StreamLauncher, StreamProcess,
    StreamSignal, SupervisorState, SupervisorStatus,
};

use crate::alsa::AlsaLoopbackResolver;
use crate::clock;
use crate::ffmpeg::FfmpegLauncher;
use crate::monitor::{SharedActivity, read_activity, shared_activity};
use crate::process::SysinfoProcessTable;

/// Error from supervisor operations.
///
/// Stream failures never show up here; they are absorbed by the restart
/// policy and visible only through status.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// `shutdown()` has been called.
    #[error("Supervisor is shut down")]
    ShutDown,
}

/// State published on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedState {
    pub state: SupervisorState,
    /// The tracked process had not exited at the last check.
    pub process_alive: bool,
    pub pid: Option<u32>,
    pub generation: u64,
    pub rtsp_url: String,
    pub device: Option<LoopbackDevice>,
    pub restart_count: u32,
    pub max_restarts: u32,
    pub last_error: Option<String>,
}

/// Everything guarded by the transition lock.
struct Core {
    config: StreamConfig,
    state: SupervisorState,
    process: Option<StreamProcess>,
    process_alive: bool,
    restart: RestartState,
    device: Option<LoopbackDevice>,
    generation: u64,
    /// Signal deferred by the cooldown, re-evaluated on every tick.
    pending: Option<StreamSignal>,
    /// Cancels the monitor and watchdog of the current process.
    monitor_cancel: Option<CancellationToken>,
    /// Cancels a restart sequence waiting out its delay.
    restart_cancel: Option<CancellationToken>,
    last_error: Option<String>,
    orphans_swept: bool,
}

impl Core {
    fn new(config: StreamConfig) -> Self {
        Self {
            restart: RestartState::new(config.restart_policy()),
            config,
            state: SupervisorState::Stopped,
            process: None,
            process_alive: false,
            device: None,
            generation: 0,
            pending: None,
            monitor_cancel: None,
            restart_cancel: None,
            last_error: None,
            orphans_swept: false,
        }
    }

    fn tracked_pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(StreamProcess::pid)
    }

    fn hw_path(&self) -> Option<String> {
        self.device.as_ref().map(LoopbackDevice::hw_path)
    }

    fn published(&self) -> PublishedState {
        PublishedState {
            state: self.state,
            process_alive: self.process.is_some() && self.process_alive,
            pid: self.tracked_pid(),
            generation: self.generation,
            rtsp_url: self.config.rtsp_url.clone(),
            device: self.device.clone(),
            restart_count: self.restart.attempts(),
            max_restarts: self.restart.policy().max_attempts,
            last_error: self.last_error.clone(),
        }
    }
}

struct Inner {
    core: Mutex<Core>,
    restart_lock: Mutex<()>,
    status_tx: watch::Sender<PublishedState>,
    activity: SharedActivity,
    signals_tx: mpsc::UnboundedSender<StreamSignal>,
    resolver: Arc<dyn DeviceResolver>,
    launcher: Arc<dyn StreamLauncher>,
    process_table: Arc<dyn ProcessTablePort>,
    shutdown: CancellationToken,
}

/// Supervisor for one RTSP → loopback stream.
///
/// # Example
///
/// ```ignore
/// let supervisor = StreamSupervisor::with_system_ports(config)?;
/// supervisor.start().await?;
/// println!("{:?}", supervisor.readings());
/// supervisor.shutdown().await;
/// ```
pub struct StreamSupervisor {
    inner: Arc<Inner>,
    control_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl StreamSupervisor {
    /// Create a supervisor and spawn its control task.
    ///
    /// Must be called inside a tokio runtime. The stream is not started.
    pub fn new(
        config: StreamConfig,
        resolver: Arc<dyn DeviceResolver>,
        launcher: Arc<dyn StreamLauncher>,
        process_table: Arc<dyn ProcessTablePort>,
    ) -> Result<Self, SupervisorError> {
        config.validate()?;

        let check_interval = config.check_interval();
        let core = Core::new(config);
        let (status_tx, _) = watch::channel(core.published());
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            core: Mutex::new(core),
            restart_lock: Mutex::new(()),
            status_tx,
            activity: shared_activity(),
            signals_tx,
            resolver,
            launcher,
            process_table,
            shutdown: CancellationToken::new(),
        });

        let control_task = tokio::spawn(control::run(
            Arc::clone(&inner),
            signals_rx,
            check_interval,
        ));

        Ok(Self {
            inner,
            control_task: std::sync::Mutex::new(Some(control_task)),
        })
    }

    /// Supervisor wired to ALSA, ffmpeg and the live process table.
    pub fn with_system_ports(config: StreamConfig) -> Result<Self, SupervisorError> {
        let launcher = Arc::new(FfmpegLauncher::new(&config));
        Self::new(
            config,
            Arc::new(AlsaLoopbackResolver::new()),
            launcher,
            Arc::new(SysinfoProcessTable::new()),
        )
    }

    /// Start streaming (`Stopped`/`Failed` → `Running`).
    ///
    /// Resolves the loopback device on first use. Starting a running stream
    /// is a no-op.
    pub async fn start(&self) -> Result<(), SupervisorError> {
        self.inner.start().await
    }

    /// Stop streaming from any state. Idempotent; cancels an in-flight restart.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        self.inner.stop().await;
        Ok(())
    }

    /// Manual restart. Bypasses the attempt budget and keeps the counter.
    pub async fn restart(&self) -> Result<(), SupervisorError> {
        self.inner.manual_restart().await
    }

    /// Zero the automatic restart counter.
    pub async fn reset_restart_count(&self) {
        let mut core = self.inner.core.lock().await;
        core.restart.reset();
        info!("restart count reset");
        self.inner.publish(&core);
    }

    /// Replace the configuration and restart the stream with it.
    ///
    /// The restart budget starts fresh under the new policy.
    pub async fn reconfigure(&self, config: StreamConfig) -> Result<(), SupervisorError> {
        config.validate()?;
        self.inner.stop().await;
        {
            let mut core = self.inner.core.lock().await;
            info!(url = %config.rtsp_url, "reconfiguring stream");
            core.restart = RestartState::new(config.restart_policy());
            core.config = config;
            self.inner.publish(&core);
        }
        self.inner.start().await
    }

    /// Non-blocking read-only status.
    pub fn snapshot(&self) -> SupervisorStatus {
        let published = self.inner.status_tx.borrow().clone();
        let activity = read_activity(&self.inner.activity);

        SupervisorStatus {
            state: published.state,
            streaming: published.state.expects_process() && published.process_alive,
            rtsp_url: (!published.rtsp_url.is_empty()).then_some(published.rtsp_url),
            device: published.device,
            last_line: activity.last_line().to_string(),
            pid: published.pid,
            last_activity_seconds: activity.seconds_since_activity(clock::now()),
            restart_count: published.restart_count,
            max_restarts: published.max_restarts,
            last_error: published.last_error,
        }
    }

    /// The readings map for the reporting layer.
    pub fn readings(&self) -> Readings {
        self.snapshot().readings()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.inner.status_tx.subscribe()
    }

    /// Cancel the control task, monitor and watchdog, and terminate the
    /// subprocess. Further `start`/`restart` calls fail with `ShutDown`.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let handle = self
            .control_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!(error = %e, "control task ended abnormally");
            }
        }

        self.inner.stop().await;
        info!("supervisor shut down");
    }
}

impl Drop for StreamSupervisor {
    fn drop(&mut self) {
        // Lets the control task exit; the child is killed when the last
        // reference to it drops.
        self.inner.shutdown.cancel();
    }
}

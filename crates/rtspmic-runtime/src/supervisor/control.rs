//! Control task and state transitions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::MutexGuard;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rtspmic_core::{RestartDecision, StreamSignal, SupervisorState};

use super::{Core, Inner, SupervisorError};
use crate::clock;
use crate::monitor::{OutputMonitor, StalenessWatchdog, write_activity};

/// Extra pause after a device-busy failure so ALSA can release the device.
pub(super) const DEVICE_BUSY_SETTLE: Duration = Duration::from_secs(3);

/// Bound on reaping after SIGKILL.
const KILL_WAIT: Duration = Duration::from_secs(2);

/// Background task reacting to monitor signals and the periodic check tick.
pub(super) async fn run(
    inner: Arc<Inner>,
    mut signals: UnboundedReceiver<StreamSignal>,
    check_interval: Duration,
) {
    let mut ticker = interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(interval_ms = check_interval.as_millis() as u64, "control task started");

    loop {
        tokio::select! {
            biased;
            () = inner.shutdown.cancelled() => break,
            Some(signal) = signals.recv() => inner.handle_signal(signal).await,
            _ = ticker.tick() => inner.on_tick().await,
        }
    }

    debug!("control task exiting");
}

impl Inner {
    pub(super) fn publish(&self, core: &Core) {
        self.status_tx.send_replace(core.published());
    }

    /// Evaluate a failure signal against the restart policy.
    async fn handle_signal(&self, signal: StreamSignal) {
        let _serial = self.restart_lock.lock().await;
        let mut core = self.core.lock().await;

        if signal.generation != core.generation || core.state != SupervisorState::Running {
            debug!(
                generation = signal.generation,
                current = core.generation,
                state = %core.state,
                kind = %signal.kind,
                "ignoring signal for inactive process"
            );
            return;
        }

        let now = clock::now();
        match core.restart.decide(now) {
            RestartDecision::GiveUp => {
                let max = core.restart.policy().max_attempts;
                core.restart.record_give_up();
                warn!(max_restarts = max, kind = %signal.kind, "max restarts exceeded, giving up");
                self.teardown(&mut core).await;
                self.fail(
                    &mut core,
                    format!(
                        "MaxRestartsExceeded: {max} consecutive failures, last failure {}: {}",
                        signal.kind, signal.detail
                    ),
                );
            }
            RestartDecision::Defer { remaining } => {
                let replace = core.pending.as_ref().is_none_or(|pending| {
                    signal.kind.is_device_busy() && !pending.kind.is_device_busy()
                });
                if replace {
                    debug!(
                        remaining_ms = remaining.as_millis() as u64,
                        kind = %signal.kind,
                        "restart deferred by cooldown"
                    );
                    core.pending = Some(signal);
                }
            }
            RestartDecision::Restart => {
                core.pending = None;
                core.restart.record_attempt(now);
                info!(
                    attempt = core.restart.attempts(),
                    max_restarts = core.restart.policy().max_attempts,
                    generation = signal.generation,
                    kind = %signal.kind,
                    "restarting stream"
                );
                core.last_error = Some(format!("{}: {}", signal.kind, signal.detail));
                self.restart_sequence(core, signal.kind.is_device_busy()).await;
            }
        }
    }

    /// Periodic check: liveness, healthy-run reset, deferred signals.
    async fn on_tick(&self) {
        let pending = {
            let mut core = self.core.lock().await;
            let alive = core.process.as_mut().is_some_and(|p| p.is_alive());
            let mut changed = alive != core.process_alive;
            core.process_alive = alive;

            let now = clock::now();
            if core.state == SupervisorState::Running && core.restart.healthy_run_elapsed(now) {
                info!(attempts = core.restart.attempts(), "stream healthy, restart count reset");
                core.restart.reset();
                changed = true;
            }

            if changed {
                self.publish(&core);
            }
            core.pending.clone()
        };

        if let Some(signal) = pending {
            self.handle_signal(signal).await;
        }
    }

    /// `Restarting`: stop the old process, wait the restart delay, relaunch.
    ///
    /// Caller holds `restart_lock`. The transition lock is released while
    /// waiting so `stop` can cancel the sequence.
    async fn restart_sequence(&self, mut core: MutexGuard<'_, Core>, device_busy: bool) {
        core.state = SupervisorState::Restarting;
        self.publish(&core);
        self.teardown(&mut core).await;

        let mut delay = core.config.restart_delay();
        if device_busy {
            let hw_path = core.hw_path();
            let cleaned = self.cleanup_alsa_for(hw_path, None).await;
            info!(terminated = cleaned, "device busy, cleaned up stray ALSA writers");
            delay += DEVICE_BUSY_SETTLE;
        }

        let cancel = CancellationToken::new();
        core.restart_cancel = Some(cancel.clone());
        drop(core);

        tokio::select! {
            () = sleep(delay) => {}
            () = cancel.cancelled() => {
                debug!("restart cancelled");
                return;
            }
            () = self.shutdown.cancelled() => return,
        }

        let mut core = self.core.lock().await;
        if core.state != SupervisorState::Restarting || cancel.is_cancelled() {
            debug!(state = %core.state, "restart superseded");
            return;
        }
        core.restart_cancel = None;

        if let Err(e) = self.launch_locked(&mut core).await {
            warn!(error = %e, "relaunch failed");
        }
    }

    /// Resolve the device if needed and launch. Sets `Running` or `Failed`.
    pub(super) async fn launch_locked(&self, core: &mut Core) -> Result<(), SupervisorError> {
        let device = if let Some(ref device) = core.device {
            device.clone()
        } else {
            match self.resolver.resolve_loopback_device().await {
                Ok(device) => {
                    core.device = Some(device.clone());
                    device
                }
                Err(e) => {
                    self.fail(core, e.to_string());
                    return Err(e.into());
                }
            }
        };

        let mut process = match self.launcher.launch(&core.config.rtsp_url, &device).await {
            Ok(process) => process,
            Err(e) => {
                write_activity(&self.activity).set_last_line(e.to_string());
                self.fail(core, e.to_string());
                return Err(e.into());
            }
        };

        core.generation += 1;
        let generation = core.generation;
        write_activity(&self.activity).reset(clock::now());

        let cancel = self.shutdown.child_token();
        if let Some(output) = process.take_output() {
            OutputMonitor::new(
                generation,
                Arc::clone(&self.activity),
                self.signals_tx.clone(),
                cancel.clone(),
            )
            .spawn(output);
        }
        StalenessWatchdog::new(
            generation,
            Arc::clone(&self.activity),
            core.config.stale_after(),
            core.config.check_interval(),
            cancel.clone(),
        )
        .spawn(self.signals_tx.clone());

        info!(pid = ?process.pid(), generation, device = %device.hw_path(), "stream running");
        core.monitor_cancel = Some(cancel);
        core.process = Some(process);
        core.process_alive = true;
        core.pending = None;
        core.last_error = None;
        core.state = SupervisorState::Running;
        self.publish(core);
        Ok(())
    }

    /// Cancel the monitor and stop the tracked process (bounded).
    pub(super) async fn teardown(&self, core: &mut Core) {
        if let Some(cancel) = core.monitor_cancel.take() {
            cancel.cancel();
        }

        let Some(mut process) = core.process.take() else {
            return;
        };
        core.process_alive = false;

        let grace = core.config.stop_timeout();
        let pid = process.pid();
        match timeout(grace + KILL_WAIT, process.stop(grace)).await {
            Ok(Ok(())) => info!(pid = ?pid, "ffmpeg stopped"),
            Ok(Err(e)) => warn!(pid = ?pid, error = %e, "failed to stop ffmpeg cleanly"),
            Err(_) => warn!(pid = ?pid, "timed out waiting for ffmpeg to exit"),
        }
    }

    pub(super) fn fail(&self, core: &mut Core, reason: String) {
        warn!(reason = %reason, "stream failed");
        core.state = SupervisorState::Failed;
        core.pending = None;
        core.last_error = Some(reason);
        self.publish(core);
    }

    pub(super) async fn start(&self) -> Result<(), SupervisorError> {
        if self.shutdown.is_cancelled() {
            return Err(SupervisorError::ShutDown);
        }

        let _serial = self.restart_lock.lock().await;
        let mut core = self.core.lock().await;

        if matches!(
            core.state,
            SupervisorState::Running | SupervisorState::Restarting
        ) {
            debug!(state = %core.state, "start requested while active");
            return Ok(());
        }

        if core.config.reap_orphans_on_start && !core.orphans_swept {
            core.orphans_swept = true;
            let rtsp_url = core.config.rtsp_url.clone();
            let own = core.tracked_pid();
            let terminated = self.cleanup_old_for(&rtsp_url, own).await;
            if terminated > 0 {
                info!(terminated, "terminated ffmpeg processes left by a previous run");
            }
        }

        core.restart.record_launch(clock::now());
        self.launch_locked(&mut core).await
    }

    pub(super) async fn stop(&self) {
        let mut core = self.core.lock().await;

        if let Some(cancel) = core.restart_cancel.take() {
            cancel.cancel();
        }
        self.teardown(&mut core).await;

        if core.state != SupervisorState::Stopped {
            info!(from = %core.state, "stream stopped");
        }
        core.state = SupervisorState::Stopped;
        core.pending = None;
        core.last_error = None;
        self.publish(&core);
    }

    pub(super) async fn manual_restart(&self) -> Result<(), SupervisorError> {
        if self.shutdown.is_cancelled() {
            return Err(SupervisorError::ShutDown);
        }

        let _serial = self.restart_lock.lock().await;
        let mut core = self.core.lock().await;

        info!(from = %core.state, attempts = core.restart.attempts(), "manual restart");
        core.state = SupervisorState::Restarting;
        core.pending = None;
        self.publish(&core);
        self.teardown(&mut core).await;

        core.restart.record_launch(clock::now());
        self.launch_locked(&mut core).await
    }
}

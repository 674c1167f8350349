//! Command dispatch and stray-process maintenance.

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use rtspmic_core::{StreamCommand, SupervisorState};

use super::{Inner, StreamSupervisor, SupervisorError};

/// Pause after killing ALSA writers so the device is released.
const ALSA_RELEASE_DELAY: Duration = Duration::from_secs(1);

impl StreamSupervisor {
    /// Run one command and build its response object.
    pub async fn execute(&self, command: StreamCommand) -> Result<Value, SupervisorError> {
        debug!(%command, "executing command");
        let response = match command {
            StreamCommand::StartStream => {
                self.start().await?;
                json!({"status": "started"})
            }
            StreamCommand::StopStream => {
                self.stop().await?;
                json!({"status": "stopped"})
            }
            StreamCommand::RestartStream => {
                self.restart().await?;
                json!({"status": "restarted"})
            }
            StreamCommand::ResetRestartCount => {
                self.reset_restart_count().await;
                json!({"status": "restart_count_reset"})
            }
            StreamCommand::CleanupAlsa => {
                let terminated = self.inner.cleanup_alsa().await;
                json!({"status": "alsa_cleanup_completed", "terminated": terminated})
            }
            StreamCommand::SyncProcess => {
                let streaming = self.inner.sync_process().await;
                json!({"status": "process_synced", "streaming_status": streaming})
            }
            StreamCommand::ProcessStatus => self.inner.process_status().await,
            StreamCommand::CleanupOld => {
                let terminated = self.inner.cleanup_old().await;
                json!({"status": "old_processes_cleanup_completed", "terminated": terminated})
            }
        };
        Ok(response)
    }

    /// Handle a raw `{"command": "..."}` request.
    ///
    /// Never fails: unknown commands and failed operations come back as
    /// `{"error": "..."}` and leave the stream untouched.
    pub async fn handle_request(&self, request: &Value) -> Value {
        let command = match StreamCommand::from_request(request) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "rejected command");
                return json!({"error": e.to_string()});
            }
        };

        match self.execute(command).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%command, error = %e, "command failed");
                json!({"error": e.to_string()})
            }
        }
    }
}

impl Inner {
    /// Terminate stray ffmpeg processes writing to our loopback device.
    async fn cleanup_alsa(&self) -> usize {
        let core = self.core.lock().await;
        let hw_path = core.hw_path();
        let own = core.tracked_pid();
        let terminated = self.cleanup_alsa_for(hw_path, own).await;
        drop(core);

        if terminated > 0 {
            sleep(ALSA_RELEASE_DELAY).await;
        }
        terminated
    }

    /// Terminate ffmpeg writers of `hw_path` other than `own`.
    ///
    /// Takes owned values: `Core` is not `Sync`, so no `&Core` may be held
    /// across an await in the control task.
    pub(super) async fn cleanup_alsa_for(
        &self,
        hw_path: Option<String>,
        own: Option<u32>,
    ) -> usize {
        let Some(hw_path) = hw_path else {
            debug!("no loopback device resolved yet, nothing to clean up");
            return 0;
        };
        let pids = self.launcher_pids(&[hw_path.as_str()]);
        self.terminate_strays(own, pids).await
    }

    /// Terminate ffmpeg processes left by a previous instance.
    async fn cleanup_old(&self) -> usize {
        let core = self.core.lock().await;
        let rtsp_url = core.config.rtsp_url.clone();
        let own = core.tracked_pid();
        self.cleanup_old_for(&rtsp_url, own).await
    }

    pub(super) async fn cleanup_old_for(&self, rtsp_url: &str, own: Option<u32>) -> usize {
        let mut pids: BTreeSet<u32> = self
            .launcher_pids(&["-f alsa", "hw:"])
            .into_iter()
            .collect();
        pids.extend(self.launcher_pids(&[rtsp_url]));
        self.terminate_strays(own, pids.into_iter().collect()).await
    }

    /// Reconcile the tracked process with the OS. Returns the streaming status.
    async fn sync_process(&self) -> bool {
        let mut core = self.core.lock().await;
        let alive = core.process.as_mut().is_some_and(|p| p.is_alive());
        if alive != core.process_alive {
            info!(alive, "tracked process state re-synchronized");
            core.process_alive = alive;
            self.publish(&core);
        }
        core.state == SupervisorState::Running && alive
    }

    async fn process_status(&self) -> Value {
        let mut core = self.core.lock().await;
        let tracked_pid = core.tracked_pid();
        let alive = core.process.as_mut().is_some_and(|p| p.is_alive());
        let running_pid = self
            .launcher_pids(&[core.config.rtsp_url.as_str()])
            .into_iter()
            .next();

        json!({
            "status": "process_status",
            "tracked_pid": tracked_pid,
            "running_pid": running_pid,
            "streaming_status": core.state == SupervisorState::Running && alive,
            "process_alive": alive,
        })
    }

    fn launcher_pids(&self, needles: &[&str]) -> Vec<u32> {
        self.process_table.find(self.launcher.program(), needles)
    }

    /// Terminate `pids`, never touching the tracked child.
    async fn terminate_strays(&self, own: Option<u32>, pids: Vec<u32>) -> usize {
        let mut terminated = 0;

        for pid in pids.into_iter().filter(|pid| Some(*pid) != own) {
            match self.process_table.terminate(pid).await {
                Ok(()) => {
                    info!(pid, "terminated stray ffmpeg process");
                    terminated += 1;
                }
                Err(e) => warn!(pid, error = %e, "failed to terminate stray ffmpeg process"),
            }
        }
        terminated
    }
}

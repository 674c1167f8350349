//! [`StreamLauncher`] that spawns ffmpeg.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::io;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use rtspmic_core::{
    LaunchError, LoopbackDevice, ProcessControl, StreamConfig, StreamLauncher, StreamProcess,
};

use super::invocation::FfmpegInvocation;
use crate::process::{output_lines, shutdown_child};

/// How long to wait for the stderr tail of a process that died during launch.
const TAIL_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Spawns ffmpeg with the reconnect-friendly invocation.
///
/// Executable, transport and reconnect options are bound at construction.
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    config: StreamConfig,
}

impl FfmpegLauncher {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl StreamLauncher for FfmpegLauncher {
    fn program(&self) -> &str {
        &self.config.ffmpeg_path
    }

    async fn launch(
        &self,
        rtsp_url: &str,
        device: &LoopbackDevice,
    ) -> Result<StreamProcess, LaunchError> {
        let invocation = FfmpegInvocation::for_stream(&self.config, rtsp_url, device);
        let program = invocation.program().to_string();
        debug!(program = %program, args = ?invocation.args(), "spawning ffmpeg");

        let mut child = invocation.build().spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                LaunchError::ExecutableNotFound(program.clone())
            } else {
                LaunchError::SpawnFailed {
                    program: program.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let Some(stderr) = child.stderr.take() else {
            let _ = shutdown_child(&mut child, self.config.stop_timeout()).await;
            return Err(LaunchError::NoOutputStream { program });
        };

        // A failure status inside the grace window is a launch error, not a
        // stream error: the process never got going.
        let early_exit = tokio::select! {
            status = child.wait() => Some(status),
            () = sleep(self.config.launch_grace()) => None,
        };

        match early_exit {
            Some(Ok(status)) if !status.success() => {
                let last_line = timeout(TAIL_READ_TIMEOUT, output_lines(stderr).collect::<Vec<_>>())
                    .await
                    .ok()
                    .and_then(|lines| lines.into_iter().last())
                    .unwrap_or_default();
                warn!(
                    program = %program,
                    %status,
                    last_line = %last_line,
                    "ffmpeg exited during launch"
                );
                Err(LaunchError::ExitedImmediately {
                    program,
                    status: status.to_string(),
                    last_line,
                })
            }
            Some(Err(e)) => Err(LaunchError::SpawnFailed {
                program,
                reason: e.to_string(),
            }),
            // Clean exit inside the window: hand it over; the monitor reports
            // the end of stream as an unexpected exit.
            Some(Ok(_)) | None => {
                let control = ChildControl { child };
                let process = StreamProcess::new(Box::new(control), Box::new(stderr));
                info!(
                    pid = ?process.pid(),
                    url = %rtsp_url,
                    device = %device.hw_path(),
                    "ffmpeg started"
                );
                Ok(process)
            }
        }
    }
}

/// [`ProcessControl`] over an owned `tokio::process::Child`.
struct ChildControl {
    child: Child,
}

#[async_trait]
impl ProcessControl for ChildControl {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    async fn terminate(&mut self, grace: Duration) -> io::Result<()> {
        let status = shutdown_child(&mut self.child, grace).await?;
        debug!(%status, "ffmpeg reaped");
        Ok(())
    }
}

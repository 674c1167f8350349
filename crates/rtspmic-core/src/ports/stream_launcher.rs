//! Streaming subprocess port.
//!
//! A launched stream is split into two halves: a control handle the
//! supervisor keeps (pid, liveness, termination) and an output stream the
//! output monitor consumes. Keeping them separate lets the monitor own the
//! reader while the supervisor keeps exclusive ownership of the process.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::AsyncRead;

use super::LaunchError;
use crate::domain::LoopbackDevice;

/// Diagnostic output of the subprocess (ffmpeg writes to stderr).
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Control half of a launched subprocess.
#[async_trait]
pub trait ProcessControl: Send {
    /// OS process id, if the process has one.
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness check. Reaps the process if it has exited.
    fn has_exited(&mut self) -> bool;

    /// Terminate gracefully, escalating after `grace`, and reap.
    ///
    /// Must succeed on a process that already exited.
    async fn terminate(&mut self, grace: Duration) -> io::Result<()>;
}

/// A live streaming subprocess owned by the supervisor.
pub struct StreamProcess {
    control: Box<dyn ProcessControl>,
    output: Option<OutputStream>,
    pid: Option<u32>,
}

impl StreamProcess {
    /// Wrap a control handle and its output stream.
    pub fn new(control: Box<dyn ProcessControl>, output: OutputStream) -> Self {
        let pid = control.pid();
        Self {
            control,
            output: Some(output),
            pid,
        }
    }

    /// PID captured at launch.
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Hand the output stream to the monitor. Returns `None` the second time.
    pub fn take_output(&mut self) -> Option<OutputStream> {
        self.output.take()
    }

    /// Whether the process is still running.
    pub fn is_alive(&mut self) -> bool {
        !self.control.has_exited()
    }

    /// Terminate and reap the process. Idempotent.
    pub async fn stop(&mut self, grace: Duration) -> io::Result<()> {
        self.control.terminate(grace).await
    }
}

impl fmt::Debug for StreamProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamProcess")
            .field("pid", &self.pid)
            .field("output_taken", &self.output.is_none())
            .finish()
    }
}

/// Starts the streaming subprocess.
#[async_trait]
pub trait StreamLauncher: Send + Sync {
    /// Executable name, used to recognise stray instances in the process table.
    fn program(&self) -> &str;

    /// Launch a subprocess streaming `rtsp_url` into `device`.
    async fn launch(
        &self,
        rtsp_url: &str,
        device: &LoopbackDevice,
    ) -> Result<StreamProcess, LaunchError>;
}

//! Terminate processes by PID when no `Child` handle is available.

use std::io;

#[cfg(unix)]
use std::time::Duration;
#[cfg(unix)]
use tokio::time::sleep;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

#[cfg(unix)]
const POLL_INTERVAL: Duration = Duration::from_millis(100);
#[cfg(unix)]
const POLLS_PER_PHASE: u32 = 20;

/// Kill a stray process by PID with SIGTERM → SIGKILL escalation.
///
/// # Strategy
/// 1. Send SIGTERM
/// 2. Poll for up to 2 seconds to verify exit
/// 3. If still alive, send SIGKILL and poll again
///
/// There is no `Child` handle, so the process is **not reaped** here. Used
/// for ffmpeg instances left over from a previous run or another owner.
///
/// # Returns
/// - `Ok(())` if the process was killed or was already gone
/// - `Err` if signalling fails (other than ESRCH)
pub async fn kill_pid(pid: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        kill_pid_unix(pid).await
    }

    #[cfg(not(unix))]
    {
        kill_pid_windows(pid).await
    }
}

#[cfg(unix)]
async fn kill_pid_unix(pid: u32) -> io::Result<()> {
    let raw = i32::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let nix_pid = Pid::from_raw(raw);

    for sig in [Signal::SIGTERM, Signal::SIGKILL] {
        match signal::kill(nix_pid, sig) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return Ok(()),
            Err(e) => return Err(io::Error::other(e)),
        }

        if wait_for_exit(nix_pid).await {
            return Ok(());
        }
        tracing::debug!(pid, signal = ?sig, "process still alive after signal");
    }

    Err(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("process {pid} did not exit after SIGKILL"),
    ))
}

/// Poll with the null signal until the PID disappears.
///
/// An unreaped child of ours stays visible as a zombie; callers that own the
/// process must reap it themselves.
#[cfg(unix)]
async fn wait_for_exit(pid: Pid) -> bool {
    for _ in 0..POLLS_PER_PHASE {
        sleep(POLL_INTERVAL).await;
        if let Err(Errno::ESRCH) = signal::kill(pid, None) {
            return true;
        }
    }
    false
}

/// Whether a process with this PID exists.
#[cfg(unix)]
pub fn pid_exists(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    !matches!(signal::kill(Pid::from_raw(raw), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
pub fn pid_exists(_pid: u32) -> bool {
    false
}

#[cfg(not(unix))]
async fn kill_pid_windows(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "stray process cleanup not implemented on Windows",
    ))
}

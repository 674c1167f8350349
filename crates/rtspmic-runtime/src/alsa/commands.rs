//! Bounded execution of the ALSA helper tools (`modprobe`, `arecord`).

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Default bound on every helper invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// A helper tool did not produce usable output.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("{program} not found")]
    NotFound { program: String },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("failed to run {program}: {reason}")]
    Io { program: String, reason: String },
}

/// Run `program args...` to completion within `limit`, returning stdout.
///
/// The child is killed if the limit elapses.
pub async fn run_tool(program: &str, args: &[&str], limit: Duration) -> Result<String, ToolError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match timeout(limit, cmd.output()).await {
        Err(_) => {
            return Err(ToolError::TimedOut {
                program: program.to_string(),
                timeout: limit,
            });
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::NotFound {
                program: program.to_string(),
            });
        }
        Ok(Err(e)) => {
            return Err(ToolError::Io {
                program: program.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

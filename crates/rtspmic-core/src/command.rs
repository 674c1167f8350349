//! Command boundary for the external command dispatcher.
//!
//! Requests arrive as `{"command": "<name>"}`. Unknown names are rejected here
//! and never reach the supervisor, so they cannot affect the running stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Commands the supervisor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamCommand {
    /// Start streaming (Stopped/Failed → Running).
    StartStream,
    /// Stop streaming from any state.
    StopStream,
    /// Manual restart; bypasses the attempt budget.
    RestartStream,
    /// Zero the automatic restart counter.
    ResetRestartCount,
    /// Terminate stray ffmpeg processes holding the loopback device.
    CleanupAlsa,
    /// Reconcile the tracked child with the OS.
    SyncProcess,
    /// Report tracked and OS-visible ffmpeg processes.
    ProcessStatus,
    /// Terminate ffmpeg processes left behind by a previous instance.
    CleanupOld,
}

impl StreamCommand {
    /// Every supported command, in documentation order.
    pub const ALL: [Self; 8] = [
        Self::StartStream,
        Self::StopStream,
        Self::RestartStream,
        Self::ResetRestartCount,
        Self::CleanupAlsa,
        Self::SyncProcess,
        Self::ProcessStatus,
        Self::CleanupOld,
    ];

    /// Wire name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StartStream => "start_stream",
            Self::StopStream => "stop_stream",
            Self::RestartStream => "restart_stream",
            Self::ResetRestartCount => "reset_restart_count",
            Self::CleanupAlsa => "cleanup_alsa",
            Self::SyncProcess => "sync_process",
            Self::ProcessStatus => "process_status",
            Self::CleanupOld => "cleanup_old",
        }
    }

    /// Parse a `{"command": "..."}` request object.
    pub fn from_request(request: &Value) -> Result<Self, CommandError> {
        match request.get("command") {
            Some(Value::String(name)) => name.parse(),
            Some(other) => Err(CommandError::Unsupported(other.to_string())),
            None => Err(CommandError::MissingCommand),
        }
    }
}

impl fmt::Display for StreamCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == s)
            .ok_or_else(|| CommandError::Unsupported(s.to_string()))
    }
}

/// Rejections at the command boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// `UnsupportedCommandError`.
    #[error("Unknown command: {0}")]
    Unsupported(String),

    #[error("Request has no \"command\" field")]
    MissingCommand,
}

//! Supervisor state-machine phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of the stream supervisor.
///
/// `Failed` is terminal until a manual `start_stream`/`restart_stream` or a
/// `reset_restart_count` followed by a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    /// No subprocess; nothing is being supervised.
    #[default]
    Stopped,
    /// The subprocess is live and its output is being monitored.
    Running,
    /// A restart sequence is in flight.
    Restarting,
    /// Launch failed or the restart budget is exhausted.
    Failed,
}

impl SupervisorState {
    /// Whether the supervisor currently wants a live subprocess.
    pub const fn expects_process(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
            Self::Restarting => write!(f, "restarting"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&SupervisorState::Restarting).unwrap();
        assert_eq!(json, "\"restarting\"");
        assert_eq!(SupervisorState::default(), SupervisorState::Stopped);
    }

    #[test]
    fn test_only_running_expects_process() {
        assert!(SupervisorState::Running.expects_process());
        assert!(!SupervisorState::Restarting.expects_process());
        assert!(!SupervisorState::Failed.expects_process());
        assert!(!SupervisorState::Stopped.expects_process());
    }
}

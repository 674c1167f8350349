//! Status snapshot and the readings map produced for the reporting layer.

use serde::{Deserialize, Serialize};

use crate::domain::{LoopbackDevice, SupervisorState};

/// Placeholder for values that have not been configured or resolved.
pub const NOT_CONFIGURED: &str = "Not configured";

/// Placeholder for `ffmpeg_output` before the first line arrives.
pub const NO_OUTPUT_YET: &str = "No output yet";

/// Read-only view of the supervisor, recomputed on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorStatus {
    /// State-machine phase.
    pub state: SupervisorState,
    /// Phase is `Running` and the subprocess has not exited.
    pub streaming: bool,
    /// Configured source URL.
    pub rtsp_url: Option<String>,
    /// Resolved loopback device, once resolution succeeded.
    pub device: Option<LoopbackDevice>,
    /// Last output line of the subprocess (or a supervisor diagnostic).
    pub last_line: String,
    /// PID of the tracked subprocess.
    pub pid: Option<u32>,
    /// Seconds since the last observed output.
    pub last_activity_seconds: f64,
    /// Automatic restarts since the last reset.
    pub restart_count: u32,
    /// Configured restart budget.
    pub max_restarts: u32,
    /// Why the stream is down, when it is.
    pub last_error: Option<String>,
}

impl SupervisorStatus {
    /// Flatten into the readings map.
    pub fn readings(&self) -> Readings {
        Readings {
            streaming_status: self.streaming,
            rtsp_url: self
                .rtsp_url
                .clone()
                .unwrap_or_else(|| NOT_CONFIGURED.to_string()),
            loopback_device: self
                .device
                .as_ref()
                .map_or_else(|| NOT_CONFIGURED.to_string(), LoopbackDevice::short_id),
            loopback_device_full: self
                .device
                .as_ref()
                .map_or_else(|| NOT_CONFIGURED.to_string(), LoopbackDevice::hw_path),
            ffmpeg_output: if self.last_line.is_empty() {
                NO_OUTPUT_YET.to_string()
            } else {
                self.last_line.clone()
            },
            ffmpeg_process_id: self.pid,
            last_activity_seconds: round_tenths(self.last_activity_seconds),
            restart_count: self.restart_count,
            state: self.state,
            max_restarts: self.max_restarts,
            last_error: self.last_error.clone(),
        }
    }
}

/// The status mapping handed to the external reporting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    pub streaming_status: bool,
    pub rtsp_url: String,
    pub loopback_device: String,
    pub loopback_device_full: String,
    pub ffmpeg_output: String,
    pub ffmpeg_process_id: Option<u32>,
    pub last_activity_seconds: f64,
    pub restart_count: u32,
    pub state: SupervisorState,
    pub max_restarts: u32,
    pub last_error: Option<String>,
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> SupervisorStatus {
        SupervisorStatus {
            state: SupervisorState::Running,
            streaming: true,
            rtsp_url: Some("rtsp://cam/stream".to_string()),
            device: Some(LoopbackDevice::new(4, 0, "Loopback")),
            last_line: "size=  64kB time=00:00:04.00".to_string(),
            pid: Some(4242),
            last_activity_seconds: 1.26,
            restart_count: 1,
            max_restarts: 3,
            last_error: None,
        }
    }

    #[test]
    fn test_readings_keys_and_values() {
        let json = serde_json::to_value(status().readings()).unwrap();
        assert_eq!(json["streaming_status"], true);
        assert_eq!(json["rtsp_url"], "rtsp://cam/stream");
        assert_eq!(json["loopback_device"], "4");
        assert_eq!(json["loopback_device_full"], "hw:4,0,0");
        assert_eq!(json["ffmpeg_output"], "size=  64kB time=00:00:04.00");
        assert_eq!(json["ffmpeg_process_id"], 4242);
        assert_eq!(json["last_activity_seconds"], 1.3);
        assert_eq!(json["restart_count"], 1);
        assert_eq!(json["state"], "running");
    }

    #[test]
    fn test_placeholders_when_unconfigured() {
        let status = SupervisorStatus {
            state: SupervisorState::Stopped,
            streaming: false,
            rtsp_url: None,
            device: None,
            last_line: String::new(),
            pid: None,
            last_activity_seconds: 0.0,
            restart_count: 0,
            max_restarts: 3,
            last_error: None,
        };
        let json = serde_json::to_value(status.readings()).unwrap();
        assert_eq!(json["rtsp_url"], NOT_CONFIGURED);
        assert_eq!(json["loopback_device"], NOT_CONFIGURED);
        assert_eq!(json["loopback_device_full"], NOT_CONFIGURED);
        assert_eq!(json["ffmpeg_output"], NO_OUTPUT_YET);
        assert!(json["ffmpeg_process_id"].is_null());
    }
}

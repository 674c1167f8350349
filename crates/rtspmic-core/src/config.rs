//! Stream configuration and validation.
//!
//! `rtsp_url` is the only required attribute. Everything else is a tuning
//! knob with a default that matches the behaviour operators expect from the
//! plain ffmpeg-into-loopback setup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::domain::RestartPolicy;

/// Default staleness threshold. ffmpeg prints a progress line roughly every
/// half second while audio flows, so 30 seconds of silence means a hang.
pub const DEFAULT_STALE_AFTER_SECS: f64 = 30.0;

/// Default interval of the supervisor check cycle.
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 1000;

/// RTSP lower transports ffmpeg accepts for `-rtsp_transport`.
const RTSP_TRANSPORTS: &[&str] = &["udp", "tcp", "udp_multicast", "http", "https"];

/// Configuration for one supervised stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// RTSP source URL (required, non-empty).
    pub rtsp_url: String,
    /// Consecutive failures tolerated; the one reaching this count ends in `Failed`.
    pub max_restarts: u32,
    /// Minimum seconds between restart attempts.
    pub restart_cooldown_secs: f64,
    /// Seconds without output before the stream counts as stale.
    pub stale_after_secs: f64,
    /// Interval of the check cycle that re-evaluates deferred signals.
    pub check_interval_ms: u64,
    /// Pause between stopping the old process and launching the new one.
    pub restart_delay_ms: u64,
    /// Grace period after SIGTERM before escalating to SIGKILL.
    pub stop_timeout_secs: f64,
    /// Window after spawn in which a non-zero exit counts as a launch failure.
    pub launch_grace_ms: u64,
    /// Clear the restart counter after this long without a restart.
    pub healthy_reset_after_secs: Option<f64>,
    /// ffmpeg executable (name on `PATH` or absolute path).
    pub ffmpeg_path: String,
    /// Optional `-rtsp_transport` value.
    pub rtsp_transport: Option<String>,
    /// Pass ffmpeg's own reconnect options.
    pub reconnect: bool,
    /// `-reconnect_delay_max` in seconds.
    pub reconnect_delay_max_secs: u32,
    /// Terminate ffmpeg processes left by a previous instance before starting.
    pub reap_orphans_on_start: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            rtsp_url: String::new(),
            max_restarts: 3,
            restart_cooldown_secs: 10.0,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            restart_delay_ms: 2000,
            stop_timeout_secs: 5.0,
            launch_grace_ms: 500,
            healthy_reset_after_secs: None,
            ffmpeg_path: "ffmpeg".to_string(),
            rtsp_transport: None,
            reconnect: true,
            reconnect_delay_max_secs: 10,
            reap_orphans_on_start: true,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("rtsp_url is required in attributes")]
    MissingRtspUrl,

    #[error("rtsp_url must be a non-empty string, got {0}")]
    InvalidRtspUrl(String),

    #[error("attributes must be an object, got {0}")]
    NotAnObject(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl StreamConfig {
    /// Configuration for `rtsp_url` with every tunable at its default.
    pub fn new(rtsp_url: impl Into<String>) -> Self {
        Self {
            rtsp_url: rtsp_url.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from a loosely-typed attribute object, the shape
    /// a host component framework hands over.
    pub fn from_attributes(attributes: &Value) -> Result<Self, ConfigError> {
        let Some(object) = attributes.as_object() else {
            return Err(ConfigError::NotAnObject(json_type_name(attributes).to_string()));
        };

        match object.get("rtsp_url") {
            None => return Err(ConfigError::MissingRtspUrl),
            Some(Value::String(url)) if !url.trim().is_empty() => {}
            Some(Value::String(_)) => {
                return Err(ConfigError::InvalidRtspUrl("an empty string".to_string()));
            }
            Some(other) => {
                return Err(ConfigError::InvalidRtspUrl(json_type_name(other).to_string()));
            }
        }

        let config: Self = serde_json::from_value(attributes.clone())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field; the supervisor refuses to start on error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rtsp_url.trim().is_empty() {
            return Err(ConfigError::InvalidRtspUrl("an empty string".to_string()));
        }

        check_secs("restart_cooldown_secs", self.restart_cooldown_secs)?;
        check_secs("stop_timeout_secs", self.stop_timeout_secs)?;
        check_secs("stale_after_secs", self.stale_after_secs)?;
        if self.stale_after_secs == 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "stale_after_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(secs) = self.healthy_reset_after_secs {
            check_secs("healthy_reset_after_secs", secs)?;
        }

        if self.check_interval_ms < 10 {
            return Err(ConfigError::InvalidValue {
                field: "check_interval_ms",
                reason: format!("must be at least 10, got {}", self.check_interval_ms),
            });
        }

        if self.ffmpeg_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ffmpeg_path",
                reason: "cannot be empty".to_string(),
            });
        }

        if let Some(ref transport) = self.rtsp_transport {
            if !RTSP_TRANSPORTS.contains(&transport.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "rtsp_transport",
                    reason: format!("expected one of {RTSP_TRANSPORTS:?}, got {transport:?}"),
                });
            }
        }

        Ok(())
    }

    /// Restart policy derived from this configuration.
    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            max_attempts: self.max_restarts,
            cooldown: secs(self.restart_cooldown_secs),
            healthy_reset_after: self.healthy_reset_after_secs.map(secs),
        }
    }

    pub fn stale_after(&self) -> Duration {
        secs(self.stale_after_secs)
    }

    pub const fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub const fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        secs(self.stop_timeout_secs)
    }

    pub const fn launch_grace(&self) -> Duration {
        Duration::from_millis(self.launch_grace_ms)
    }
}

fn check_secs(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if Duration::try_from_secs_f64(value).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a finite, non-negative number of seconds, got {value}"),
        })
    }
}

// Only reached for values `check_secs` accepted
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

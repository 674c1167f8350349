//! Output activity record.

use std::time::Instant;

/// Last observed subprocess output and when it arrived.
///
/// Written by the output monitor, read by the staleness watchdog and the
/// status snapshot.
#[derive(Debug, Clone, Default)]
pub struct ActivityState {
    last_line: String,
    last_activity: Option<Instant>,
}

impl ActivityState {
    /// Empty record with no activity observed yet.
    pub const fn new() -> Self {
        Self {
            last_line: String::new(),
            last_activity: None,
        }
    }

    /// Record an output line observed at `at`.
    pub fn record_line(&mut self, line: &str, at: Instant) {
        line.clone_into(&mut self.last_line);
        self.last_activity = Some(at);
    }

    /// Mark activity without a line (a fresh launch counts as activity).
    pub const fn touch(&mut self, at: Instant) {
        self.last_activity = Some(at);
    }

    /// Replace the last line without touching the activity timestamp.
    ///
    /// Used for supervisor-generated diagnostics such as launch failures.
    pub fn set_last_line(&mut self, line: impl Into<String>) {
        self.last_line = line.into();
    }

    /// Forget the previous process's output and restart the activity clock.
    pub fn reset(&mut self, at: Instant) {
        self.last_line.clear();
        self.last_activity = Some(at);
    }

    /// Most recent output line (empty if none yet).
    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    /// When activity was last observed.
    pub const fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Seconds since the last activity, `0.0` if none has been observed.
    pub fn seconds_since_activity(&self, now: Instant) -> f64 {
        self.last_activity
            .map_or(0.0, |at| now.saturating_duration_since(at).as_secs_f64())
    }
}

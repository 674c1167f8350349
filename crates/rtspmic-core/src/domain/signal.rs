//! Failure signals raised by the output monitor and the staleness watchdog.

use crate::signatures::FailureKind;

/// A `StreamErrorDetected` signal.
///
/// `generation` identifies the subprocess the signal was observed on. The
/// supervisor bumps the generation on every launch and ignores signals that
/// belong to a process it has already replaced or stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSignal {
    /// Launch generation the signal belongs to.
    pub generation: u64,
    /// What was detected.
    pub kind: FailureKind,
    /// The output line (or a synthesized description) that triggered it.
    pub detail: String,
}

impl StreamSignal {
    /// Create a new signal.
    pub fn new(generation: u64, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            generation,
            kind,
            detail: detail.into(),
        }
    }
}

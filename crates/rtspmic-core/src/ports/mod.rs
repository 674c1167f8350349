//! Port definitions (trait abstractions) for the operating-system side.
//!
//! Ports define what the supervisor expects from infrastructure: a way to
//! resolve the loopback device, a way to launch the streaming subprocess, and
//! a view of the host process table for stray-process cleanup.
//!
//! # Design Rules
//!
//! - No `tokio::process` or ALSA details in any signature
//! - Implementations own all spawning and probing details
//! - Fakes must be trivial to write for tests

pub mod device_resolver;
pub mod process_table;
pub mod stream_launcher;

use thiserror::Error;

pub use device_resolver::DeviceResolver;
pub use process_table::{NoopProcessTable, ProcessTablePort};
pub use stream_launcher::{OutputStream, ProcessControl, StreamLauncher, StreamProcess};

/// Errors from loopback device resolution.
///
/// Both variants are fatal to `start`.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// `DeviceNotFoundError`: no capture device matches the loopback signature.
    #[error("No loopback capture device found{}", module_hint(.module_error.as_deref()))]
    NotFound {
        /// Why loading the kernel module failed, if it did.
        module_error: Option<String>,
    },

    /// Capture devices could not be enumerated at all.
    #[error("Failed to enumerate capture devices: {0}")]
    Enumeration(String),
}

fn module_hint(module_error: Option<&str>) -> String {
    module_error.map_or_else(String::new, |e| format!(" (loading snd-aloop failed: {e})"))
}

/// `LaunchError`: the streaming subprocess could not be started.
#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    /// The executable is not on `PATH` or does not exist.
    #[error("Streaming executable not found: {0}")]
    ExecutableNotFound(String),

    /// The OS refused to spawn the process.
    #[error("Failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The process started but its output pipe could not be opened.
    #[error("{program} started without an output stream")]
    NoOutputStream { program: String },

    /// The process exited with a failure status inside the launch grace window.
    #[error("{program} exited immediately ({status}): {last_line}")]
    ExitedImmediately {
        program: String,
        status: String,
        last_line: String,
    },
}

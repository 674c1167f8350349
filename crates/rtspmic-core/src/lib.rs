//! Core domain types and port definitions for rtsp-loopback-mic.
//!
//! This crate holds everything about the stream supervisor that does not touch
//! the operating system: the configuration model, the loopback device and
//! restart/activity state types, the error-signature table, the pure restart
//! policy, the command boundary and the status readings. Process spawning,
//! ALSA probing and the supervisor itself live in `rtspmic-runtime`.

pub mod command;
pub mod config;
pub mod domain;
pub mod ports;
pub mod signatures;
pub mod status;

// Re-export commonly used types for convenience
pub use command::{CommandError, StreamCommand};
pub use config::{ConfigError, StreamConfig};
pub use domain::{
    ActivityState, LoopbackDevice, RestartDecision, RestartPolicy, RestartState, StreamSignal,
    SupervisorState,
};
pub use ports::{
    DeviceError, DeviceResolver, LaunchError, OutputStream, ProcessControl, ProcessTablePort,
    StreamLauncher, StreamProcess,
};
pub use signatures::{ERROR_SIGNATURES, ErrorSignature, FailureKind, classify_line};
pub use status::{NOT_CONFIGURED, NO_OUTPUT_YET, Readings, SupervisorStatus};

//! Process runtime and OS-level concerns for rtsp-loopback-mic.
//!
//! Implements the ports defined in `rtspmic-core` against the real system
//! (ALSA tools, ffmpeg, the process table) and hosts the
//! [`StreamSupervisor`], which ties them together with the output monitor,
//! the staleness watchdog and the restart policy.
#![deny(unsafe_code)]

pub mod alsa;
mod clock;
pub mod ffmpeg;
pub mod monitor;
pub mod process;
pub mod supervisor;

pub use alsa::AlsaLoopbackResolver;
pub use ffmpeg::{FfmpegInvocation, FfmpegLauncher};
pub use monitor::{OutputMonitor, SharedActivity, StalenessWatchdog};
pub use process::SysinfoProcessTable;
pub use supervisor::{PublishedState, StreamSupervisor, SupervisorError};

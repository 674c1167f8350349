//! ALSA loopback discovery.

pub mod commands;
mod resolver;

pub use commands::{DEFAULT_TOOL_TIMEOUT, ToolError, run_tool};
pub use resolver::{AlsaLoopbackResolver, CaptureDevice, parse_capture_devices, select_loopback};

//! Process shutdown for the streaming subprocess.
//!
//! Two strategies:
//! - `shutdown_child`: for the process we spawned and hold a `Child` for (includes reaping)
//! - `kill_pid`: for stray processes found in the process table (no reaping, PID-only)

mod child;
mod pid;

pub use child::shutdown_child;
pub use pid::{kill_pid, pid_exists};

//! OS process plumbing: output line splitting, shutdown, process table scan.

pub mod scan;
pub mod shutdown;
pub mod stream;

pub use scan::{ProcessEntry, SysinfoProcessTable, matching_pids};
pub use shutdown::{kill_pid, pid_exists, shutdown_child};
pub use stream::output_lines;

//! Host process table port, used to find and clean up stray streaming
//! processes that the supervisor does not own.

use async_trait::async_trait;
use std::io;

/// Read access to the host process table plus PID-based termination.
#[async_trait]
pub trait ProcessTablePort: Send + Sync {
    /// PIDs of processes named `program` whose command line contains every
    /// needle.
    fn find(&self, program: &str, needles: &[&str]) -> Vec<u32>;

    /// Terminate a process we hold no handle for (SIGTERM, then SIGKILL).
    async fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// Process table that sees nothing. For tests and hosts without `/proc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessTable;

#[async_trait]
impl ProcessTablePort for NoopProcessTable {
    fn find(&self, _program: &str, _needles: &[&str]) -> Vec<u32> {
        Vec::new()
    }

    async fn terminate(&self, _pid: u32) -> io::Result<()> {
        Ok(())
    }
}

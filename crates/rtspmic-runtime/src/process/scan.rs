//! Process table scan backed by `sysinfo`.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use rtspmic_core::ProcessTablePort;

use super::shutdown::kill_pid;

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub cmdline: Vec<String>,
}

impl ProcessEntry {
    /// Whether this process runs `program` (compared by file name).
    fn runs(&self, program: &str) -> bool {
        let wanted = file_name(program);
        self.name == wanted
            || self
                .cmdline
                .first()
                .is_some_and(|argv0| file_name(argv0) == wanted)
    }

    fn mentions_all(&self, needles: &[&str]) -> bool {
        let joined = self.cmdline.join(" ");
        needles.iter().all(|needle| joined.contains(needle))
    }
}

fn file_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(program)
}

/// PIDs of entries running `program` whose command line contains every needle.
pub fn matching_pids(entries: &[ProcessEntry], program: &str, needles: &[&str]) -> Vec<u32> {
    let mut pids: Vec<u32> = entries
        .iter()
        .filter(|entry| entry.runs(program) && entry.mentions_all(needles))
        .map(|entry| entry.pid)
        .collect();
    pids.sort_unstable();
    pids
}

/// [`ProcessTablePort`] reading the live process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProcessTable;

impl SysinfoProcessTable {
    pub const fn new() -> Self {
        Self
    }

    /// Snapshot of every process with its command line.
    pub fn snapshot() -> Vec<ProcessEntry> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cmdline: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl ProcessTablePort for SysinfoProcessTable {
    fn find(&self, program: &str, needles: &[&str]) -> Vec<u32> {
        matching_pids(&Self::snapshot(), program, needles)
    }

    async fn terminate(&self, pid: u32) -> io::Result<()> {
        kill_pid(pid).await
    }
}

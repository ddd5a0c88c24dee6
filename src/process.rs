use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid, Signal, System};
use tracing::{debug, info, warn};

use crate::catalog::HostApplication;
use crate::core::RunningProcessMatch;

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub exe: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalResult {
    Sent,
    NotFound,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateMode {
    Graceful,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    Terminated,
    NotFound,
    Denied,
}

/// OS process capability consumed by the inspector. Production code uses the
/// sysinfo-backed [`SystemProcesses`]; tests substitute a synthetic table.
pub trait ProcessProvider {
    fn list(&mut self) -> Vec<ProcessRecord>;
    fn signal(&mut self, pid: u32, force: bool) -> SignalResult;
    fn alive(&mut self, pid: u32) -> bool;
}

pub struct SystemProcesses {
    system: System,
}

impl SystemProcesses {
    pub fn new() -> Self {
        SystemProcesses {
            system: System::new_all(),
        }
    }
}

impl Default for SystemProcesses {
    fn default() -> Self {
        SystemProcesses::new()
    }
}

impl ProcessProvider for SystemProcesses {
    fn list(&mut self) -> Vec<ProcessRecord> {
        self.system.refresh_processes();
        self.system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessRecord {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                exe: process.exe().map(|p| p.to_path_buf()),
            })
            .collect()
    }

    fn signal(&mut self, pid: u32, force: bool) -> SignalResult {
        self.system.refresh_processes();
        let Some(process) = self.system.process(Pid::from_u32(pid)) else {
            return SignalResult::NotFound;
        };

        let sent = if force {
            process.kill()
        } else {
            process.kill_with(Signal::Term).unwrap_or_else(|| process.kill())
        };

        if sent {
            SignalResult::Sent
        } else {
            SignalResult::Denied
        }
    }

    fn alive(&mut self, pid: u32) -> bool {
        self.system.refresh_process(Pid::from_u32(pid))
    }
}

/// Matches running processes against host patterns and terminates them on
/// request. Termination never escalates on its own; re-running with
/// [`TerminateMode::Forced`] is always the caller's decision.
pub struct ProcessInspector<P> {
    provider: P,
    grace: Duration,
}

impl<P: ProcessProvider> ProcessInspector<P> {
    pub fn new(provider: P) -> Self {
        ProcessInspector {
            provider,
            grace: Duration::from_secs(5),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// One enumeration pass over all processes. Multiple pids of the same
    /// application all appear; matches are not deduplicated.
    pub fn list_matching(&mut self, catalog: &[HostApplication]) -> Vec<RunningProcessMatch> {
        let records = self.provider.list();
        let mut matches = Vec::new();

        for record in &records {
            for host in catalog {
                if let Some(pattern) = host
                    .process_patterns
                    .iter()
                    .find(|p| p.matches(&record.name))
                {
                    matches.push(RunningProcessMatch {
                        pid: record.pid,
                        exe_name: record.name.clone(),
                        exe_path: record.exe.clone(),
                        host: host.id.clone(),
                        pattern: pattern.pattern.clone(),
                    });
                }
            }
        }

        debug!(count = matches.len(), "process match pass complete");
        matches
    }

    pub fn terminate(&mut self, pid: u32, mode: TerminateMode) -> TerminateOutcome {
        let force = mode == TerminateMode::Forced;

        match self.provider.signal(pid, force) {
            SignalResult::NotFound => return TerminateOutcome::NotFound,
            SignalResult::Denied => {
                warn!(pid, "signal denied");
                return TerminateOutcome::Denied;
            }
            SignalResult::Sent => {}
        }

        let deadline = Instant::now() + self.grace;
        while Instant::now() < deadline {
            if !self.provider.alive(pid) {
                info!(pid, ?mode, "process terminated");
                return TerminateOutcome::Terminated;
            }
            thread::sleep(Duration::from_millis(100));
        }

        // Still alive after the grace period; the caller may retry forced.
        TerminateOutcome::Denied
    }
}

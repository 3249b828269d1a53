//! Locates every process that belongs to one supervised run, including
//! descendants that left the process group or session, and kills them.
//!
//! A process belongs to the run when it is the direct child, descends from a
//! member through the parent chain, or holds the write end of one of the
//! run's capture pipes. Members are stopped as they are found so none can
//! fork past the sweep, then everything is killed at once.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::fs;
use std::os::fd::AsRawFd;
use tracing::{debug, warn};

/// Upper bound on stop-and-rescan rounds
const MAX_SWEEPS: usize = 32;

/// `O_ACCMODE` bits of an fd opened for writing only
const O_WRONLY: u32 = 0o1;

/// Identity of a pipe end as procfs prints it (`pipe:[inode]`)
pub(crate) fn pipe_identity<T: AsRawFd>(stream: Option<&T>) -> Option<String> {
    let fd = stream?.as_raw_fd();
    let target = fs::read_link(format!("/proc/self/fd/{}", fd)).ok()?;
    let target = target.to_string_lossy().into_owned();
    target.starts_with("pipe:").then_some(target)
}

/// Everything that identifies the processes of one run
#[derive(Debug)]
pub(crate) struct ProcessTree {
    /// Direct child; cleared once it has been reaped and its pid may be reused
    root: Option<Pid>,
    pgid: Option<Pid>,
    pipes: Vec<String>,
}

impl ProcessTree {
    pub(crate) fn new(pid: Option<u32>, pipes: Vec<String>) -> Self {
        let pid = pid.map(|pid| Pid::from_raw(pid as i32));
        Self {
            root: pid,
            pgid: pid,
            pipes,
        }
    }

    pub(crate) fn root_reaped(&mut self) {
        self.root = None;
    }

    /// Stop every member, then SIGKILL them all
    pub(crate) fn kill(&self) {
        // Freeze the group first so nothing in it forks mid-sweep
        if let Some(pgid) = self.pgid {
            signal_group(pgid, Signal::SIGSTOP);
        }

        let me = std::process::id() as i32;
        let mut members: HashSet<i32> = HashSet::new();
        for _ in 0..MAX_SWEEPS {
            let table = scan();
            let fresh = self.sweep(&table, &members, me);
            if fresh.is_empty() {
                break;
            }
            for pid in fresh {
                signal(pid, Signal::SIGSTOP);
                members.insert(pid);
            }
        }

        if let Some(pgid) = self.pgid {
            signal_group(pgid, Signal::SIGKILL);
        }
        for pid in &members {
            signal(*pid, Signal::SIGKILL);
        }
        debug!(members = members.len(), "Killed process tree");
    }

    /// Members of `table` not already in `known`
    fn sweep(&self, table: &[ProcEntry], known: &HashSet<i32>, me: i32) -> Vec<i32> {
        let mut members = known.clone();
        let mut fresh = Vec::new();

        for entry in table {
            if entry.pid == me || members.contains(&entry.pid) {
                continue;
            }
            let is_root = self.root.map(Pid::as_raw) == Some(entry.pid);
            if is_root || holds_pipe(entry.pid, &self.pipes) {
                members.insert(entry.pid);
                fresh.push(entry.pid);
            }
        }

        // Follow parent links until the snapshot adds nothing
        loop {
            let before = fresh.len();
            for entry in table {
                if entry.pid != me
                    && !members.contains(&entry.pid)
                    && members.contains(&entry.ppid)
                {
                    members.insert(entry.pid);
                    fresh.push(entry.pid);
                }
            }
            if fresh.len() == before {
                break;
            }
        }
        fresh
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcEntry {
    pid: i32,
    ppid: i32,
}

/// Live processes visible in `/proc`; zombies are left out
fn scan() -> Vec<ProcEntry> {
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<i32>().ok())
        .filter_map(|pid| {
            let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
            parse_stat(pid, &stat)
        })
        .collect()
}

/// `pid (comm) state ppid pgrp ...`; comm may itself contain parentheses
fn parse_stat(pid: i32, stat: &str) -> Option<ProcEntry> {
    let (_, rest) = stat.rsplit_once(')')?;
    let mut fields = rest.split_whitespace();
    let state = fields.next()?;
    if state == "Z" || state == "X" {
        return None;
    }
    let ppid = fields.next()?.parse().ok()?;
    Some(ProcEntry { pid, ppid })
}

/// Whether `pid` has one of `pipes` open for writing
fn holds_pipe(pid: i32, pipes: &[String]) -> bool {
    if pipes.is_empty() {
        return false;
    }
    let Ok(fds) = fs::read_dir(format!("/proc/{}/fd", pid)) else {
        return false;
    };

    fds.filter_map(|fd| fd.ok()).any(|fd| {
        let Ok(target) = fs::read_link(fd.path()) else {
            return false;
        };
        if !pipes.iter().any(|pipe| target.as_os_str() == pipe.as_str()) {
            return false;
        }
        let info = format!("/proc/{}/fdinfo/{}", pid, fd.file_name().to_string_lossy());
        fs::read_to_string(info)
            .ok()
            .and_then(|info| parse_fd_flags(&info))
            .is_some_and(|flags| flags & 0o3 == O_WRONLY)
    })
}

fn parse_fd_flags(fdinfo: &str) -> Option<u32> {
    fdinfo
        .lines()
        .find_map(|line| line.strip_prefix("flags:"))
        .and_then(|flags| u32::from_str_radix(flags.trim(), 8).ok())
}

fn signal(pid: i32, signal: Signal) {
    match kill(Pid::from_raw(pid), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, signal = %signal, "Failed to signal process: {}", e),
    }
}

fn signal_group(pgid: Pid, signal: Signal) {
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pgid.as_raw(), signal = %signal, "Failed to signal process group: {}", e),
    }
}

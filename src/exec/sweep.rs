// src/exec/sweep.rs

//! Best-effort sweep of orphaned capture processes.
//!
//! After every registered task has been stopped, any process on the system
//! that is still running the capture tool (and is not one of ours) is
//! force-killed. This catches processes whose task record was lost, e.g.
//! when a previous orchestrator crashed.
//!
//! The process list can change between enumeration and kill, so the sweep
//! is racy by nature and its count is approximate.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use sysinfo::System;
use tracing::{debug, info, warn};

use crate::errors::SweepError;

/// Something that can find and kill stray capture processes.
pub trait ProcessSweeper: Send + Sync {
    /// Kill every process running `program` whose pid is not in `exclude`.
    /// Returns how many were killed.
    fn sweep(&self, program: &Path, exclude: &HashSet<u32>) -> Result<usize, SweepError>;
}

/// Decides whether a system process is running the capture tool.
///
/// The tool is pinned to one location: an explicit path as given, or a bare
/// name resolved through `PATH`. A process matches when its executable is
/// that file, or when it is a shell running that file as a script
/// (`sh /path/to/tool ...`). Same-named binaries elsewhere never match.
#[derive(Debug, Clone)]
pub struct ProgramMatcher {
    located: PathBuf,
    canonical: PathBuf,
}

/// Interpreters that show up as the executable of a script-based tool.
const SHELLS: &[&str] = &["sh", "bash", "dash", "zsh", "ksh", "busybox"];

impl ProgramMatcher {
    /// Pin `program`, looking bare names up in the process's `PATH`.
    pub fn new(program: &Path) -> Result<Self, SweepError> {
        let search = std::env::var_os("PATH").unwrap_or_default();
        Self::with_search_path(program, &search)
    }

    /// Like [`ProgramMatcher::new`] with an explicit `PATH`-style search list.
    pub fn with_search_path(program: &Path, search: &OsStr) -> Result<Self, SweepError> {
        let located = if program.components().count() > 1 {
            program.to_path_buf()
        } else {
            locate(program, search).ok_or_else(|| SweepError::Unresolved(program.to_path_buf()))?
        };
        let canonical = std::fs::canonicalize(&located).unwrap_or_else(|_| located.clone());
        Ok(Self { located, canonical })
    }

    /// Location the matcher is pinned to.
    pub fn path(&self) -> &Path {
        &self.canonical
    }

    pub fn matches(&self, exe: Option<&Path>, cmd: &[String]) -> bool {
        let Some(exe) = exe else {
            return false;
        };
        if self.is_target(exe) {
            return true;
        }
        is_shell(exe) && cmd.get(1).is_some_and(|arg| self.is_target(Path::new(arg)))
    }

    fn is_target(&self, p: &Path) -> bool {
        p == self.canonical || p == self.located
    }
}

/// First file named `program` in the `PATH`-style list `search`.
fn locate(program: &Path, search: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

fn is_shell(exe: &Path) -> bool {
    exe.file_stem()
        .and_then(OsStr::to_str)
        .is_some_and(|stem| SHELLS.contains(&stem))
}

/// Sweeper backed by the `sysinfo` process table.
#[derive(Debug, Clone, Default)]
pub struct SysinfoSweeper;

impl ProcessSweeper for SysinfoSweeper {
    fn sweep(&self, program: &Path, exclude: &HashSet<u32>) -> Result<usize, SweepError> {
        let matcher = ProgramMatcher::new(program)?;
        debug!(program = %matcher.path().display(), "sweeping for orphaned capture processes");
        let own_pid = std::process::id();

        let mut system = System::new();
        system.refresh_processes();

        let mut killed = 0;
        for (pid, process) in system.processes() {
            let raw = pid.as_u32();
            if raw == own_pid || exclude.contains(&raw) {
                continue;
            }
            if !matcher.matches(process.exe(), process.cmd()) {
                continue;
            }

            if process.kill() {
                killed += 1;
                info!(pid = raw, program = %program.display(), "killed orphaned capture process");
            } else {
                warn!(pid = raw, program = %program.display(), "failed to kill orphaned capture process");
            }
        }

        debug!(killed, "orphan sweep finished");
        Ok(killed)
    }
}

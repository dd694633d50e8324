// src/exec/signal.rs

//! Graceful termination of a process by pid.

use std::io;

/// Whether [`terminate`] can ask a process to exit on its own.
pub const GRACEFUL_SUPPORTED: bool = cfg!(unix);

/// Send SIGTERM. A process that is already gone counts as success.
#[cfg(unix)]
pub fn terminate(pid: u32) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: kill(2) has no memory-safety preconditions.
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err)
}

#[cfg(not(unix))]
pub fn terminate(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination is only supported on unix",
    ))
}

// src/exec/backend.rs

//! Pluggable capture backend.
//!
//! The orchestrator never touches `tokio::process` directly. It asks a
//! [`CaptureBackend`] to spawn a capture process and gets back a
//! [`SpawnedCapture`]:
//!
//! - `signals` lets the stop path terminate or kill the process without
//!   owning it,
//! - `exit` is the future the watcher awaits; it resolves once, with the exit
//!   code and the complete diagnostic output.
//!
//! [`TokioCaptureBackend`] runs real processes. Tests swap in a fake backend
//! whose processes exit when the test says so.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::errors::SpawnError;
use crate::exec::command::CaptureCommand;
use crate::exec::signal;
use crate::types::{ExitReport, TaskId};

/// Future resolving to the exit report of one capture process.
pub type ExitFuture = Pin<Box<dyn Future<Output = ExitReport> + Send>>;

/// Termination controls for a running capture process.
pub trait ProcessSignals: Send + Sync {
    /// Ask the process to exit (SIGTERM where supported).
    fn terminate(&self);
    /// Force the process down.
    fn kill(&self);
}

/// A freshly started capture process.
pub struct SpawnedCapture {
    pub pid: Option<u32>,
    pub signals: Arc<dyn ProcessSignals>,
    pub exit: ExitFuture,
}

/// Trait abstracting how capture processes are started.
pub trait CaptureBackend: Send + Sync {
    fn spawn(&self, task: &TaskId, command: &CaptureCommand)
    -> Result<SpawnedCapture, SpawnError>;
}

/// Backend that runs the capture tool with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioCaptureBackend;

impl TokioCaptureBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for TokioCaptureBackend {
    fn spawn(
        &self,
        task: &TaskId,
        command: &CaptureCommand,
    ) -> Result<SpawnedCapture, SpawnError> {
        if command.has_explicit_path() && !command.program.is_file() {
            return Err(SpawnError::ExecutableMissing(command.program.clone()));
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW
            cmd.creation_flags(0x0800_0000);
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                SpawnError::ExecutableMissing(command.program.clone())
            }
            _ => SpawnError::LaunchFailed(e.to_string()),
        })?;

        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let signals = Arc::new(ChildSignals {
            pid,
            kill_tx: Mutex::new(Some(kill_tx)),
        });

        debug!(task = %task, ?pid, "capture process spawned");

        let stderr = child.stderr.take();
        let exit = Box::pin(wait_for_exit(task.clone(), stderr, child, kill_rx));

        Ok(SpawnedCapture {
            pid,
            signals,
            exit,
        })
    }
}

/// Wait for the child, honouring a kill request, and collect its stderr.
async fn wait_for_exit(
    task: TaskId,
    stderr: Option<tokio::process::ChildStderr>,
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
) -> ExitReport {
    // Always drain stderr so the pipe never fills and stalls the tool.
    let collector = stderr.map(|s| tokio::spawn(collect_diagnostics(task.clone(), s)));

    let status = tokio::select! {
        res = child.wait() => res,
        req = &mut kill_rx => {
            if req.is_ok() {
                debug!(task = %task, "force kill requested");
                if let Err(e) = child.start_kill() {
                    warn!(task = %task, error = %e, "failed to kill capture process");
                }
            }
            child.wait().await
        }
    };

    let diagnostics = match collector {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            warn!(task = %task, error = %e, "stderr collector failed");
            String::new()
        }),
        None => String::new(),
    };

    match status {
        Ok(status) => ExitReport::new(status.code().unwrap_or(-1), diagnostics),
        Err(e) => {
            error!(task = %task, error = %e, "waiting for capture process failed");
            ExitReport::new(-1, format!("{diagnostics}\nwaiting for capture process: {e}"))
        }
    }
}

async fn collect_diagnostics<R>(task: TaskId, stream: R) -> String
where
    R: AsyncRead + Unpin,
{
    let reader = BufReader::new(stream);
    let mut lines = reader.lines();
    let mut buffer = DiagnosticBuffer::default();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(task = %task, "stderr: {}", line);
                buffer.push_line(&line);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(task = %task, error = %e, "stderr read ended with error");
                break;
            }
        }
    }

    buffer.into_text()
}

/// Diagnostic output kept from the start of a run.
pub const DIAGNOSTIC_HEAD_BYTES: usize = 16 * 1024;
/// Diagnostic output kept from the end of a run.
pub const DIAGNOSTIC_TAIL_BYTES: usize = 16 * 1024;

/// Line buffer for a capture process's stderr.
///
/// Recordings can run for days, so only the first and the last lines are
/// kept; lines dropped in between are replaced by a single marker line.
#[derive(Debug, Default)]
pub struct DiagnosticBuffer {
    head: String,
    head_closed: bool,
    tail: VecDeque<String>,
    tail_bytes: usize,
    omitted: usize,
}

impl DiagnosticBuffer {
    pub fn push_line(&mut self, line: &str) {
        let line = truncate_on_char_boundary(line, DIAGNOSTIC_TAIL_BYTES - 1);

        if !self.head_closed {
            if self.head.len() + line.len() < DIAGNOSTIC_HEAD_BYTES {
                self.head.push_str(line);
                self.head.push('\n');
                return;
            }
            self.head_closed = true;
        }

        self.tail_bytes += line.len() + 1;
        self.tail.push_back(line.to_string());
        while self.tail_bytes > DIAGNOSTIC_TAIL_BYTES {
            let Some(dropped) = self.tail.pop_front() else {
                break;
            };
            self.tail_bytes -= dropped.len() + 1;
            self.omitted += 1;
        }
    }

    pub fn into_text(self) -> String {
        let mut text = self.head;
        if self.omitted > 0 {
            text.push_str(&format!("[... {} lines omitted ...]\n", self.omitted));
        }
        for line in self.tail {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Signals for a child owned by the exit future.
///
/// Terminate goes straight to the pid; kill is forwarded to the exit future
/// because it owns the `Child`.
struct ChildSignals {
    pid: Option<u32>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl ProcessSignals for ChildSignals {
    fn terminate(&self) {
        if !signal::GRACEFUL_SUPPORTED {
            self.kill();
            return;
        }
        // No pid means the child has already been reaped.
        if let Some(pid) = self.pid {
            if let Err(e) = signal::terminate(pid) {
                warn!(pid, error = %e, "failed to send graceful termination");
            }
        }
    }

    fn kill(&self) {
        if let Some(tx) = self.kill_tx.lock().take() {
            // Receiver gone means the process already exited.
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_kept_verbatim() {
        let mut buf = DiagnosticBuffer::default();
        buf.push_line("ffmpeg version 6.1");
        buf.push_line("[http @ 0x1] HTTP error 403 Forbidden");
        assert_eq!(
            buf.into_text(),
            "ffmpeg version 6.1\n[http @ 0x1] HTTP error 403 Forbidden\n"
        );
    }

    #[test]
    fn long_output_keeps_head_and_tail_within_bounds() {
        let mut buf = DiagnosticBuffer::default();
        buf.push_line("first line");
        for i in 0..100_000 {
            buf.push_line(&format!("frame={i} fps=30 q=-1.0 size=1024kB"));
        }
        buf.push_line("Server returned 404 Not Found");

        let text = buf.into_text();
        assert!(text.len() <= DIAGNOSTIC_HEAD_BYTES + DIAGNOSTIC_TAIL_BYTES + 64);
        assert!(text.starts_with("first line\n"));
        assert!(text.ends_with("Server returned 404 Not Found\n"));
        assert!(text.contains("lines omitted"));
    }

    #[test]
    fn oversized_line_is_cut_on_a_char_boundary() {
        let mut buf = DiagnosticBuffer::default();
        let huge = "é".repeat(DIAGNOSTIC_TAIL_BYTES);
        buf.push_line(&huge);
        buf.push_line("tail");

        let text = buf.into_text();
        assert!(text.len() <= DIAGNOSTIC_HEAD_BYTES + DIAGNOSTIC_TAIL_BYTES + 64);
        assert!(text.ends_with("tail\n"));
    }
}

// src/task/record.rs

//! The per-task record and the handle to its capture process.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::exec::ProcessSignals;
use crate::types::{TaskId, TaskStatus};

/// One capture task.
///
/// Descriptive fields are fixed at creation. `status` and `stopped_by_user`
/// only change through [`TaskRecord::finish`] and
/// [`TaskRecord::mark_stopped_by_user`], which enforce the lifecycle rules.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub stream_url: String,
    pub room_id: String,
    pub quality_label: String,
    pub title: String,
    pub output_path: PathBuf,
    pub pid: Option<u32>,
    pub created_at: DateTime<Local>,
    status: TaskStatus,
    stopped_by_user: bool,
    started: Instant,
    finished: Option<Instant>,
}

impl TaskRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        stream_url: String,
        room_id: String,
        quality_label: String,
        title: String,
        output_path: PathBuf,
        pid: Option<u32>,
        created_at: DateTime<Local>,
    ) -> Self {
        Self {
            id,
            stream_url,
            room_id,
            quality_label,
            title,
            output_path,
            pid,
            created_at,
            status: TaskStatus::Recording,
            stopped_by_user: false,
            started: Instant::now(),
            finished: None,
        }
    }

    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    pub fn is_recording(&self) -> bool {
        self.status == TaskStatus::Recording
    }

    pub fn stopped_by_user(&self) -> bool {
        self.stopped_by_user
    }

    /// Set the user-stop flag. Returns `false` if it was already set.
    pub fn mark_stopped_by_user(&mut self) -> bool {
        if self.stopped_by_user {
            return false;
        }
        self.stopped_by_user = true;
        true
    }

    /// Move from `Recording` to a terminal status. Returns `false` (and
    /// changes nothing) if the record is already terminal or `status` is not.
    pub fn finish(&mut self, status: TaskStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished = Some(Instant::now());
        true
    }

    /// Time spent recording; frozen once the task is terminal.
    pub fn elapsed(&self) -> Duration {
        match self.finished {
            Some(end) => end.duration_since(self.started),
            None => self.started.elapsed(),
        }
    }
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Control side of a task's capture process, kept in the registry.
///
/// The process itself is owned by the watcher; this handle can only signal
/// it and observe whether it has exited.
#[derive(Clone)]
pub struct ProcessHandle {
    pub pid: Option<u32>,
    pub signals: Arc<dyn ProcessSignals>,
    pub exited: watch::Receiver<bool>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("exited", &*self.exited.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureReason;

    fn record() -> TaskRecord {
        TaskRecord::new(
            TaskId::from("t1"),
            "https://cdn/x.flv".to_string(),
            "1".to_string(),
            "hd".to_string(),
            "title".to_string(),
            PathBuf::from("/tmp/out.mp4"),
            Some(42),
            Local::now(),
        )
    }

    #[test]
    fn new_records_are_recording() {
        let r = record();
        assert!(r.is_recording());
        assert!(!r.stopped_by_user());
        assert!(r.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stop_flag_is_write_once() {
        let mut r = record();
        assert!(r.mark_stopped_by_user());
        assert!(!r.mark_stopped_by_user());
        assert!(r.stopped_by_user());
    }

    #[test]
    fn terminal_status_is_final() {
        let mut r = record();
        assert!(r.finish(TaskStatus::Failed(FailureReason::Forbidden)));
        assert!(!r.finish(TaskStatus::Completed));
        assert!(!r.finish(TaskStatus::Recording));
        assert_eq!(r.status(), &TaskStatus::Failed(FailureReason::Forbidden));
    }

    #[test]
    fn cannot_finish_into_recording() {
        let mut r = record();
        assert!(!r.finish(TaskStatus::Recording));
        assert!(r.is_recording());
    }

    #[test]
    fn elapsed_freezes_when_terminal() {
        let mut r = record();
        r.finish(TaskStatus::Stopped);
        let first = r.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(r.elapsed(), first);
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(90_000)), "25:00:00");
    }
}

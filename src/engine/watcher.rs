// src/engine/watcher.rs

//! Per-task exit watcher.
//!
//! One watcher is spawned per successful `start()`. It awaits the capture
//! process's exit future without touching the registry, then classifies the
//! exit under the registry lock (so the `stopped_by_user` flag it reads is
//! the one the transition is based on) and reports the outcome.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::classifier::{ClassifierPolicy, classify};
use crate::engine::events::{EventSink, dispatch};
use crate::exec::ExitFuture;
use crate::task::TaskRegistry;
use crate::types::{TaskId, TaskStatus};

pub struct ExitWatcher {
    pub task: TaskId,
    pub registry: Arc<TaskRegistry>,
    pub sink: Arc<dyn EventSink>,
    pub policy: ClassifierPolicy,
    /// Flipped to `true` once the process has exited and the outcome is
    /// recorded; the stop path waits on it.
    pub exited: watch::Sender<bool>,
}

impl ExitWatcher {
    /// Run the watcher in the background. Fire-and-forget for the caller.
    pub fn spawn(self, exit: ExitFuture) -> JoinHandle<()> {
        tokio::spawn(self.run(exit))
    }

    async fn run(self, exit: ExitFuture) {
        let report = exit.await;

        debug!(
            task = %self.task,
            exit_code = report.exit_code,
            diagnostic_bytes = report.diagnostics.len(),
            "capture process exited"
        );

        let policy = self.policy;
        let outcome = self.registry.transition_with(&self.task, |record| {
            classify(&report, record.stopped_by_user(), policy).into_status()
        });

        match outcome {
            Some(status) => {
                log_outcome(&self.task, &status, report.exit_code);
                dispatch(self.sink.as_ref(), &self.task, &status);
            }
            None => {
                debug!(task = %self.task, "task already finalised; watcher has nothing to report");
            }
        }

        self.exited.send_replace(true);
    }
}

fn log_outcome(task: &TaskId, status: &TaskStatus, exit_code: i32) {
    match status {
        TaskStatus::Failed(reason) => {
            warn!(task = %task, exit_code, reason = ?reason, "recording failed");
        }
        TaskStatus::Stopped => info!(task = %task, exit_code, "recording stopped"),
        TaskStatus::Completed => info!(task = %task, "recording completed"),
        TaskStatus::Recording => {}
    }
}

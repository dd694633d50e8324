// src/engine/stop.rs

//! Stop coordination.
//!
//! Stopping one task:
//!
//! 1. flag the record `stopped_by_user` under the registry lock (this always
//!    happens before any signal, so whichever side finalises the task the
//!    outcome is `Stopped`),
//! 2. send a graceful termination and wait up to the grace period,
//! 3. force-kill if the process is still alive,
//! 4. finalise as `Stopped` if the watcher has not already, then remove the
//!    record.
//!
//! Stopping everything runs step 1-4 for each recording task in parallel and
//! then sweeps the system for orphaned capture processes, including any
//! whose exit was never observed.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::engine::events::{EventSink, dispatch};
use crate::errors::{LivecapError, Result, SweepError};
use crate::exec::ProcessSweeper;
use crate::task::TaskRegistry;
use crate::types::{TaskId, TaskStatus};

/// Outcome of [`StopCoordinator::stop_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopAllReport {
    /// Registered tasks that were stopped.
    pub stopped: usize,
    /// Unregistered capture processes killed by the sweep.
    pub orphans: usize,
}

impl StopAllReport {
    pub fn total(&self) -> usize {
        self.stopped + self.orphans
    }
}

struct StopOutcome {
    title: String,
    pid: Option<u32>,
    /// The watcher reported exit before the stop gave up waiting.
    exited: bool,
}

#[derive(Clone)]
pub struct StopCoordinator {
    registry: Arc<TaskRegistry>,
    sink: Arc<dyn EventSink>,
    sweeper: Arc<dyn ProcessSweeper>,
    program: PathBuf,
    grace_period: Duration,
}

impl StopCoordinator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        sink: Arc<dyn EventSink>,
        sweeper: Arc<dyn ProcessSweeper>,
        program: PathBuf,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            sweeper,
            program,
            grace_period,
        }
    }

    /// Stop one recording task and return its title.
    ///
    /// Tasks that are unknown, no longer recording or already being stopped
    /// yield `TaskNotFound`, which makes repeated calls harmless.
    pub async fn stop(&self, id: &TaskId) -> Result<String> {
        self.stop_task(id).await.map(|outcome| outcome.title)
    }

    async fn stop_task(&self, id: &TaskId) -> Result<StopOutcome> {
        let ticket = self
            .registry
            .begin_stop(id)
            .ok_or_else(|| LivecapError::TaskNotFound(id.to_string()))?;

        info!(task = %id, title = %ticket.title, pid = ?ticket.process.pid, "stopping recording");

        let mut exited = ticket.process.exited.clone();
        ticket.process.signals.terminate();

        let mut confirmed = timeout(self.grace_period, wait_exited(&mut exited))
            .await
            .is_ok();
        if !confirmed {
            warn!(
                task = %id,
                grace_ms = self.grace_period.as_millis() as u64,
                "capture process ignored graceful termination; killing"
            );
            ticket.process.signals.kill();

            confirmed = timeout(self.grace_period, wait_exited(&mut exited))
                .await
                .is_ok();
            if !confirmed {
                warn!(task = %id, pid = ?ticket.process.pid, "capture process still running after kill");
            }
        }

        if let Some(status) = self.registry.transition_with(id, |_| TaskStatus::Stopped) {
            dispatch(self.sink.as_ref(), id, &status);
        }
        self.registry.remove(id);

        debug!(task = %id, "recording stopped and removed");
        Ok(StopOutcome {
            title: ticket.title,
            pid: ticket.process.pid,
            exited: confirmed,
        })
    }

    /// Stop every recording task, then sweep for orphans.
    ///
    /// The sweep spares the pids of tasks still in the registry and of tasks
    /// whose exit was observed. A process that outlived its kill is left to
    /// the sweep.
    pub async fn stop_all(&self) -> StopAllReport {
        let ids = self.registry.recording_ids();

        let mut set = JoinSet::new();
        for id in ids {
            let this = self.clone();
            set.spawn(async move { this.stop_task(&id).await });
        }

        let mut stopped = 0;
        let mut exited_pids = HashSet::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    stopped += 1;
                    if let (true, Some(pid)) = (outcome.exited, outcome.pid) {
                        exited_pids.insert(pid);
                    }
                }
                // Finished on its own between the snapshot and the stop.
                Ok(Err(e)) => debug!(error = %e, "task left recording before it could be stopped"),
                Err(e) => warn!(error = %e, "stop worker failed"),
            }
        }

        let mut exclude = self.registry.known_pids();
        exclude.extend(exited_pids);
        let orphans = match self.sweep(exclude).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "orphan sweep failed");
                0
            }
        };

        info!(stopped, orphans, "stop-all finished");
        StopAllReport { stopped, orphans }
    }

    async fn sweep(&self, exclude: HashSet<u32>) -> std::result::Result<usize, SweepError> {
        let sweeper = Arc::clone(&self.sweeper);
        let program = self.program.clone();
        tokio::task::spawn_blocking(move || sweeper.sweep(&program, &exclude)).await?
    }
}

/// Resolve once the watcher has reported exit. A dropped sender means the
/// watcher is gone, which only happens after exit.
async fn wait_exited(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|done| *done).await;
}

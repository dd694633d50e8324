//! In-memory capture backend whose "processes" exit when the test says so.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use livecap::errors::{SpawnError, SweepError};
use livecap::exec::{CaptureBackend, CaptureCommand, ProcessSignals, ProcessSweeper, SpawnedCapture};
use livecap::types::{ExitReport, TaskId};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// What a fake process does when it receives the graceful signal.
#[derive(Debug, Clone)]
pub enum TerminateResponse {
    Exit(ExitReport),
    /// Keep running; only a kill ends it.
    Ignore,
}

#[derive(Default)]
struct FakeProcess {
    exit_tx: Option<oneshot::Sender<ExitReport>>,
    terminations: usize,
    kills: usize,
    unkillable: bool,
}

struct State {
    next_pid: u32,
    processes: HashMap<TaskId, FakeProcess>,
    spawned: Vec<(TaskId, CaptureCommand)>,
    fail_next: Option<SpawnError>,
    on_terminate: TerminateResponse,
}

#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    /// Terminated processes exit with code 255 and no output, like the real
    /// tool run with `-loglevel error`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_pid: 40_000,
                processes: HashMap::new(),
                spawned: Vec::new(),
                fail_next: None,
                on_terminate: TerminateResponse::Exit(ExitReport::new(255, "")),
            })),
        }
    }

    pub fn on_terminate(&self, response: TerminateResponse) {
        self.state.lock().on_terminate = response;
    }

    pub fn fail_next_spawn(&self, err: SpawnError) {
        self.state.lock().fail_next = Some(err);
    }

    /// Make the process of `id` exit. Returns false if it already exited.
    pub fn finish(&self, id: &TaskId, exit_code: i32, diagnostics: &str) -> bool {
        let tx = self
            .state
            .lock()
            .processes
            .get_mut(id)
            .and_then(|p| p.exit_tx.take());
        match tx {
            Some(tx) => tx.send(ExitReport::new(exit_code, diagnostics)).is_ok(),
            None => false,
        }
    }

    /// Make the process of `id` ignore every signal, like one stuck in
    /// uninterruptible I/O.
    pub fn unkillable(&self, id: &TaskId) {
        if let Some(p) = self.state.lock().processes.get_mut(id) {
            p.unkillable = true;
        }
    }

    pub fn spawned(&self) -> Vec<(TaskId, CaptureCommand)> {
        self.state.lock().spawned.clone()
    }

    pub fn terminations(&self, id: &TaskId) -> usize {
        self.state.lock().processes.get(id).map_or(0, |p| p.terminations)
    }

    pub fn kills(&self, id: &TaskId) -> usize {
        self.state.lock().processes.get(id).map_or(0, |p| p.kills)
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for FakeBackend {
    fn spawn(
        &self,
        task: &TaskId,
        command: &CaptureCommand,
    ) -> Result<SpawnedCapture, SpawnError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }

        let pid = state.next_pid;
        state.next_pid += 1;

        let (tx, rx) = oneshot::channel();
        state.processes.insert(
            task.clone(),
            FakeProcess {
                exit_tx: Some(tx),
                ..FakeProcess::default()
            },
        );
        state.spawned.push((task.clone(), command.clone()));

        let signals = Arc::new(FakeSignals {
            task: task.clone(),
            state: Arc::clone(&self.state),
        });

        Ok(SpawnedCapture {
            pid: Some(pid),
            signals,
            exit: Box::pin(async move {
                rx.await.unwrap_or_else(|_| ExitReport::new(-1, ""))
            }),
        })
    }
}

struct FakeSignals {
    task: TaskId,
    state: Arc<Mutex<State>>,
}

impl ProcessSignals for FakeSignals {
    fn terminate(&self) {
        let mut state = self.state.lock();
        let response = state.on_terminate.clone();
        if let Some(p) = state.processes.get_mut(&self.task) {
            p.terminations += 1;
            if p.unkillable {
                return;
            }
            if let TerminateResponse::Exit(report) = response {
                if let Some(tx) = p.exit_tx.take() {
                    let _ = tx.send(report);
                }
            }
        }
    }

    fn kill(&self) {
        let mut state = self.state.lock();
        if let Some(p) = state.processes.get_mut(&self.task) {
            p.kills += 1;
            if p.unkillable {
                return;
            }
            if let Some(tx) = p.exit_tx.take() {
                let _ = tx.send(ExitReport::new(-1, ""));
            }
        }
    }
}

/// Sweeper that "kills" a fixed number of orphans and records its calls.
#[derive(Default)]
pub struct FakeSweeper {
    orphans: usize,
    fail: bool,
    calls: Mutex<Vec<(PathBuf, HashSet<u32>)>>,
}

impl FakeSweeper {
    pub fn with_orphans(orphans: usize) -> Self {
        Self {
            orphans,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, HashSet<u32>)> {
        self.calls.lock().clone()
    }
}

impl ProcessSweeper for FakeSweeper {
    fn sweep(&self, program: &Path, exclude: &HashSet<u32>) -> Result<usize, SweepError> {
        self.calls
            .lock()
            .push((program.to_path_buf(), exclude.clone()));
        if self.fail {
            return Err(SweepError::Other("process table unavailable".to_string()));
        }
        Ok(self.orphans)
    }
}

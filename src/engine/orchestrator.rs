// src/engine/orchestrator.rs

//! The orchestrator object.
//!
//! Constructed once and shared by reference (it is cheap to clone). It owns
//! the registry, the capture backend, the event sink and the stop
//! coordinator, and exposes the control surface used by the CLI:
//! `start`, `stop`, `stop_all`, `list`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::RecorderSettings;
use crate::engine::events::EventSink;
use crate::engine::stop::{StopAllReport, StopCoordinator};
use crate::engine::watcher::ExitWatcher;
use crate::errors::{LivecapError, Result};
use crate::exec::{CaptureBackend, CaptureCommand, ProcessSweeper, SysinfoSweeper, TokioCaptureBackend};
use crate::naming;
use crate::resolve::unescape_play_url;
use crate::task::{ProcessHandle, TaskRecord, TaskRegistry};
use crate::types::TaskId;

/// Parameters of one `start()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    /// Caller-chosen id; generated when `None`.
    pub id: Option<TaskId>,
    pub stream_url: String,
    pub room_id: String,
    pub quality_label: String,
    pub title: String,
}

impl StartRequest {
    pub fn new(
        stream_url: impl Into<String>,
        room_id: impl Into<String>,
        quality_label: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            stream_url: stream_url.into(),
            room_id: room_id.into(),
            quality_label: quality_label.into(),
            title: title.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Everything derived from a request before anything is spawned.
#[derive(Debug, Clone)]
pub struct CapturePlan {
    pub id: TaskId,
    pub stream_url: String,
    pub title: String,
    pub output_path: PathBuf,
    pub command: CaptureCommand,
    pub created_at: DateTime<Local>,
}

impl CapturePlan {
    pub fn new(settings: &RecorderSettings, req: &StartRequest, now: DateTime<Local>) -> Self {
        let id = req
            .id
            .clone()
            .unwrap_or_else(|| TaskId::generate(&req.room_id, &req.quality_label));

        let stream_url = match unescape_play_url(&req.stream_url) {
            Some(fixed) => {
                info!(task = %id, "play URL contained escaped ampersands; unescaped");
                fixed
            }
            None => req.stream_url.clone(),
        };

        let title = naming::effective_title(&req.title).to_string();
        let output_path = naming::output_path(
            &settings.output_dir,
            &title,
            &req.quality_label,
            now,
            &settings.profile.container,
        );
        let command = settings
            .profile
            .command_for(&stream_url, &req.room_id, &output_path);

        Self {
            id,
            stream_url,
            title,
            output_path,
            command,
            created_at: now,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    settings: RecorderSettings,
    registry: Arc<TaskRegistry>,
    backend: Arc<dyn CaptureBackend>,
    sink: Arc<dyn EventSink>,
    stopper: StopCoordinator,
}

impl Orchestrator {
    /// Build an orchestrator and make sure the output directory exists.
    pub fn new(
        settings: RecorderSettings,
        backend: Arc<dyn CaptureBackend>,
        sink: Arc<dyn EventSink>,
        sweeper: Arc<dyn ProcessSweeper>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&settings.output_dir)?;

        let registry = Arc::new(TaskRegistry::new());
        let stopper = StopCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&sink),
            sweeper,
            settings.profile.program.clone(),
            settings.grace_period,
        );

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                registry,
                backend,
                sink,
                stopper,
            }),
        })
    }

    /// Orchestrator running real processes and sweeping with `sysinfo`.
    pub fn with_system_processes(
        settings: RecorderSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        Self::new(
            settings,
            Arc::new(TokioCaptureBackend::new()),
            sink,
            Arc::new(SysinfoSweeper),
        )
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    /// Spawn a capture process and register the task as `Recording`.
    ///
    /// Spawn failures are returned here and leave no trace in the registry.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, req: StartRequest) -> Result<TaskId> {
        let inner = &self.inner;
        let plan = CapturePlan::new(&inner.settings, &req, Local::now());

        if inner.registry.contains(&plan.id) {
            return Err(LivecapError::DuplicateId(plan.id.to_string()));
        }

        info!(
            task = %plan.id,
            title = %plan.title,
            quality = %req.quality_label,
            output = %plan.output_path.display(),
            "starting recording"
        );

        let spawned = inner.backend.spawn(&plan.id, &plan.command).map_err(|e| {
            warn!(task = %plan.id, error = %e, "failed to start capture process");
            e
        })?;

        let (exited_tx, exited_rx) = watch::channel(false);
        let handle = ProcessHandle {
            pid: spawned.pid,
            signals: Arc::clone(&spawned.signals),
            exited: exited_rx,
        };
        let record = TaskRecord::new(
            plan.id.clone(),
            plan.stream_url,
            req.room_id,
            req.quality_label,
            plan.title,
            plan.output_path,
            spawned.pid,
            plan.created_at,
        );

        if let Err(e) = inner.registry.register(record, handle) {
            // Lost a race on the same id; the process must not outlive us.
            spawned.signals.kill();
            return Err(e);
        }

        ExitWatcher {
            task: plan.id.clone(),
            registry: Arc::clone(&inner.registry),
            sink: Arc::clone(&inner.sink),
            policy: inner.settings.policy,
            exited: exited_tx,
        }
        .spawn(spawned.exit);

        info!(task = %plan.id, pid = ?spawned.pid, "recording started");
        Ok(plan.id)
    }

    /// Stop a recording task; returns its title.
    pub async fn stop(&self, id: &TaskId) -> Result<String> {
        self.inner.stopper.stop(id).await
    }

    /// Stop every recording task and sweep orphaned capture processes.
    pub async fn stop_all(&self) -> StopAllReport {
        self.inner.stopper.stop_all().await
    }

    /// Snapshot of every task still in the registry.
    pub fn list(&self) -> Vec<TaskRecord> {
        self.inner.registry.snapshot()
    }

    pub fn get(&self, id: &TaskId) -> Result<TaskRecord> {
        self.inner.registry.get(id)
    }

    /// Remove completed, stopped and failed records.
    pub fn clear_finished(&self) -> usize {
        self.inner.registry.clear_finished()
    }

    pub fn recording_count(&self) -> usize {
        self.inner.registry.recording_ids().len()
    }
}

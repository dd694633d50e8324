#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use livecap::config::RecorderSettings;
use livecap::engine::Orchestrator;

pub use livecap_test_utils::builders::{request, settings_in};
pub use livecap_test_utils::{
    FakeBackend, FakeSweeper, RecordingSink, TerminateResponse, init_tracing, with_timeout,
};

/// An orchestrator wired to fakes, writing into a temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub backend: FakeBackend,
    pub sink: Arc<RecordingSink>,
    pub sweeper: Arc<FakeSweeper>,
    pub orch: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeSweeper::default(), |s| s)
    }

    pub fn with(
        sweeper: FakeSweeper,
        tweak: impl FnOnce(RecorderSettings) -> RecorderSettings,
    ) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new();
        let sink = Arc::new(RecordingSink::new());
        let sweeper = Arc::new(sweeper);
        let orch = Orchestrator::new(
            tweak(settings_in(dir.path())),
            Arc::new(backend.clone()),
            sink.clone(),
            sweeper.clone(),
        )
        .unwrap();
        Self {
            dir,
            backend,
            sink,
            sweeper,
            orch,
        }
    }
}

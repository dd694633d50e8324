// src/engine/mod.rs

//! Orchestration engine for livecap.
//!
//! This module ties together:
//! - the pure exit [`classifier`]
//! - one [`watcher`] per recording, waiting for its process to exit
//! - the [`stop`] coordinator (graceful-then-forced termination, stop-all,
//!   orphan sweep)
//! - the [`events`] observer interface
//! - the [`orchestrator`] object exposing `start` / `stop` / `stop_all` /
//!   `list`

pub mod classifier;
pub mod events;
pub mod orchestrator;
pub mod stop;
pub mod watcher;

pub use classifier::{ClassifierPolicy, classify};
pub use events::{ChannelSink, EventSink, TaskEvent};
pub use orchestrator::{CapturePlan, Orchestrator, StartRequest};
pub use stop::{StopAllReport, StopCoordinator};
pub use watcher::ExitWatcher;

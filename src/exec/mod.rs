// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for everything that touches OS processes:
//!
//! - [`command`] builds the capture tool's command line.
//! - [`backend`] provides the `CaptureBackend` trait and the
//!   `TokioCaptureBackend` used in production; tests replace it with a fake.
//! - [`signal`] sends graceful termination signals by pid.
//! - [`sweep`] finds and kills orphaned capture processes.

pub mod backend;
pub mod command;
pub mod signal;
pub mod sweep;

pub use backend::{CaptureBackend, ExitFuture, ProcessSignals, SpawnedCapture, TokioCaptureBackend};
pub use command::{CaptureCommand, CaptureProfile};
pub use sweep::{ProcessSweeper, ProgramMatcher, SysinfoSweeper};

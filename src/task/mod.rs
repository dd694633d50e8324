// src/task/mod.rs

//! Task state.
//!
//! - [`record`] holds the fixed-shape `TaskRecord` and the `ProcessHandle`
//!   used to signal a task's capture process.
//! - [`registry`] is the concurrent id -> record table.

pub mod record;
pub mod registry;

pub use record::{ProcessHandle, TaskRecord, format_elapsed};
pub use registry::{StopTicket, TaskRegistry};

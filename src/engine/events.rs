// src/engine/events.rs

//! Observer interface for terminal transitions.
//!
//! Every task produces exactly one of `on_completed`, `on_stopped` or
//! `on_failed`. Handlers run on the watcher (or stop) path, so they must
//! return promptly; [`ChannelSink`] turns them into a non-blocking push
//! channel for consumers that want to do real work.

use tokio::sync::mpsc;

use crate::types::{FailureReason, TaskId, TaskStatus};

pub trait EventSink: Send + Sync {
    fn on_failed(&self, id: &TaskId, reason: &FailureReason, message: &str);
    fn on_completed(&self, id: &TaskId);
    fn on_stopped(&self, id: &TaskId);
}

/// Push-style event emitted by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Failed {
        task: TaskId,
        reason: FailureReason,
        message: String,
    },
    Completed {
        task: TaskId,
    },
    Stopped {
        task: TaskId,
    },
}

impl TaskEvent {
    pub fn task(&self) -> &TaskId {
        match self {
            TaskEvent::Failed { task, .. }
            | TaskEvent::Completed { task }
            | TaskEvent::Stopped { task } => task,
        }
    }
}

/// Forwards events into an unbounded channel; sending never blocks.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, event: TaskEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn on_failed(&self, id: &TaskId, reason: &FailureReason, message: &str) {
        self.push(TaskEvent::Failed {
            task: id.clone(),
            reason: reason.clone(),
            message: message.to_string(),
        });
    }

    fn on_completed(&self, id: &TaskId) {
        self.push(TaskEvent::Completed { task: id.clone() });
    }

    fn on_stopped(&self, id: &TaskId) {
        self.push(TaskEvent::Stopped { task: id.clone() });
    }
}

/// Report a terminal status to the sink. `Recording` is ignored.
pub fn dispatch(sink: &dyn EventSink, id: &TaskId, status: &TaskStatus) {
    match status {
        TaskStatus::Recording => {}
        TaskStatus::Completed => sink.on_completed(id),
        TaskStatus::Stopped => sink.on_stopped(id),
        TaskStatus::Failed(reason) => sink.on_failed(id, reason, &reason.to_string()),
    }
}

//! Event sink that keeps everything it receives.

use livecap::engine::{EventSink, TaskEvent};
use livecap::types::{FailureReason, TaskId};
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TaskEvent>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, id: &TaskId) -> Vec<TaskEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task() == id)
            .cloned()
            .collect()
    }

    /// Wait until at least `n` events have arrived; returns them all.
    pub async fn wait_for(&self, n: usize) -> Vec<TaskEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let events = self.events.lock();
                if events.len() >= n {
                    return events.clone();
                }
            }
            notified.await;
        }
    }

    fn push(&self, event: TaskEvent) {
        self.events.lock().push(event);
        self.notify.notify_waiters();
    }
}

impl EventSink for RecordingSink {
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

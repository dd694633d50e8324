// src/task/registry.rs

//! Concurrent task table.
//!
//! The registry is the single source of truth for liveness. Every operation
//! takes the map lock for the duration of a few field updates only; nothing
//! here blocks or awaits while holding it.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{LivecapError, Result};
use crate::task::record::{ProcessHandle, TaskRecord};
use crate::types::{TaskId, TaskStatus};

#[derive(Debug)]
struct Entry {
    record: TaskRecord,
    process: ProcessHandle,
}

/// What the stop path needs after flagging a task.
#[derive(Debug, Clone)]
pub struct StopTicket {
    pub title: String,
    pub process: ProcessHandle,
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: Mutex<HashMap<TaskId, Entry>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, record: TaskRecord, process: ProcessHandle) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&record.id) {
            return Err(LivecapError::DuplicateId(record.id.to_string()));
        }
        debug!(task = %record.id, "task registered");
        entries.insert(record.id.clone(), Entry { record, process });
        Ok(())
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn get(&self, id: &TaskId) -> Result<TaskRecord> {
        self.entries
            .lock()
            .get(id)
            .map(|e| e.record.clone())
            .ok_or_else(|| LivecapError::TaskNotFound(id.to_string()))
    }

    /// Remove a terminal record. Absent ids are a no-op; records that are
    /// still `Recording` are left in place.
    pub fn remove(&self, id: &TaskId) -> Option<TaskRecord> {
        let mut entries = self.entries.lock();
        match entries.get(id) {
            Some(entry) if entry.record.status().is_terminal() => {
                entries.remove(id).map(|e| e.record)
            }
            Some(_) => {
                debug!(task = %id, "refusing to remove a task that is still recording");
                None
            }
            None => None,
        }
    }

    /// Point-in-time copy of every record, oldest first.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> = self
            .entries
            .lock()
            .values()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    pub fn recording_ids(&self) -> Vec<TaskId> {
        self.entries
            .lock()
            .values()
            .filter(|e| e.record.is_recording())
            .map(|e| e.record.id.clone())
            .collect()
    }

    /// Pids of every process the registry knows about, live or not.
    pub fn known_pids(&self) -> HashSet<u32> {
        self.entries
            .lock()
            .values()
            .filter_map(|e| e.process.pid)
            .collect()
    }

    /// Flag a recording task as stopped by the user and hand out its process
    /// handle. `None` if the task is absent, already terminal, or another
    /// caller is already stopping it.
    pub fn begin_stop(&self, id: &TaskId) -> Option<StopTicket> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(id)?;
        if !entry.record.is_recording() || !entry.record.mark_stopped_by_user() {
            return None;
        }
        Some(StopTicket {
            title: entry.record.title.clone(),
            process: entry.process.clone(),
        })
    }

    /// Apply a terminal transition decided by `decide`, which sees the record
    /// as it is under the lock. Returns the new status if this call performed
    /// the transition.
    pub fn transition_with<F>(&self, id: &TaskId, decide: F) -> Option<TaskStatus>
    where
        F: FnOnce(&TaskRecord) -> TaskStatus,
    {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(id)?;
        if !entry.record.is_recording() {
            return None;
        }
        let status = decide(&entry.record);
        if entry.record.finish(status.clone()) {
            Some(status)
        } else {
            None
        }
    }

    /// Drop every terminal record. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.record.is_recording());
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use chrono::Local;
    use proptest::prelude::*;
    use tokio::sync::watch;

    use crate::exec::ProcessSignals;
    use crate::types::FailureReason;

    struct NoSignals;

    impl ProcessSignals for NoSignals {
        fn terminate(&self) {}
        fn kill(&self) {}
    }

    fn handle(pid: u32) -> ProcessHandle {
        let (_tx, rx) = watch::channel(false);
        ProcessHandle {
            pid: Some(pid),
            signals: Arc::new(NoSignals),
            exited: rx,
        }
    }

    fn record(id: &str) -> TaskRecord {
        TaskRecord::new(
            TaskId::from(id),
            "https://cdn/x.flv".to_string(),
            "1".to_string(),
            "hd".to_string(),
            format!("title-{id}"),
            PathBuf::from("/tmp/out.mp4"),
            Some(1),
            Local::now(),
        )
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let reg = TaskRegistry::new();
        reg.register(record("a"), handle(1)).unwrap();
        match reg.register(record("a"), handle(2)) {
            Err(LivecapError::DuplicateId(id)) => assert_eq!(id, "a"),
            other => panic!("expected DuplicateId, got {other:?}"),
        }
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let reg = TaskRegistry::new();
        assert!(matches!(
            reg.get(&TaskId::from("nope")),
            Err(LivecapError::TaskNotFound(_))
        ));
    }

    #[test]
    fn remove_is_idempotent_and_only_for_terminal_records() {
        let reg = TaskRegistry::new();
        let id = TaskId::from("a");
        reg.register(record("a"), handle(1)).unwrap();

        assert!(reg.remove(&id).is_none());
        assert!(reg.contains(&id));

        reg.transition_with(&id, |_| TaskStatus::Completed);
        assert!(reg.remove(&id).is_some());
        assert!(reg.remove(&id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn begin_stop_sets_flag_once_and_only_while_recording() {
        let reg = TaskRegistry::new();
        let id = TaskId::from("a");
        reg.register(record("a"), handle(1)).unwrap();

        let ticket = reg.begin_stop(&id).expect("recording task");
        assert_eq!(ticket.title, "title-a");
        assert!(reg.get(&id).unwrap().stopped_by_user());
        assert!(reg.begin_stop(&id).is_none(), "second stopper must back off");

        reg.transition_with(&id, |_| TaskStatus::Stopped);
        assert!(reg.begin_stop(&id).is_none());
        assert!(reg.get(&id).unwrap().stopped_by_user());
    }

    #[test]
    fn transition_happens_exactly_once() {
        let reg = TaskRegistry::new();
        let id = TaskId::from("a");
        reg.register(record("a"), handle(1)).unwrap();

        let first = reg.transition_with(&id, |_| {
            TaskStatus::Failed(FailureReason::NotFound)
        });
        let second = reg.transition_with(&id, |_| TaskStatus::Completed);

        assert_eq!(first, Some(TaskStatus::Failed(FailureReason::NotFound)));
        assert_eq!(second, None);
        assert_eq!(
            reg.get(&id).unwrap().status(),
            &TaskStatus::Failed(FailureReason::NotFound)
        );
    }

    #[test]
    fn clear_finished_keeps_recording_tasks() {
        let reg = TaskRegistry::new();
        for id in ["a", "b", "c"] {
            reg.register(record(id), handle(1)).unwrap();
        }
        reg.transition_with(&TaskId::from("a"), |_| TaskStatus::Completed);
        reg.transition_with(&TaskId::from("b"), |_| TaskStatus::Stopped);

        assert_eq!(reg.clear_finished(), 2);
        assert_eq!(reg.recording_ids(), vec![TaskId::from("c")]);
    }

    #[test]
    fn concurrent_registration_keeps_one_record_per_id() {
        let reg = Arc::new(TaskRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.register(record("shared"), handle(1)).is_ok())
            })
            .collect();

        let wins = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(reg.len(), 1);
    }

    proptest! {
        #[test]
        fn at_most_one_record_per_id(ids in proptest::collection::vec("[a-d]", 1..20)) {
            let reg = TaskRegistry::new();
            let mut accepted = HashSet::new();
            for id in &ids {
                let ok = reg.register(record(id), handle(1)).is_ok();
                prop_assert_eq!(ok, accepted.insert(id.clone()));
            }
            prop_assert_eq!(reg.len(), accepted.len());
        }
    }
}

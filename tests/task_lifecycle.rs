// tests/task_lifecycle.rs

mod common;
use crate::common::{Harness, request, with_timeout};

use std::time::Duration;

use livecap::config::RecorderSettings;
use livecap::engine::{ClassifierPolicy, TaskEvent};
use livecap::errors::{LivecapError, SpawnError};
use livecap::types::{FailureReason, SilentExitBehaviour, TaskId, TaskStatus};

#[tokio::test]
async fn started_task_is_listed_as_recording() {
    let h = Harness::new();
    let id = h.orch.start(request("a")).unwrap();

    let list = h.orch.list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, id);
    assert_eq!(list[0].status(), &TaskStatus::Recording);
    assert!(!list[0].stopped_by_user());
    assert_eq!(list[0].pid, Some(40_000));
    assert!(list[0].elapsed() < Duration::from_secs(1));
    assert_eq!(h.orch.recording_count(), 1);

    let (_, cmd) = &h.backend.spawned()[0];
    assert!(cmd.args.contains(&"https://cdn.example/a.flv".to_string()));
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn clean_exit_completes_and_is_kept_until_cleared() {
    let h = Harness::new();
    let id = h.orch.start(request("a")).unwrap();

    assert!(h.backend.finish(&id, 0, ""));
    let events = with_timeout(h.sink.wait_for(1)).await;
    assert_eq!(events, vec![TaskEvent::Completed { task: id.clone() }]);

    let record = h.orch.get(&id).unwrap();
    assert_eq!(record.status(), &TaskStatus::Completed);
    assert_eq!(h.orch.recording_count(), 0);

    assert_eq!(h.orch.clear_finished(), 1);
    assert!(h.orch.list().is_empty());
}

#[tokio::test]
async fn forbidden_crash_reports_failure_once() {
    let h = Harness::new();
    let id = h.orch.start(request("a")).unwrap();

    h.backend
        .finish(&id, 1, "[https @ 0x1] HTTP error 403 Forbidden\nInput/output error");
    let events = with_timeout(h.sink.wait_for(1)).await;

    match &events[0] {
        TaskEvent::Failed { task, reason, message } => {
            assert_eq!(task, &id);
            assert_eq!(reason, &FailureReason::Forbidden);
            assert!(!message.is_empty());
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(
        h.orch.get(&id).unwrap().status(),
        &TaskStatus::Failed(FailureReason::Forbidden)
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.sink.events().len(), 1);
}

#[tokio::test]
async fn unrecognised_output_is_unknown_failure_with_excerpt() {
    let h = Harness::new();
    let id = h.orch.start(request("a")).unwrap();

    h.backend.finish(&id, 8, "something odd happened");
    let events = with_timeout(h.sink.wait_for(1)).await;

    match &events[0] {
        TaskEvent::Failed { reason, message, .. } => {
            assert_eq!(
                reason,
                &FailureReason::Unknown {
                    exit_code: 8,
                    excerpt: "something odd happened".to_string()
                }
            );
            assert!(message.contains("8"));
            assert!(message.contains("something odd happened"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_nonzero_exit_is_stopped_by_default() {
    let h = Harness::new();
    let id = h.orch.start(request("a")).unwrap();

    h.backend.finish(&id, 1, "");
    let events = with_timeout(h.sink.wait_for(1)).await;

    assert_eq!(events, vec![TaskEvent::Stopped { task: id.clone() }]);
    assert!(!h.orch.get(&id).unwrap().stopped_by_user());
}

#[tokio::test]
async fn silent_nonzero_exit_fails_under_strict_policy() {
    let h = Harness::with(Default::default(), |s| RecorderSettings {
        policy: ClassifierPolicy {
            silent_exit: SilentExitBehaviour::Failed,
        },
        ..s
    });
    let id = h.orch.start(request("a")).unwrap();

    h.backend.finish(&id, 1, "  \n");
    let events = with_timeout(h.sink.wait_for(1)).await;

    assert!(matches!(
        &events[0],
        TaskEvent::Failed {
            reason: FailureReason::Unknown { exit_code: 1, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn spawn_failure_is_synchronous_and_never_registered() {
    let h = Harness::new();
    h.backend
        .fail_next_spawn(SpawnError::ExecutableMissing("/opt/ffmpeg".into()));

    match h.orch.start(request("a")) {
        Err(LivecapError::Spawn(SpawnError::ExecutableMissing(path))) => {
            assert_eq!(path, std::path::PathBuf::from("/opt/ffmpeg"));
        }
        other => panic!("expected ExecutableMissing, got {other:?}"),
    }
    assert!(h.orch.list().is_empty());
    assert!(h.sink.events().is_empty());

    // A later start is unaffected.
    assert!(h.orch.start(request("a")).is_ok());
}

#[tokio::test]
async fn duplicate_id_is_rejected_without_spawning() {
    let h = Harness::new();
    h.orch.start(request("a")).unwrap();

    assert!(matches!(
        h.orch.start(request("a")),
        Err(LivecapError::DuplicateId(_))
    ));
    assert_eq!(h.backend.spawned().len(), 1);
    assert_eq!(h.orch.list().len(), 1);
}

#[tokio::test]
async fn generated_ids_differ_per_start() {
    let h = Harness::new();
    let mut req = request("ignored");
    req.id = None;

    let a = h.orch.start(req.clone()).unwrap();
    let b = h.orch.start(req).unwrap();

    assert_ne!(a, b);
    assert!(a.as_str().starts_with("123456_高清_"));
    assert_eq!(h.orch.recording_count(), 2);
}

#[tokio::test]
async fn elapsed_freezes_once_terminal() {
    let h = Harness::new();
    let id = h.orch.start(request("a")).unwrap();
    h.backend.finish(&id, 0, "");
    with_timeout(h.sink.wait_for(1)).await;

    let first = h.orch.get(&id).unwrap().elapsed();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = h.orch.get(&id).unwrap().elapsed();
    assert_eq!(first, second);
}

#[tokio::test]
async fn one_task_crashing_leaves_others_recording() {
    let h = Harness::new();
    let a = h.orch.start(request("a")).unwrap();
    let b = h.orch.start(request("b")).unwrap();

    h.backend.finish(&a, 1, "Connection refused");
    with_timeout(h.sink.wait_for(1)).await;

    assert_eq!(
        h.orch.get(&a).unwrap().status(),
        &TaskStatus::Failed(FailureReason::StreamUnavailable)
    );
    assert_eq!(h.orch.get(&b).unwrap().status(), &TaskStatus::Recording);
    assert!(h.sink.events_for(&TaskId::from("b")).is_empty());
}

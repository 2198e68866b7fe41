//! tests/api/scheduler.rs
use crate::helpers::{scratch_dir, test_settings, write_input, TestCoordinator};
use claims::assert_matches;
use minimr::coordinator::service::{TaskReport, TaskResponse};
use minimr::task::{TaskKind, TaskState};
use minimr::worker::WorkerId;
use std::time::Duration;
use tarpc::context;
use tokio::time::sleep;

#[tokio::test]
async fn wrong_kind_and_duplicate_reports_are_rejected_over_rpc() {
    let dir = scratch_dir();
    let input = write_input(&dir, "a.txt", "hello world");
    let settings = test_settings(&dir, 1, 5);
    let coordinator =
        TestCoordinator::spawn(&settings, vec![input], Duration::from_secs(10)).await;
    let client = coordinator.client().await;

    let response = client
        .request_task(context::current(), WorkerId::new())
        .await
        .unwrap();
    assert_matches!(response, TaskResponse::Assigned(ref task) if task.kind == TaskKind::Map);

    // Reporting the map task as a reduce changes nothing.
    let report = TaskReport {
        id: 0,
        kind: TaskKind::Reduce,
    };
    assert!(!client.report_done(context::current(), report).await.unwrap());
    let snapshot = coordinator.coordinator.snapshot();
    assert_eq!(snapshot.tasks[0].status, TaskState::InProgress);

    // The correct report lands once; the duplicate is a no-op.
    let report = TaskReport {
        id: 0,
        kind: TaskKind::Map,
    };
    assert!(client.report_done(context::current(), report).await.unwrap());
    assert!(!client.report_done(context::current(), report).await.unwrap());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn a_silent_worker_has_its_task_reassigned_over_rpc() {
    let dir = scratch_dir();
    let input = write_input(&dir, "a.txt", "hello world");
    let settings = test_settings(&dir, 1, 5);
    let coordinator =
        TestCoordinator::spawn(&settings, vec![input], Duration::from_millis(200)).await;

    // The first worker claims the map task and goes silent.
    let silent = coordinator.client().await;
    let response = silent
        .request_task(context::current(), WorkerId::new())
        .await
        .unwrap();
    let task = match response {
        TaskResponse::Assigned(task) => task,
        other => panic!("expected an assignment, got {other:?}"),
    };

    // Past the timeout, a second worker is handed the same task.
    sleep(Duration::from_millis(300)).await;
    let survivor = coordinator.client().await;
    let response = survivor
        .request_task(context::current(), WorkerId::new())
        .await
        .unwrap();
    assert_matches!(response, TaskResponse::Assigned(ref reassigned) if reassigned.id == task.id);

    // The survivor's report completes the task; the original's is late.
    let report = TaskReport {
        id: task.id,
        kind: task.kind,
    };
    assert!(survivor.report_done(context::current(), report).await.unwrap());
    assert!(!silent.report_done(context::current(), report).await.unwrap());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn zero_reduce_configuration_is_rejected_at_startup() {
    let dir = scratch_dir();
    let settings = test_settings(&dir, 0, 5);
    let error = minimr::startup::run_coordinator(settings, Vec::new())
        .await
        .unwrap_err();
    assert!(error.to_string().contains("n_reduce"));
}

#[tokio::test]
async fn progress_snapshot_attributes_assignments_to_workers() {
    let dir = scratch_dir();
    let inputs = vec![
        write_input(&dir, "a.txt", "one"),
        write_input(&dir, "b.txt", "two"),
    ];
    let settings = test_settings(&dir, 1, 5);
    let coordinator = TestCoordinator::spawn(&settings, inputs, Duration::from_secs(10)).await;
    let client = coordinator.client().await;
    let worker = WorkerId::new();

    for _ in 0..2 {
        let response = client.request_task(context::current(), worker).await.unwrap();
        assert_matches!(response, TaskResponse::Assigned(_));
    }

    let snapshot = coordinator.coordinator.snapshot();
    assert_eq!(snapshot.tasks.len(), 3);
    assert_eq!(snapshot.progress_percent, 0.0);
    assert_eq!(snapshot.workers.len(), 1);
    assert_eq!(snapshot.workers[0].id, worker);
    assert_eq!(snapshot.workers[0].tasks_assigned, 2);

    coordinator.shutdown().await;
}

//! src/coordinator/service.rs
use crate::task::{Task, TaskKind, TaskState};
use crate::worker::WorkerId;

/// What a worker gets back from `request_task`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TaskResponse {
    /// A task to execute. The descriptor carries everything the worker
    /// needs; no further coordination happens until the completion report.
    Assigned(Task),
    /// Every runnable task is claimed but the job is not finished; poll
    /// again shortly.
    Wait,
    /// The job is terminal; the worker should exit.
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskReport {
    pub id: usize,
    pub kind: TaskKind,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WorkerProgress {
    pub id: WorkerId,
    pub tasks_assigned: u64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TaskProgress {
    pub id: usize,
    pub kind: TaskKind,
    pub status: TaskState,
}

/// Read-only projection of coordinator state, handed to external observers
/// (a dashboard serving it as JSON, an operator poking at the process).
/// Scheduling never depends on it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProgressSnapshot {
    pub workers: Vec<WorkerProgress>,
    pub tasks: Vec<TaskProgress>,
    pub progress_percent: f64,
}

#[tarpc::service]
pub trait CoordinatorService {
    /// Poll for work. Assigns the lowest-id runnable task, refreshing the
    /// assignment of any task whose previous assignment timed out.
    async fn request_task(worker: WorkerId) -> TaskResponse;

    /// Report a task finished. Returns `false` (and changes nothing) for
    /// late, duplicate, or mismatched reports.
    async fn report_done(report: TaskReport) -> bool;
}

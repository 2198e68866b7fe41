//! src/coordinator/mod.rs
pub mod service;

use crate::configuration::Settings;
use crate::coordinator::service::{
    CoordinatorService, ProgressSnapshot, TaskProgress, TaskReport, TaskResponse, WorkerProgress,
};
use crate::task::{TaskKind, TaskState, TaskTable};
use crate::worker::WorkerId;
use anyhow::Context;
use futures::{future, prelude::*};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tarpc::{
    server::{self, Channel},
    tokio_serde::formats::Json,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

struct SchedulerState {
    table: TaskTable,
    workers: HashMap<WorkerId, u64>,
    terminal: bool,
}

/// The task-scheduling state machine. All transitions happen under one
/// exclusive lock over the task table, held only across in-memory state;
/// handlers never do I/O while holding it.
#[derive(Clone)]
pub struct Coordinator {
    state: Arc<Mutex<SchedulerState>>,
    task_timeout: Duration,
}

impl Coordinator {
    pub fn new(
        job_name: &str,
        input_paths: Vec<PathBuf>,
        n_reduce: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                table: TaskTable::new(job_name, input_paths, n_reduce),
                workers: HashMap::new(),
                terminal: false,
            })),
            task_timeout,
        }
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().expect("scheduler state mutex poisoned")
    }

    pub fn assign(&self, worker: WorkerId) -> TaskResponse {
        self.assign_at(worker, Instant::now())
    }

    /// Assignment under the lock, in stable id order: hand out the first
    /// idle task, or refresh the first in-progress task whose assignment
    /// exceeded the timeout. Reduce tasks are invisible until every map is
    /// done. When nothing is runnable, report Wait, or latch terminal and
    /// report Done once the whole table is done.
    fn assign_at(&self, worker: WorkerId, now: Instant) -> TaskResponse {
        let mut guard = self.state();
        let state = &mut *guard;
        if state.terminal {
            return TaskResponse::Done;
        }
        state.workers.entry(worker).or_insert(0);
        let map_phase_complete = state.table.map_phase_complete();
        for entry in state.table.entries_mut() {
            if entry.task.kind == TaskKind::Reduce && !map_phase_complete {
                continue;
            }
            let reassigned = match entry.state {
                TaskState::Idle => false,
                TaskState::InProgress
                    if entry
                        .assigned_at
                        .is_some_and(|at| now.duration_since(at) > self.task_timeout) =>
                {
                    true
                }
                _ => continue,
            };
            entry.state = TaskState::InProgress;
            entry.assigned_at = Some(now);
            if let Some(assigned) = state.workers.get_mut(&worker) {
                *assigned += 1;
            }
            if reassigned {
                info!(
                    task_id = entry.task.id,
                    kind = %entry.task.kind,
                    worker_id = %worker,
                    "reassigning task whose last assignment timed out"
                );
            } else {
                info!(task_id = entry.task.id, kind = %entry.task.kind, worker_id = %worker, "assigned task");
            }
            return TaskResponse::Assigned(entry.task.clone());
        }
        if state.table.all_done() {
            state.terminal = true;
            info!("all tasks done, job is terminal");
            return TaskResponse::Done;
        }
        TaskResponse::Wait
    }

    /// Completion under the lock: only an in-progress task of the reported
    /// kind transitions to Done. A done task is never downgraded, so a late
    /// report from a superseded worker is a no-op.
    pub fn complete(&self, id: usize, kind: TaskKind) -> bool {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(entry) = state.table.get_mut(id) else {
            info!(task_id = id, "ignoring completion report for unknown task");
            return false;
        };
        if entry.state != TaskState::InProgress || entry.task.kind != kind {
            info!(task_id = id, kind = %kind, "ignoring late or mismatched completion report");
            return false;
        }
        entry.state = TaskState::Done;
        entry.assigned_at = None;
        info!(task_id = id, kind = %kind, "task completed");
        if !state.terminal && state.table.all_done() {
            state.terminal = true;
            info!("all tasks done, job is terminal");
        }
        true
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state();
        let total = state.table.len();
        let done = state
            .table
            .entries()
            .filter(|entry| entry.state == TaskState::Done)
            .count();
        let progress_percent = if total > 0 {
            done as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        ProgressSnapshot {
            workers: state
                .workers
                .iter()
                .map(|(id, tasks_assigned)| WorkerProgress {
                    id: *id,
                    tasks_assigned: *tasks_assigned,
                })
                .collect(),
            tasks: state
                .table
                .entries()
                .map(|entry| TaskProgress {
                    id: entry.task.id,
                    kind: entry.task.kind,
                    status: entry.state,
                })
                .collect(),
            progress_percent,
        }
    }

    pub fn done(&self) -> bool {
        let state = self.state();
        state.terminal || state.table.all_done()
    }
}

#[derive(Clone)]
pub struct CoordinatorServer {
    coordinator: Coordinator,
    host: String,
    port: u16,
}

impl CoordinatorServer {
    pub fn build(settings: &Settings, coordinator: Coordinator) -> Self {
        CoordinatorServer {
            host: settings.rpc.host.clone(),
            port: settings.rpc.port,
            coordinator,
        }
    }

    #[tracing::instrument(name = "CoordinatorServer start", skip_all)]
    pub async fn start(
        &self,
        shutdown_tx: &tokio::sync::broadcast::Sender<()>,
    ) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
        let (addr_tx, addr_rx) = oneshot::channel::<SocketAddr>();

        let socket_addr = self.get_addr().context("Failed to get address")?;

        let mut shutdown_rx = shutdown_tx.subscribe();
        let server_clone = self.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = Self::run_until_stopped(&socket_addr, addr_tx, server_clone) => {
                    result
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Coordinator shutting down");
                    Ok(())
                }
            }
        });
        tracing::info!("waiting to bind socket address");
        let socket_addr = addr_rx.await.context("Failed to receive coordinator address")?;
        tracing::info!("socket address acquired: {socket_addr}");
        Ok((socket_addr, handle))
    }

    #[tracing::instrument(name = "Run coordinator until stopped", skip_all)]
    async fn run_until_stopped(
        server_addr: &SocketAddr,
        addr_tx: oneshot::Sender<SocketAddr>,
        coordinator_server: CoordinatorServer,
    ) -> anyhow::Result<()> {
        let mut listener = tarpc::serde_transport::tcp::listen(server_addr, Json::default).await?;
        listener.config_mut().max_frame_length(usize::MAX);
        let socket_addr = listener.local_addr();
        let _ = addr_tx.send(socket_addr);
        listener
            // Ignore accept errors.
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .map(|channel| {
                channel
                    .execute(coordinator_server.clone().serve())
                    .for_each(spawn)
            })
            // Max 10 channels.
            .buffer_unordered(10)
            .for_each(|_| async {})
            .await;
        Ok(())
    }

    pub fn get_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr: IpAddr = self.host.parse().context("Failed to parse host")?;
        Ok(SocketAddr::new(addr, self.port))
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }
}

impl CoordinatorService for CoordinatorServer {
    #[tracing::instrument(name = "Request task", skip_all, fields(worker_id = %worker))]
    async fn request_task(self, _: tarpc::context::Context, worker: WorkerId) -> TaskResponse {
        self.coordinator.assign(worker)
    }

    #[tracing::instrument(name = "Report task done", skip_all, fields(task_id = report.id))]
    async fn report_done(self, _: tarpc::context::Context, report: TaskReport) -> bool {
        self.coordinator.complete(report.id, report.kind)
    }
}

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

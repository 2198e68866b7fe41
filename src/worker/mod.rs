//! src/worker/mod.rs
pub mod executor;

use crate::coordinator::service::{CoordinatorServiceClient, TaskReport, TaskResponse};
use crate::functions::{Mapper, Reducer, WordCount};
use crate::task::{Task, TaskKind};
use crate::worker::executor::{MapExecutor, ReduceExecutor};
use rand::Rng;
use std::fmt::Formatter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tarpc::context;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Durable identity a worker presents on every poll. Only used to attribute
/// assignment counts in the progress snapshot; the scheduler itself is
/// identity-blind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub fn new() -> Self {
        WorkerId(Uuid::new_v4())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated-workload chaos: random early exit and random stalls. A test
/// harness, not a product feature; enabled by the worker's
/// `--fault-injection` flag.
#[derive(Clone, Copy, Debug)]
pub struct FaultInjection {
    pub crash_probability: f64,
    pub delay_probability: f64,
    pub max_delay: Duration,
}

impl Default for FaultInjection {
    fn default() -> Self {
        Self {
            crash_probability: 0.05,
            delay_probability: 0.10,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl FaultInjection {
    async fn disrupt(&self) {
        let (roll, delay_roll, delay_fraction) = {
            let mut rng = rand::thread_rng();
            (rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>())
        };
        if roll < self.crash_probability {
            warn!("fault injection: worker exiting early");
            std::process::exit(1);
        }
        if delay_roll < self.delay_probability {
            let delay = self.max_delay.mul_f64(delay_fraction);
            warn!(delay = ?delay, "fault injection: worker stalling");
            sleep(delay).await;
        }
    }
}

/// The worker task loop: poll the coordinator, execute whatever comes back,
/// report, repeat until the job is done. Stateless across tasks.
pub struct Worker {
    id: WorkerId,
    client: CoordinatorServiceClient,
    mapper: Arc<dyn Mapper>,
    reducer: Arc<dyn Reducer>,
    work_dir: PathBuf,
    poll_interval: Duration,
    fault_injection: Option<FaultInjection>,
}

impl Worker {
    /// A worker running the reference word-count job.
    pub fn new(client: CoordinatorServiceClient, work_dir: PathBuf, poll_interval: Duration) -> Self {
        Self::with_functions(client, work_dir, poll_interval, Arc::new(WordCount), Arc::new(WordCount))
    }

    pub fn with_functions(
        client: CoordinatorServiceClient,
        work_dir: PathBuf,
        poll_interval: Duration,
        mapper: Arc<dyn Mapper>,
        reducer: Arc<dyn Reducer>,
    ) -> Self {
        Self {
            id: WorkerId::new(),
            client,
            mapper,
            reducer,
            work_dir,
            poll_interval,
            fault_injection: None,
        }
    }

    pub fn with_fault_injection(mut self, fault_injection: FaultInjection) -> Self {
        self.fault_injection = Some(fault_injection);
        self
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    #[tracing::instrument(name = "Worker run", skip_all, fields(worker_id = %self.id))]
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("worker started");
        loop {
            if let Some(fault_injection) = &self.fault_injection {
                fault_injection.disrupt().await;
            }
            let response = match self.client.request_task(context::current(), self.id).await {
                Ok(response) => response,
                Err(e) => {
                    // Transient transport failures are never fatal.
                    warn!(error = %e, "request_task failed, retrying after backoff");
                    sleep(self.poll_interval).await;
                    continue;
                }
            };
            match response {
                TaskResponse::Assigned(task) => self.execute(task).await,
                TaskResponse::Wait => sleep(self.poll_interval).await,
                TaskResponse::Done => {
                    info!("job is done, worker exiting");
                    return Ok(());
                }
            }
        }
    }

    async fn execute(&self, task: Task) {
        let report = TaskReport {
            id: task.id,
            kind: task.kind,
        };
        info!(task_id = task.id, kind = %task.kind, "executing task");
        let outcome = match task.kind {
            TaskKind::Map => MapExecutor::new(&self.work_dir, task).execute(self.mapper.as_ref()),
            TaskKind::Reduce => {
                ReduceExecutor::new(&self.work_dir, task).execute(self.reducer.as_ref())
            }
        };
        if let Err(e) = outcome {
            // Skip the report; the coordinator's timeout reclaims the task.
            error!(task_id = report.id, error = ?e, "task execution failed");
            return;
        }
        match self.client.report_done(context::current(), report).await {
            Ok(true) => debug!(task_id = report.id, "completion report accepted"),
            Ok(false) => {
                debug!(task_id = report.id, "completion report rejected, task was reassigned")
            }
            Err(e) => {
                warn!(task_id = report.id, error = %e, "report_done failed, the timeout will recover")
            }
        }
    }
}

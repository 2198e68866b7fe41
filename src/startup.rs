//! src/startup.rs
use crate::configuration::Settings;
use crate::coordinator::service::CoordinatorServiceClient;
use crate::coordinator::{Coordinator, CoordinatorServer};
use crate::merge::merge_outputs;
use crate::worker::{FaultInjection, Worker};
use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use tarpc::{client, tokio_serde::formats::Json};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::info;

/// Runs a whole job: serve the scheduler, poll the done latch, then run the
/// merge once every task is done. The RPC surface stays up through the
/// merge so straggling workers still receive their stop signal.
#[tracing::instrument(name = "Run coordinator", skip_all)]
pub async fn run_coordinator(settings: Settings, input_paths: Vec<PathBuf>) -> anyhow::Result<()> {
    anyhow::ensure!(
        settings.job.n_reduce > 0,
        "n_reduce must be at least 1: every map record needs a reduce bucket"
    );
    let coordinator = Coordinator::new(
        &settings.job.name,
        input_paths,
        settings.job.n_reduce,
        settings.job.task_timeout(),
    );
    let server = CoordinatorServer::build(&settings, coordinator);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (socket_addr, handle) = server.start(&shutdown_tx).await?;
    info!(
        addr = %socket_addr,
        n_reduce = settings.job.n_reduce,
        "coordinator serving, waiting for workers"
    );

    while !server.coordinator().done() {
        sleep(settings.job.poll_interval()).await;
    }

    let final_path = merge_outputs(
        &settings.job.work_dir,
        settings.job.n_reduce,
        settings.job.top_k,
    )?;
    info!(path = %final_path.display(), "job complete, merge artifact written");

    shutdown_tx.send(()).ok();
    handle.await??;
    Ok(())
}

/// Dials the coordinator and runs the worker loop until the job is done.
#[tracing::instrument(name = "Run worker", skip_all)]
pub async fn run_worker(
    settings: Settings,
    coordinator_addr: String,
    fault_injection: bool,
) -> anyhow::Result<()> {
    let addr: SocketAddr = coordinator_addr
        .parse()
        .with_context(|| format!("Invalid coordinator address: {coordinator_addr}"))?;
    let transport = tarpc::serde_transport::tcp::connect(addr, Json::default)
        .await
        .context("Failed to dial coordinator")?;
    let client = CoordinatorServiceClient::new(client::Config::default(), transport).spawn();

    let mut worker = Worker::new(
        client,
        settings.job.work_dir.clone(),
        settings.job.poll_interval(),
    );
    if fault_injection {
        worker = worker.with_fault_injection(FaultInjection::default());
    }
    worker.run().await
}

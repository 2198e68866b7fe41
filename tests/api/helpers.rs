//! tests/api/helpers.rs
use minimr::configuration::{JobSettings, RpcSettings, Settings};
use minimr::coordinator::service::CoordinatorServiceClient;
use minimr::coordinator::{Coordinator, CoordinatorServer};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tarpc::{client, tokio_serde::formats::Json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A fresh working directory for one test run.
pub fn scratch_dir() -> PathBuf {
    let path = std::env::temp_dir()
        .join("minimr-tests")
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&path).expect("Failed to create scratch directory");
    path
}

pub fn write_input(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write input file");
    path
}

/// Settings for an in-process job: ephemeral port, scratch working
/// directory, snappy polling.
pub fn test_settings(work_dir: &Path, n_reduce: usize, top_k: usize) -> Settings {
    Settings {
        rpc: RpcSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        job: JobSettings {
            name: "wordcount".to_string(),
            n_reduce,
            top_k,
            task_timeout_secs: 10,
            poll_interval_secs: 1,
            work_dir: work_dir.to_path_buf(),
        },
    }
}

pub struct TestCoordinator {
    pub coordinator: Coordinator,
    pub socket_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestCoordinator {
    /// Serves a coordinator for the given inputs on an ephemeral port.
    pub async fn spawn(settings: &Settings, input_paths: Vec<PathBuf>, task_timeout: Duration) -> Self {
        let coordinator = Coordinator::new(
            &settings.job.name,
            input_paths,
            settings.job.n_reduce,
            task_timeout,
        );
        let server = CoordinatorServer::build(settings, coordinator.clone());
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let (socket_addr, handle) = server
            .start(&shutdown_tx)
            .await
            .expect("Failed to start coordinator server");
        Self {
            coordinator,
            socket_addr,
            shutdown_tx,
            handle,
        }
    }

    pub async fn client(&self) -> CoordinatorServiceClient {
        let transport = tarpc::serde_transport::tcp::connect(self.socket_addr, Json::default)
            .await
            .expect("Failed to connect to coordinator");
        CoordinatorServiceClient::new(client::Config::default(), transport).spawn()
    }

    pub async fn shutdown(self) {
        self.shutdown_tx.send(()).ok();
        self.handle
            .await
            .expect("Coordinator server panicked")
            .expect("Coordinator server failed");
    }
}

//! src/configuration.rs
use serde_aux::field_attributes::deserialize_number_from_string;
use std::path::PathBuf;
use std::time::Duration;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub rpc: RpcSettings,
    pub job: JobSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct RpcSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct JobSettings {
    pub name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub n_reduce: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub top_k: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub task_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_secs: u64,
    pub work_dir: PathBuf,
}

impl JobSettings {
    /// Upper bound on expected task runtime; in-progress tasks older than
    /// this are handed to the next polling worker.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory.");
    let config_dir = base_path.join("configuration");

    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("job.yaml")))
        .add_source(
            config::Environment::with_prefix("MINIMR")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

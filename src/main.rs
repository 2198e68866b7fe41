//! src/main.rs
use clap::{Parser, Subcommand};
use minimr::configuration::get_configuration;
use minimr::startup::{run_coordinator, run_worker};
use minimr::telemetry::init_tracing;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minimr", about = "A small distributed MapReduce engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the task scheduler for a batch of input files, then merge the
    /// reduce outputs into the top-k ranking.
    #[command(visible_alias = "master")]
    Coordinator {
        /// Input files, one map task each.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Override the configured number of reduce tasks.
        #[arg(long)]
        n_reduce: Option<usize>,
        /// Override the configured size of the final ranking.
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Poll a coordinator for tasks until the job is done.
    Worker {
        /// Coordinator address, e.g. 127.0.0.1:1234.
        coordinator: String,
        /// Randomly crash and stall to exercise timeout reassignment.
        #[arg(long)]
        fault_injection: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = get_configuration()?;

    match cli.command {
        Command::Coordinator {
            inputs,
            n_reduce,
            top_k,
        } => {
            if let Some(n_reduce) = n_reduce {
                settings.job.n_reduce = n_reduce;
            }
            if let Some(top_k) = top_k {
                settings.job.top_k = top_k;
            }
            let _tracer_provider = init_tracing("minimr-coordinator", &settings.job)?;
            run_coordinator(settings, inputs).await
        }
        Command::Worker {
            coordinator,
            fault_injection,
        } => {
            let _tracer_provider = init_tracing("minimr-worker", &settings.job)?;
            run_worker(settings, coordinator, fault_injection).await
        }
    }
}

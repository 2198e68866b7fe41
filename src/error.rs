//! src/error.rs
use std::path::PathBuf;

/// Why a task attempt failed. None of these are fatal to the job: the worker
/// logs the error, skips the completion report, and the coordinator's
/// timeout reclaims the task.
#[derive(thiserror::Error)]
pub enum TaskError {
    #[error("failed to read input {path}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write spill file {path}")]
    SpillWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode record into {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode record from {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write output file {path}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("task descriptor is missing its {0} field")]
    InvalidDescriptor(&'static str),
}

impl std::fmt::Debug for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(f, self)
    }
}

/// Debug-formats an error with its whole `source()` chain, one cause per
/// line, so a spill failure still shows the underlying io error.
pub fn error_chain_fmt(
    f: &mut std::fmt::Formatter<'_>,
    e: &impl std::error::Error,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

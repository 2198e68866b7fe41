//! src/test_utils.rs
use std::path::PathBuf;
use uuid::Uuid;

/// A fresh per-test working directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let path = std::env::temp_dir()
        .join("minimr-tests")
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&path).expect("Failed to create scratch directory");
    path
}

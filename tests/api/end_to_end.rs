//! tests/api/end_to_end.rs
use crate::helpers::{scratch_dir, test_settings, write_input, TestCoordinator};
use minimr::merge::merge_outputs;
use minimr::worker::Worker;
use std::path::PathBuf;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(50);
const TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a whole job in-process: coordinator on an ephemeral port, `workers`
/// worker loops over real transport, then the merge. Returns the bytes of
/// `mr-final.txt`.
async fn run_job(inputs: &[(&str, &str)], n_reduce: usize, top_k: usize, workers: usize) -> String {
    let dir = scratch_dir();
    let input_paths: Vec<PathBuf> = inputs
        .iter()
        .map(|(name, content)| write_input(&dir, name, content))
        .collect();
    let settings = test_settings(&dir, n_reduce, top_k);
    let coordinator = TestCoordinator::spawn(&settings, input_paths, TIMEOUT).await;

    let mut handles = Vec::new();
    for _ in 0..workers {
        let client = coordinator.client().await;
        let worker = Worker::new(client, dir.clone(), POLL);
        handles.push(tokio::spawn(async move { worker.run().await }));
    }
    for handle in handles {
        handle
            .await
            .expect("Worker panicked")
            .expect("Worker failed");
    }

    assert!(coordinator.coordinator.done());
    let final_path =
        merge_outputs(&dir, n_reduce, top_k).expect("Failed to merge reduce outputs");
    coordinator.shutdown().await;
    std::fs::read_to_string(final_path).expect("Failed to read merge artifact")
}

#[tokio::test]
async fn single_input_counts_normalized_words() {
    let ranking = run_job(&[("a.txt", "Hello, hello world! World.")], 2, 3, 1).await;
    assert_eq!(ranking, "hello: 2\nworld: 2\n");
}

#[tokio::test]
async fn two_inputs_rank_by_count_with_key_tiebreak() {
    let inputs = [("a.txt", "the cat sat"), ("b.txt", "the dog sat on the mat")];
    let ranking = run_job(&inputs, 2, 5, 2).await;
    assert_eq!(ranking, "the: 3\nsat: 2\ncat: 1\ndog: 1\nmat: 1\n");
}

#[tokio::test]
async fn duplicate_keys_across_maps_are_summed_by_one_reducer() {
    let ranking = run_job(&[("a.txt", "x x"), ("b.txt", "x y")], 1, 2, 2).await;
    assert_eq!(ranking, "x: 3\ny: 1\n");
}

#[tokio::test]
async fn zero_inputs_complete_through_empty_reduces() {
    let dir = scratch_dir();
    let settings = test_settings(&dir, 3, 10);
    let coordinator = TestCoordinator::spawn(&settings, Vec::new(), TIMEOUT).await;

    let client = coordinator.client().await;
    let worker = Worker::new(client, dir.clone(), POLL);
    worker.run().await.expect("Worker failed");

    assert!(coordinator.coordinator.done());
    for reduce_index in 0..3 {
        let output = std::fs::read_to_string(dir.join(format!("mr-out-{reduce_index}")))
            .expect("Missing reduce output");
        assert!(output.is_empty());
    }
    let final_path = merge_outputs(&dir, 3, 10).expect("Failed to merge reduce outputs");
    let ranking = std::fs::read_to_string(final_path).unwrap();
    assert!(ranking.is_empty());
    coordinator.shutdown().await;
}

#[tokio::test]
async fn reference_job_is_deterministic_across_runs() {
    let inputs = [("a.txt", "the cat sat"), ("b.txt", "the dog sat on the mat")];
    let first = run_job(&inputs, 2, 5, 2).await;
    let second = run_job(&inputs, 2, 5, 2).await;
    assert_eq!(first, second);
}

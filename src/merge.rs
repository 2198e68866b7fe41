//! src/merge.rs
use anyhow::Context;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Collapses every `mr-out-{i}` into the global top-k ranking and writes it
/// to `mr-final.txt`, one `key: count` line per entry, sorted by count
/// descending with keys ascending as the tie-breaker. Runs strictly after
/// the job is terminal, so the reduce outputs are complete and stable.
///
/// Key sets are disjoint across reduce outputs by the partitioning
/// invariant, but duplicates are tolerated by summing. Malformed lines are
/// skipped with a diagnostic.
#[tracing::instrument(name = "Merge reduce outputs", skip_all)]
pub fn merge_outputs(work_dir: &Path, n_reduce: usize, top_k: usize) -> anyhow::Result<PathBuf> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for reduce_index in 0..n_reduce {
        let path = work_dir.join(format!("mr-out-{reduce_index}"));
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read reduce output, skipping");
                continue;
            }
        };
        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(key), Some(count), None) = (fields.next(), fields.next(), fields.next())
            else {
                warn!(path = %path.display(), line, "malformed line in reduce output, skipping");
                continue;
            };
            let Ok(count) = count.parse::<i64>() else {
                warn!(path = %path.display(), line, "non-integer count in reduce output, skipping");
                continue;
            };
            *totals.entry(key.to_string()).or_insert(0) += count;
        }
    }

    let mut ranked: Vec<(String, i64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let final_path = work_dir.join("mr-final.txt");
    let file = File::create(&final_path)
        .with_context(|| format!("Failed to create {}", final_path.display()))?;
    let mut writer = BufWriter::new(file);
    for (key, count) in ranked.iter().take(top_k) {
        writeln!(writer, "{key}: {count}").context("Failed to write merge artifact")?;
    }
    writer.flush().context("Failed to flush merge artifact")?;
    Ok(final_path)
}

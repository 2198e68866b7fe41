//! src/emitter.rs
use crate::error::TaskError;
use crate::functions::KeyValue;
use crate::partition::partition;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the spill files of one map task: one buffered writer per reduce
/// bucket, each record appended to the bucket `partition(key)` selects.
///
/// Spills are written to `mr-{map_id}-{reduce_index}.tmp` and renamed to
/// their final names by `finish`, so a reduce task can never observe a
/// truncated file from a crashed or superseded map attempt. A map task that
/// emits nothing for some bucket still publishes that bucket's (empty) file:
/// the full `mr-{map_id}-*` row is the observable completion of the task.
pub struct SpillEmitter {
    writers: Vec<BufWriter<File>>,
    tmp_paths: Vec<PathBuf>,
    final_paths: Vec<PathBuf>,
}

impl SpillEmitter {
    pub fn new(work_dir: &Path, map_id: usize, n_reduce: usize) -> Result<Self, TaskError> {
        let mut writers = Vec::with_capacity(n_reduce);
        let mut tmp_paths = Vec::with_capacity(n_reduce);
        let mut final_paths = Vec::with_capacity(n_reduce);
        for reduce_index in 0..n_reduce {
            let final_path = work_dir.join(format!("mr-{map_id}-{reduce_index}"));
            let tmp_path = work_dir.join(format!("mr-{map_id}-{reduce_index}.tmp"));
            let file = File::create(&tmp_path).map_err(|source| TaskError::SpillWrite {
                path: tmp_path.clone(),
                source,
            })?;
            writers.push(BufWriter::new(file));
            tmp_paths.push(tmp_path);
            final_paths.push(final_path);
        }
        Ok(Self {
            writers,
            tmp_paths,
            final_paths,
        })
    }

    pub fn emit(&mut self, record: &KeyValue) -> Result<(), TaskError> {
        let bucket = partition(&record.key, self.writers.len());
        let writer = &mut self.writers[bucket];
        serde_json::to_writer(&mut *writer, record).map_err(|source| TaskError::Encode {
            path: self.tmp_paths[bucket].clone(),
            source,
        })?;
        writer
            .write_all(b"\n")
            .map_err(|source| TaskError::SpillWrite {
                path: self.tmp_paths[bucket].clone(),
                source,
            })
    }

    /// Flushes every bucket and renames the spills to their final names.
    pub fn finish(self) -> Result<(), TaskError> {
        for ((mut writer, tmp_path), final_path) in self
            .writers
            .into_iter()
            .zip(self.tmp_paths)
            .zip(self.final_paths)
        {
            writer.flush().map_err(|source| TaskError::SpillWrite {
                path: tmp_path.clone(),
                source,
            })?;
            fs::rename(&tmp_path, &final_path).map_err(|source| TaskError::SpillWrite {
                path: final_path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

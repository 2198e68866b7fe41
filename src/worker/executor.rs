//! src/worker/executor.rs
use crate::emitter::SpillEmitter;
use crate::error::TaskError;
use crate::functions::{KeyValue, Mapper, Reducer};
use crate::task::Task;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Runs one map task: reads the whole input, applies the mapper, and spills
/// the emitted records into the task's `mr-{id}-*` row.
pub struct MapExecutor {
    work_dir: PathBuf,
    task: Task,
}

impl MapExecutor {
    pub fn new(work_dir: &Path, task: Task) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            task,
        }
    }

    #[tracing::instrument(name = "Execute map task", skip_all, fields(task_id = self.task.id))]
    pub fn execute(&self, mapper: &dyn Mapper) -> Result<(), TaskError> {
        let input_path = self
            .task
            .input_path
            .as_ref()
            .ok_or(TaskError::InvalidDescriptor("input_path"))?;
        let content =
            fs::read_to_string(input_path).map_err(|source| TaskError::InputRead {
                path: input_path.clone(),
                source,
            })?;
        let records = mapper.map(&input_path.to_string_lossy(), &content);
        let mut emitter = SpillEmitter::new(&self.work_dir, self.task.id, self.task.n_reduce)?;
        for record in &records {
            emitter.emit(record)?;
        }
        emitter.finish()
    }
}

/// Runs one reduce task: decodes its bucket's spill from every map task,
/// groups values by key, applies the reducer, and publishes
/// `mr-out-{reduce_index}` via rename.
pub struct ReduceExecutor {
    work_dir: PathBuf,
    task: Task,
}

impl ReduceExecutor {
    pub fn new(work_dir: &Path, task: Task) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            task,
        }
    }

    #[tracing::instrument(name = "Execute reduce task", skip_all, fields(task_id = self.task.id))]
    pub fn execute(&self, reducer: &dyn Reducer) -> Result<(), TaskError> {
        let reduce_index = self
            .task
            .reduce_index
            .ok_or(TaskError::InvalidDescriptor("reduce_index"))?;

        // BTreeMap keeps the output key order reproducible across attempts.
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for map_id in 0..self.task.n_map {
            let path = self.work_dir.join(format!("mr-{map_id}-{reduce_index}"));
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    // The phase gate means this shouldn't happen; an absent
                    // spill is indistinguishable from an empty one here.
                    warn!(path = %path.display(), "spill file missing, treating as empty");
                    continue;
                }
                Err(source) => return Err(TaskError::InputRead { path, source }),
            };
            let records = serde_json::Deserializer::from_reader(BufReader::new(file))
                .into_iter::<KeyValue>();
            for record in records {
                let KeyValue { key, value } = record.map_err(|source| TaskError::Decode {
                    path: path.clone(),
                    source,
                })?;
                grouped.entry(key).or_default().push(value);
            }
        }

        let final_path = self.work_dir.join(format!("mr-out-{reduce_index}"));
        let tmp_path = self.work_dir.join(format!("mr-out-{reduce_index}.tmp"));
        let output_write = |source| TaskError::OutputWrite {
            path: tmp_path.clone(),
            source,
        };
        let file = File::create(&tmp_path).map_err(output_write)?;
        let mut writer = BufWriter::new(file);
        for (key, values) in &grouped {
            let value = reducer.reduce(key, values);
            writeln!(writer, "{key} {value}").map_err(output_write)?;
        }
        writer.flush().map_err(output_write)?;
        fs::rename(&tmp_path, &final_path).map_err(|source| TaskError::OutputWrite {
            path: final_path.clone(),
            source,
        })
    }
}

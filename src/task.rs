//! src/task.rs
use std::fmt::Formatter;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaskKind {
    Map,
    Reduce,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Map => write!(f, "map"),
            TaskKind::Reduce => write!(f, "reduce"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaskState {
    Idle,
    InProgress,
    Done,
}

/// Immutable task descriptor, as handed to workers over the wire.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Task {
    pub id: usize,
    pub kind: TaskKind,
    pub job_name: String,
    /// Map tasks only: the input file this task processes.
    pub input_path: Option<PathBuf>,
    /// Reduce tasks only: the bucket in `[0, n_reduce)` this task collects.
    pub reduce_index: Option<usize>,
    pub n_map: usize,
    pub n_reduce: usize,
}

/// One row of the coordinator's task table: the descriptor plus the mutable
/// scheduling state. `assigned_at` is meaningful only while InProgress.
#[derive(Clone, Debug)]
pub struct TaskEntry {
    pub task: Task,
    pub state: TaskState,
    pub assigned_at: Option<Instant>,
}

/// The canonical task table: `[map_0 … map_{M−1}, reduce_0 … reduce_{R−1}]`,
/// with `id == index` and `reduce_index == id − n_map`.
#[derive(Debug)]
pub struct TaskTable {
    entries: Vec<TaskEntry>,
    n_map: usize,
    n_reduce: usize,
}

impl TaskTable {
    pub fn new(job_name: &str, input_paths: Vec<PathBuf>, n_reduce: usize) -> Self {
        let n_map = input_paths.len();
        let mut entries = Vec::with_capacity(n_map + n_reduce);
        for (id, input_path) in input_paths.into_iter().enumerate() {
            entries.push(TaskEntry {
                task: Task {
                    id,
                    kind: TaskKind::Map,
                    job_name: job_name.to_string(),
                    input_path: Some(input_path),
                    reduce_index: None,
                    n_map,
                    n_reduce,
                },
                state: TaskState::Idle,
                assigned_at: None,
            });
        }
        for reduce_index in 0..n_reduce {
            entries.push(TaskEntry {
                task: Task {
                    id: n_map + reduce_index,
                    kind: TaskKind::Reduce,
                    job_name: job_name.to_string(),
                    input_path: None,
                    reduce_index: Some(reduce_index),
                    n_map,
                    n_reduce,
                },
                state: TaskState::Idle,
                assigned_at: None,
            });
        }
        Self {
            entries,
            n_map,
            n_reduce,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn n_map(&self) -> usize {
        self.n_map
    }

    pub fn n_reduce(&self) -> usize {
        self.n_reduce
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut TaskEntry> {
        self.entries.get_mut(id)
    }

    /// Entries in stable id order.
    pub fn entries(&self) -> impl Iterator<Item = &TaskEntry> {
        self.entries.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut TaskEntry> {
        self.entries.iter_mut()
    }

    /// The phase gate predicate: reduces may only be assigned once this holds.
    pub fn map_phase_complete(&self) -> bool {
        self.entries[..self.n_map]
            .iter()
            .all(|entry| entry.state == TaskState::Done)
    }

    pub fn all_done(&self) -> bool {
        self.entries.iter().all(|entry| entry.state == TaskState::Done)
    }
}

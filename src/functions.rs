//! src/functions.rs
use std::collections::HashMap;

/// One record emitted by a map function and consumed by a reduce function.
/// Records cross process boundaries through spill files, hence the serde
/// derives.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// User-supplied map function: one whole input document in, records out.
pub trait Mapper: Send + Sync {
    fn map(&self, input_path: &str, content: &str) -> Vec<KeyValue>;
}

/// User-supplied reduce function: a key and every value emitted for it.
pub trait Reducer: Send + Sync {
    fn reduce(&self, key: &str, values: &[String]) -> String;
}

/// The reference word-count job. The mapper emits one record per distinct
/// normalized word carrying its per-file occurrence count; the reducer sums
/// integer values, so it also accepts mappers that emit one record per
/// occurrence.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordCount;

const TRIMMED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ':', ';', '"', '\''];

impl Mapper for WordCount {
    fn map(&self, _input_path: &str, content: &str) -> Vec<KeyValue> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for word in content.split_whitespace() {
            let word = word.trim_matches(TRIMMED_PUNCTUATION).to_lowercase();
            if !word.is_empty() {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .map(|(word, count)| KeyValue::new(word, count.to_string()))
            .collect()
    }
}

impl Reducer for WordCount {
    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let total: i64 = values
            .iter()
            .map(|value| value.parse::<i64>().unwrap_or(0))
            .sum();
        total.to_string()
    }
}

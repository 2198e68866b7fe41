//! src/partition.rs
use fnv::FnvHasher;
use std::hash::Hasher;

/// Maps a key to its reduce bucket. FNV-1a over the raw key bytes, so every
/// process reading or writing intermediate files agrees byte-for-byte; a
/// keyed hash such as SipHash would shuffle records into different buckets
/// per process and corrupt the shuffle.
pub fn partition(key: &str, n_reduce: usize) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() % n_reduce as u64) as usize
}

//! Thread-safe merge-by-key result aggregation
//!
//! Workers processing different coverage units report into one shared map.
//! A record is constructed lazily on the first update for its key and
//! mutated in place by every later update, regardless of which worker
//! performs it. The entire fetch-or-create-then-mutate sequence runs inside
//! a single critical section, so updates for one key never interleave at
//! the field level and no key ever gets two record instances.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

/// Shared mapping from a result key to an accumulated record
///
/// Typically shared as `Arc<ResultAggregator<..>>` between the driver and
/// the task closures it submits.
#[derive(Debug, Default)]
pub struct ResultAggregator<K, V> {
    records: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> ResultAggregator<K, V> {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically fetch-or-create the record for `key` and apply `apply`
    ///
    /// The record is default-constructed on the first update for the key.
    pub fn update(&self, key: K, apply: impl FnOnce(&mut V))
    where
        V: Default,
    {
        self.update_or(key, V::default, apply);
    }

    /// Like [`update`](Self::update) with a caller-supplied constructor
    ///
    /// `init` runs only if `key` has no record yet, inside the same
    /// critical section as `apply`.
    pub fn update_or(&self, key: K, init: impl FnOnce() -> V, apply: impl FnOnce(&mut V)) {
        let mut records = self.records.lock();
        let record = records.entry(key).or_insert_with(init);
        apply(record);
    }

    /// Clone out the record for `key`, if present
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.records.lock().get(key).cloned()
    }

    /// Number of keys with a record
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if no record has been created yet
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Snapshot of all keys
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.records.lock().keys().cloned().collect()
    }

    /// Consume the aggregator and return the accumulated map
    ///
    /// Call after [`WorkerPool::wait`] returns, when no worker can still be
    /// updating.
    ///
    /// [`WorkerPool::wait`]: crate::WorkerPool::wait
    pub fn into_inner(self) -> HashMap<K, V> {
        self.records.into_inner()
    }
}

//! Least-frequently-used eviction, ties broken by earliest insertion.

// std
use std::hash::Hash;
// crates.io
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::EvictionPolicy;

/// Per-key access counter, stored in insertion order so ties resolve to the
/// earliest-inserted key without a secondary index.
///
/// This is the simpler O(n) `select_victim` scan the design notes explicitly
/// permit as a starting point over a bucketed frequency list; `n` is the
/// live key count, bounded by `maxSize`.
pub struct LfuTracker<K> {
	counts: RwLock<IndexMap<K, u64>>,
}

impl<K: Eq + Hash + Clone> LfuTracker<K> {
	pub fn new() -> Self {
		Self { counts: RwLock::new(IndexMap::new()) }
	}
}

impl<K: Eq + Hash + Clone + Send + Sync> EvictionPolicy<K> for LfuTracker<K> {
	fn on_access(&self, key: &K) {
		if let Some(count) = self.counts.write().get_mut(key) {
			*count += 1;
		}
	}

	fn on_insert(&self, key: &K) {
		self.counts.write().entry(key.clone()).or_insert(0);
	}

	fn on_remove(&self, key: &K) {
		self.counts.write().shift_remove(key);
	}

	fn select_victim(&self) -> Option<K> {
		self.counts
			.read()
			.iter()
			.min_by_key(|&(_, count)| *count)
			.map(|(key, _)| key.clone())
	}

	fn clear(&self) {
		self.counts.write().clear();
	}

	fn len(&self) -> usize {
		self.counts.read().len()
	}
}

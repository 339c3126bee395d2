//! Least-recently-used eviction, O(1) amortized via an intrusive ordered map.

// std
use std::hash::Hash;
// crates.io
use indexmap::IndexSet;
use parking_lot::RwLock;

use super::EvictionPolicy;

/// Recency list: front is least-recently-used, back is most-recently-used.
///
/// Grounded in the same `IndexMap`-as-ordered-set trick the velesdb `LruCache`
/// uses — `shift_remove` + re-`insert` to move an entry to the back is O(1)
/// amortized.
pub struct LruTracker<K> {
	order: RwLock<IndexSet<K>>,
}

impl<K: Eq + Hash + Clone> LruTracker<K> {
	pub fn new() -> Self {
		Self { order: RwLock::new(IndexSet::new()) }
	}

	fn touch(&self, key: &K) {
		let mut order = self.order.write();
		if order.shift_remove(key) {
			order.insert(key.clone());
		}
	}
}

impl<K: Eq + Hash + Clone + Send + Sync> EvictionPolicy<K> for LruTracker<K> {
	fn on_access(&self, key: &K) {
		self.touch(key);
	}

	fn on_insert(&self, key: &K) {
		let mut order = self.order.write();
		order.shift_remove(key);
		order.insert(key.clone());
	}

	fn on_remove(&self, key: &K) {
		self.order.write().shift_remove(key);
	}

	fn select_victim(&self) -> Option<K> {
		self.order.read().first().cloned()
	}

	fn clear(&self) {
		self.order.write().clear();
	}

	fn len(&self) -> usize {
		self.order.read().len()
	}
}

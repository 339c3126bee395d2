//! First-in-first-out eviction: access is a no-op, victim is earliest insertion.

// std
use std::hash::Hash;
// crates.io
use indexmap::IndexSet;
use parking_lot::RwLock;

use super::EvictionPolicy;

/// Insertion-order queue; unlike [`super::LruTracker`], accesses never reorder it.
pub struct FifoTracker<K> {
	order: RwLock<IndexSet<K>>,
}

impl<K: Eq + Hash + Clone> FifoTracker<K> {
	pub fn new() -> Self {
		Self { order: RwLock::new(IndexSet::new()) }
	}
}

impl<K: Eq + Hash + Clone + Send + Sync> EvictionPolicy<K> for FifoTracker<K> {
	fn on_access(&self, _key: &K) {}

	fn on_insert(&self, key: &K) {
		let mut order = self.order.write();
		if !order.contains(key) {
			order.insert(key.clone());
		}
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

//! Uniformly-random eviction.

// std
use std::{
	cell::RefCell,
	hash::Hash,
};
// crates.io
use indexmap::IndexSet;
use parking_lot::RwLock;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::EvictionPolicy;

thread_local! {
	static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

/// Tracks only set membership; the victim is chosen uniformly at random
/// among currently-tracked keys on each call, per-thread via `SmallRng`.
pub struct RandomTracker<K> {
	keys: RwLock<IndexSet<K>>,
}

impl<K: Eq + Hash + Clone> RandomTracker<K> {
	pub fn new() -> Self {
		Self { keys: RwLock::new(IndexSet::new()) }
	}
}

impl<K: Eq + Hash + Clone + Send + Sync> EvictionPolicy<K> for RandomTracker<K> {
	fn on_access(&self, _key: &K) {}

	fn on_insert(&self, key: &K) {
		self.keys.write().insert(key.clone());
	}

	fn on_remove(&self, key: &K) {
		self.keys.write().shift_remove(key);
	}

	fn select_victim(&self) -> Option<K> {
		let keys = self.keys.read();
		if keys.is_empty() {
			return None;
		}
		let index = RNG.with(|rng| rng.borrow_mut().random_range(0..keys.len()));
		keys.get_index(index).cloned()
	}

	fn clear(&self) {
		self.keys.write().clear();
	}

	fn len(&self) -> usize {
		self.keys.read().len()
	}
}

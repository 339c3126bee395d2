//! Age-based eviction: victim is the key with the earliest creation instant.
//!
//! Distinct from FIFO, which tracks insertion order rather than a fixed
//! timestamp — `on_access` never moves a key, but more importantly a key
//! re-inserted (put again) is also re-timestamped, where FIFO treats
//! reinsertion of a tracked key as a no-op.

// std
use std::{collections::HashMap, hash::Hash};
// crates.io
use parking_lot::RwLock;
// tokio
use tokio::time::Instant;

use super::EvictionPolicy;

pub struct AgeTracker<K> {
	created_at: RwLock<HashMap<K, Instant>>,
}

impl<K: Eq + Hash + Clone> AgeTracker<K> {
	pub fn new() -> Self {
		Self { created_at: RwLock::new(HashMap::new()) }
	}
}

impl<K: Eq + Hash + Clone + Send + Sync> EvictionPolicy<K> for AgeTracker<K> {
	fn on_access(&self, _key: &K) {}

	fn on_insert(&self, key: &K) {
		self.created_at.write().insert(key.clone(), Instant::now());
	}

	fn on_remove(&self, key: &K) {
		self.created_at.write().remove(key);
	}

	fn select_victim(&self) -> Option<K> {
		self.created_at
			.read()
			.iter()
			.min_by_key(|&(_, created)| *created)
			.map(|(key, _)| key.clone())
	}

	fn clear(&self) {
		self.created_at.write().clear();
	}

	fn len(&self) -> usize {
		self.created_at.read().len()
	}
}

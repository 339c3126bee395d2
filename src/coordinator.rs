//! Per-key single-flight loading coordinator (§4.F).
//!
//! A sharded map of promise slots, one per in-flight key. The winner of a
//! race to insert a slot becomes the leader and runs the load; everyone else
//! waits on a [`tokio::sync::Notify`] and reads the leader's result. The slot
//! is removed before waking waiters, per the design note's ordering
//! requirement — a successor racing in after completion must not observe a
//! resolved promise and short-circuit onto a stale result.

// std
use std::{future::Future, hash::Hash, sync::Arc};
// crates.io
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;

struct Slot<T> {
	notify: Notify,
	result: Mutex<Option<Result<T>>>,
}

impl<T> Slot<T> {
	fn new() -> Self {
		Self { notify: Notify::new(), result: Mutex::new(None) }
	}
}

/// Coalesces concurrent loads of the same key into a single invocation.
///
/// `T` is whatever a resolution produces — typically `Option<Arc<V>>`, so a
/// loader reporting "no value for this key" coalesces the same way a
/// successful load does.
pub struct LoadCoordinator<K, T> {
	slots: DashMap<K, Arc<Slot<T>>>,
}

impl<K, T> LoadCoordinator<K, T>
where
	K: Eq + Hash + Clone,
	T: Clone,
{
	pub fn new() -> Self {
		Self { slots: DashMap::new() }
	}

	/// Number of keys currently being loaded.
	pub fn in_flight(&self) -> usize {
		self.slots.len()
	}

	/// Resolves `key` via `load`, coalescing with any concurrent callers.
	///
	/// Only the caller that wins the race to install the slot (the
	/// "leader") actually polls `load`; everyone else waits for the leader's
	/// result, success or failure alike. Cancelling a waiter's future (e.g.
	/// by dropping it) never cancels the leader's load — per §4.F, a load
	/// that loses all its waiters still runs to completion so the cache
	/// gets populated.
	pub async fn coalesce<F, Fut>(&self, key: K, load: F) -> Result<T>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let (slot, is_leader) = match self.slots.entry(key.clone()) {
			Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
			Entry::Vacant(entry) => {
				let slot = Arc::new(Slot::new());
				entry.insert(Arc::clone(&slot));
				(slot, true)
			},
		};

		if !is_leader {
			let notified = slot.notify.notified();
			// Re-check after constructing the `Notified` future: if the
			// leader already finished and notified, this won't race a
			// missed wakeup.
			if let Some(result) = slot.result.lock().clone() {
				return result;
			}
			notified.await;
			return slot.result.lock().clone().expect("slot result set before notify_waiters");
		}

		let result = load().await;
		*slot.result.lock() = Some(result.clone());
		self.slots.remove_if(&key, |_, existing| Arc::ptr_eq(existing, &slot));
		slot.notify.notify_waiters();
		result
	}
}

impl<K, T> Default for LoadCoordinator<K, T>
where
	K: Eq + Hash + Clone,
	T: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use std::{
		sync::atomic::{AtomicU32, Ordering},
		time::Duration,
	};

	#[tokio::test]
	async fn concurrent_misses_invoke_the_loader_once() {
		let coordinator: Arc<LoadCoordinator<String, i32>> = Arc::new(LoadCoordinator::new());
		let calls = Arc::new(AtomicU32::new(0));

		let mut handles = Vec::new();
		for _ in 0..50 {
			let coordinator = Arc::clone(&coordinator);
			let calls = Arc::clone(&calls);
			handles.push(tokio::spawn(async move {
				coordinator
					.coalesce("k".to_string(), || async {
						calls.fetch_add(1, Ordering::SeqCst);
						tokio::time::sleep(Duration::from_millis(50)).await;
						Ok(Arc::new(42))
					})
					.await
			}));
		}

		for handle in handles {
			assert_eq!(*handle.await.unwrap().unwrap(), 42);
		}
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.in_flight(), 0);
	}

	#[tokio::test]
	async fn failure_propagates_to_every_waiter() {
		let coordinator: Arc<LoadCoordinator<String, i32>> = Arc::new(LoadCoordinator::new());
		let calls = Arc::new(AtomicU32::new(0));

		let mut handles = Vec::new();
		for _ in 0..8 {
			let coordinator = Arc::clone(&coordinator);
			let calls = Arc::clone(&calls);
			handles.push(tokio::spawn(async move {
				coordinator
					.coalesce("k".to_string(), || async {
						calls.fetch_add(1, Ordering::SeqCst);
						tokio::time::sleep(Duration::from_millis(20)).await;
						Err(Error::LoadFailure("boom".into()))
					})
					.await
			}));
		}

		for handle in handles {
			assert!(handle.await.unwrap().is_err());
		}
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn slot_is_not_reused_after_completion() {
		let coordinator: LoadCoordinator<String, i32> = LoadCoordinator::new();

		let first = coordinator.coalesce("k".to_string(), || async { Ok(Arc::new(1)) }).await.unwrap();
		let second = coordinator.coalesce("k".to_string(), || async { Ok(Arc::new(2)) }).await.unwrap();

		assert_eq!(*first, 1);
		assert_eq!(*second, 2);
	}
}

//! Write-behind queue (§4.H): batched, coalesced, deferred persistence.
//!
//! Coalescing falls out of `DashMap`'s ordinary key-overwrite-on-insert
//! behavior — the latest `put` simply replaces whatever operation was
//! previously pending for a key, and a `remove` enqueued after a `put`
//! overwrites it the same way, which is exactly "a Remove after Put cancels
//! the Put". A side FIFO order queue (of possibly-duplicated keys) preserves
//! fair drain ordering without needing an intrusive ordered map.

// std
use std::{collections::VecDeque, hash::Hash, sync::Arc, time::Duration};
// crates.io
use dashmap::DashMap;
use parking_lot::Mutex;
// tokio
use tokio::time::{self, Instant};
// tracing
use tracing::warn;

use crate::loader::Writer;

/// One queued mutation awaiting persistence.
#[derive(Clone)]
enum Operation<V> {
	Put(V),
	Remove,
}

struct PendingItem<V> {
	operation: Operation<V>,
	enqueued_at: Instant,
}

/// Configuration the queue drains under; mirrors the `writeBehind*` options
/// in [`crate::config::CacheConfig`].
#[derive(Debug, Clone, Copy)]
pub struct WriteBehindPolicy {
	pub batch_size: usize,
	pub drain_interval: Duration,
	pub max_retries: u32,
	pub retry_delay: Duration,
}

/// Outcome of attempting to persist one coalesced item.
pub enum DrainOutcome<K> {
	Persisted(K),
	/// Retries were exhausted; the write is dropped. §4.H requires this be
	/// logged as a data-loss warning, which happens before this is returned.
	Lost(K),
}

/// Bounded-in-spirit FIFO of coalesced write-behind operations.
pub struct WriteBehindQueue<K, V> {
	pending: DashMap<K, PendingItem<V>>,
	order: Mutex<VecDeque<K>>,
}

impl<K, V> WriteBehindQueue<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	pub fn new() -> Self {
		Self { pending: DashMap::new(), order: Mutex::new(VecDeque::new()) }
	}

	/// Enqueues (or coalesces into an existing pending entry) a put.
	pub fn enqueue_put(&self, key: K, value: V) {
		self.pending.insert(key.clone(), PendingItem { operation: Operation::Put(value), enqueued_at: Instant::now() });
		self.order.lock().push_back(key);
	}

	/// Enqueues (or coalesces into an existing pending entry) a remove.
	pub fn enqueue_remove(&self, key: K) {
		self.pending.insert(key.clone(), PendingItem { operation: Operation::Remove, enqueued_at: Instant::now() });
		self.order.lock().push_back(key);
	}

	/// Number of distinct keys with a pending operation.
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Drains up to `policy.batch_size` coalesced items, persisting each via
	/// `writer` with bounded retry. Order-queue duplicates left over from
	/// coalesced keys are skipped silently — their operation already drained
	/// under an earlier, more current entry.
	pub async fn drain_batch(&self, writer: &dyn Writer<K, V>, policy: &WriteBehindPolicy) -> Vec<DrainOutcome<K>>
	where
		K: std::fmt::Debug,
	{
		let mut drained = Vec::new();
		while drained.len() < policy.batch_size {
			let Some(key) = self.order.lock().pop_front() else { break };
			let Some((_, item)) = self.pending.remove(&key) else { continue };

			let outcome = Self::persist_with_retry(writer, &key, item, policy).await;
			drained.push(outcome);
		}
		drained
	}

	/// Drains everything, ignoring `batch_size`, for use at shutdown. Items
	/// still unfinished when `deadline` elapses are reported as lost without
	/// being retried further.
	pub async fn flush(&self, writer: &dyn Writer<K, V>, policy: &WriteBehindPolicy, deadline: Duration) -> Vec<DrainOutcome<K>>
	where
		K: std::fmt::Debug,
	{
		let cutoff = Instant::now() + deadline;
		let mut drained = Vec::new();

		loop {
			if Instant::now() >= cutoff {
				while let Some(key) = self.order.lock().pop_front() {
					if self.pending.remove(&key).is_some() {
						warn!(?key, "write-behind flush deadline elapsed; item discarded");
						drained.push(DrainOutcome::Lost(key));
					}
				}
				break;
			}
			let Some(key) = self.order.lock().pop_front() else { break };
			let Some((_, item)) = self.pending.remove(&key) else { continue };

			drained.push(Self::persist_with_retry(writer, &key, item, policy).await);
		}
		drained
	}

	async fn persist_with_retry(writer: &dyn Writer<K, V>, key: &K, item: PendingItem<V>, policy: &WriteBehindPolicy) -> DrainOutcome<K>
	where
		K: std::fmt::Debug,
	{
		let mut attempt = 0;
		loop {
			let result = match &item.operation {
				Operation::Put(value) => writer.write(key, value).await,
				Operation::Remove => writer.delete(key).await,
			};

			match result {
				Ok(()) => return DrainOutcome::Persisted(key.clone()),
				Err(err) if attempt < policy.max_retries => {
					attempt += 1;
					warn!(?key, attempt, error = %err, "write-behind attempt failed, retrying");
					time::sleep(policy.retry_delay).await;
				},
				Err(err) => {
					warn!(
						?key,
						attempts = attempt,
						error = %err,
						age = ?item.enqueued_at.elapsed(),
						"write-behind retries exhausted; write dropped"
					);
					return DrainOutcome::Lost(key.clone());
				},
			}
		}
	}
}

impl<K, V> Default for WriteBehindQueue<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

/// Type-erased handle a cache can hold without naming `K`/`V` twice.
pub type SharedWriteBehindQueue<K, V> = Arc<WriteBehindQueue<K, V>>;

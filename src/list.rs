//! Cache List (§4.J): an index-addressed ordered cache reusing the clock
//! (4.A), metrics (4.B), and loader (4.E) components but with a single
//! collection-wide freshness marker instead of per-entry expiration.
//!
//! Unlike [`crate::map::Cache`], staleness here is all-or-nothing: the whole
//! snapshot goes stale at once and is replaced by one reload, not entry by
//! entry.

// std
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};
// crates.io
use async_trait::async_trait;
use parking_lot::RwLock;
// tokio
use tokio::time::{Duration, Instant};
// tracing
use tracing::{debug, warn};

use crate::{
	clock::AtomicInstant,
	config::ListLoadStrategy,
	error::{Error, Result},
	metrics::CacheMetrics,
};

/// Produces the contents of a [`CacheList`].
///
/// `load_one` is only ever consulted under [`ListLoadStrategy::One`]; its
/// default rejects the call, matching "random per-index loads are not
/// permitted unless the loader supports it".
#[async_trait]
pub trait ListLoader<V>: Send + Sync
where
	V: Send + Sync,
{
	/// Loads the entire ordered collection.
	async fn load_all(&self) -> Result<Vec<V>>;

	/// Loads a single index. Unsupported unless overridden.
	async fn load_one(&self, index: usize) -> Result<Option<V>> {
		let _ = index;
		Err(Error::Unsupported("this loader does not support per-index loads"))
	}
}

struct Snapshot<V> {
	values: Vec<Arc<V>>,
}

/// An ordered, index-addressed cache with one freshness marker for the
/// entire collection.
pub struct CacheList<V> {
	loader: Arc<dyn ListLoader<V>>,
	load_strategy: ListLoadStrategy,
	absolute_ttl: Duration,
	snapshot: RwLock<Arc<Snapshot<V>>>,
	loaded_at: AtomicInstant,
	reloading: AtomicBool,
	metrics: CacheMetrics,
}

impl<V> CacheList<V>
where
	V: Send + Sync + 'static,
{
	/// Builds an empty list; the first `get`/`get_all` triggers the initial load.
	pub fn new(loader: Arc<dyn ListLoader<V>>, load_strategy: ListLoadStrategy, absolute_ttl: Duration) -> Self {
		let epoch = Instant::now();
		Self {
			loader,
			load_strategy,
			absolute_ttl,
			snapshot: RwLock::new(Arc::new(Snapshot { values: Vec::new() })),
			loaded_at: AtomicInstant::none(epoch),
			reloading: AtomicBool::new(false),
			metrics: CacheMetrics::new(epoch),
		}
	}

	fn is_stale(&self, now: Instant) -> bool {
		match self.loaded_at.load() {
			None => true,
			Some(loaded_at) => now.saturating_duration_since(loaded_at) >= self.absolute_ttl,
		}
	}

	/// Triggers a reload if the collection is stale and no reload is
	/// already running; concurrent callers observe the last-known snapshot
	/// immediately rather than waiting.
	async fn maybe_reload(&self) {
		let now = Instant::now();
		if !self.is_stale(now) {
			return;
		}
		if self.reloading.compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed).is_err() {
			return;
		}

		match self.loader.load_all().await {
			Ok(values) => {
				let snapshot = Arc::new(Snapshot { values: values.into_iter().map(Arc::new).collect() });
				*self.snapshot.write() = snapshot;
				self.loaded_at.store(Instant::now());
				self.metrics.record_load_success(now.elapsed().as_nanos() as u64);
			},
			Err(err) => {
				self.metrics.record_load_failure();
				warn!(error = %err, "cache list bulk reload failed; retaining last-known snapshot");
			},
		}
		self.reloading.store(false, Ordering::Release);
	}

	/// Returns the value at `index`, reloading the collection first if it is
	/// stale (without blocking on a concurrent reload already in flight).
	pub async fn get(&self, index: usize) -> Result<Option<Arc<V>>> {
		self.maybe_reload().await;

		let hit = self.snapshot.read().values.get(index).cloned();
		match hit {
			Some(value) => {
				self.metrics.record_hit();
				Ok(Some(value))
			},
			None if self.load_strategy == ListLoadStrategy::One => {
				self.metrics.record_miss();
				match self.loader.load_one(index).await {
					Ok(Some(value)) => Ok(Some(Arc::new(value))),
					Ok(None) => Ok(None),
					Err(err) => {
						self.metrics.record_load_failure();
						Err(err)
					},
				}
			},
			None => {
				self.metrics.record_miss();
				Ok(None)
			},
		}
	}

	/// Returns the whole collection, reloading first if stale.
	pub async fn get_all(&self) -> Vec<Arc<V>> {
		self.maybe_reload().await;
		self.snapshot.read().values.clone()
	}

	pub fn size(&self) -> usize {
		self.snapshot.read().values.len()
	}

	/// Forces the next `get`/`get_all` to reload, regardless of TTL.
	pub fn invalidate(&self) {
		self.loaded_at.store(Instant::now().checked_sub(self.absolute_ttl + Duration::from_secs(1)).unwrap_or_else(Instant::now));
		debug!("cache list marked stale for forced reload");
	}

	pub fn metrics(&self) -> &CacheMetrics {
		&self.metrics
	}
}

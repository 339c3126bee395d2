//! Cache Map — the orchestrator that assembles components A–H (§4.I).
//!
//! `Cache<K, V>` is the cheaply-cloneable public handle (an `Arc` around
//! `Inner`), mirroring the teacher's `Registry`/`CacheManager` handle split.
//! Reads are lock-free beyond `DashMap`'s own per-shard stripe; a per-key
//! lock is only held implicitly by `DashMap::entry` during install/replace,
//! matching the striped entry-level locking the concurrency model requires.

mod entry;

use std::{
	hash::Hash,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

// crates.io
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::{
	sync::Mutex as AsyncMutex,
	task::JoinHandle,
	time::{self, Instant},
};
use tracing::{debug, instrument, warn};

pub use entry::Entry;

use crate::{
	cell::ValueCell,
	clock::ExpirationPolicy,
	config::{CacheConfig, LoadStrategy, ReferenceType, RefreshStrategy, WriteStrategy},
	coordinator::LoadCoordinator,
	error::{Error, Result},
	eviction::{self, EvictionPolicy},
	loader::{Loader, Writer},
	metrics::{CacheMetrics, HealthThresholds, HealthVerdict, MetricsSnapshot},
	refresh::{is_refresh_eligible, RefreshGuard},
	write_behind::{DrainOutcome, WriteBehindPolicy, WriteBehindQueue},
};

/// Adapts a `Writer<K, V>` into a `Writer<K, Arc<V>>` so the write-behind
/// queue (which needs to persist its queued items cheaply, i.e. via `Arc`
/// clone, without requiring `V: Clone`) can drive the same writer contract
/// the rest of the cache uses.
struct WriteBehindAdapter<K, V> {
	inner: Arc<dyn Writer<K, V>>,
}

#[async_trait]
impl<K, V> Writer<K, Arc<V>> for WriteBehindAdapter<K, V>
where
	K: Send + Sync,
	V: Send + Sync,
{
	async fn write(&self, key: &K, value: &Arc<V>) -> Result<()> {
		self.inner.write(key, value.as_ref()).await
	}

	async fn delete(&self, key: &K) -> Result<()> {
		self.inner.delete(key).await
	}
}

struct Inner<K, V> {
	config: CacheConfig,
	expiration: ExpirationPolicy,
	entries: DashMap<K, Entry<V>>,
	eviction: Box<dyn EvictionPolicy<K>>,
	metrics: CacheMetrics,
	coordinator: LoadCoordinator<K, Option<Arc<V>>>,
	refresh_guard: RefreshGuard<K>,
	loader: Option<Arc<dyn Loader<K, V>>>,
	writer: Option<Arc<dyn Writer<K, V>>>,
	write_behind: Option<WriteBehindQueue<K, Arc<V>>>,
	shut_down: AtomicBool,
	workers: AsyncMutex<Vec<JoinHandle<()>>>,
}

/// A concurrent, loader-driven, size-bounded cache.
///
/// Cheap to clone: every clone shares the same underlying table, trackers,
/// and background workers via `Arc`.
pub struct Cache<K, V> {
	inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}

impl<K, V> Cache<K, V>
where
	K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
	V: Send + Sync + 'static,
{
	/// Builds a cache with no loader and no writer: a plain bounded map that
	/// only ever holds what callers explicitly `put`.
	pub fn new(config: CacheConfig) -> Result<Self> {
		Self::build(config, None, None)
	}

	/// Builds a cache backed by `loader` (and, for write-through/behind,
	/// `writer`).
	pub fn with_collaborators(
		config: CacheConfig,
		loader: Option<Arc<dyn Loader<K, V>>>,
		writer: Option<Arc<dyn Writer<K, V>>>,
	) -> Result<Self> {
		Self::build(config, loader, writer)
	}

	fn build(config: CacheConfig, loader: Option<Arc<dyn Loader<K, V>>>, writer: Option<Arc<dyn Writer<K, V>>>) -> Result<Self> {
		config.validate()?;
		if config.write_strategy != WriteStrategy::ReadOnly && writer.is_none() {
			return Err(Error::ConfigurationError {
				field: "write_strategy",
				reason: "a writer is required for WriteThrough/WriteBehind".into(),
			});
		}

		let expiration = ExpirationPolicy { access_ttl: config.access_ttl, absolute_ttl: config.absolute_ttl };
		let write_behind = (config.write_strategy == WriteStrategy::WriteBehind).then(WriteBehindQueue::new);

		let inner = Arc::new(Inner {
			eviction: eviction::build(config.eviction_policy),
			entries: DashMap::new(),
			metrics: CacheMetrics::new(Instant::now()),
			coordinator: LoadCoordinator::new(),
			refresh_guard: RefreshGuard::new(),
			loader,
			writer,
			write_behind,
			shut_down: AtomicBool::new(false),
			workers: AsyncMutex::new(Vec::new()),
			expiration,
			config,
		});

		let cache = Self { inner };
		cache.spawn_background_workers();
		Ok(cache)
	}

	fn spawn_background_workers(&self) {
		let mut workers = self.inner.workers.try_lock().expect("no concurrent access during construction");

		if self.inner.config.enable_auto_cleanup {
			let cache = self.clone();
			let interval = self.inner.config.cleanup_interval;
			workers.push(tokio::spawn(async move { cache.cleanup_loop(interval).await }));
		}

		if self.inner.write_behind.is_some() {
			let cache = self.clone();
			workers.push(tokio::spawn(async move { cache.write_behind_loop().await }));
		}

		if self.inner.config.reference_type != ReferenceType::Strong {
			let cache = self.clone();
			let interval = self.inner.config.cleanup_interval;
			workers.push(tokio::spawn(async move { cache.reclaim_loop(interval).await }));
		}
	}

	fn ensure_open(&self) -> Result<()> {
		if self.inner.shut_down.load(Ordering::Acquire) {
			return Err(Error::Shutdown);
		}
		Ok(())
	}

	/// Returns the present, fresh value for `key`; on absence or staleness,
	/// engages the loading coordinator. `Ok(None)` iff the loader returned
	/// no value, or no loader is configured and the key is absent.
	///
	/// Under `LoadStrategy::Async`, a stale-but-still-peekable prior value is
	/// returned immediately while revalidation runs in the background
	/// (§4.F stale-while-revalidate); `LoadStrategy::Sync` always blocks
	/// callers on the coordinator for a stale or absent key.
	#[instrument(skip(self), fields(cache = %self.inner.config.cache_name))]
	pub async fn get(&self, key: K) -> Result<Option<Arc<V>>> {
		self.ensure_open()?;
		let now = Instant::now();

		let allow_stale = self.inner.config.load_strategy == LoadStrategy::Async;
		if let Some(hit) = self.serve_entry(&key, now, allow_stale) {
			return Ok(Some(hit));
		}

		self.inner.metrics.record_miss();
		let Some(loader) = self.inner.loader.clone() else { return Ok(None) };

		let cache = self.clone();
		let load_key = key.clone();
		self.inner
			.coordinator
			.coalesce(key, move || {
				let cache = cache.clone();
				let key = load_key;
				async move { cache.load_and_install(loader, key).await }
			})
			.await
	}

	/// Checks the entry table for `key`. A present, unexpired, uncleared
	/// value is always returned as an ordinary hit.
	///
	/// When `allow_stale_while_revalidate` is set and the entry is expired
	/// (but its cell is not cleared), the stale value is returned immediately
	/// and a background revalidation is kicked off instead of removing the
	/// entry outright; the winning revalidation overwrites the stale entry
	/// once it completes. Otherwise a stale or cleared entry is removed and
	/// this reports a miss.
	fn serve_entry(&self, key: &K, now: Instant, allow_stale_while_revalidate: bool) -> Option<Arc<V>> {
		let (stale_or_cleared, stale_value, last_access) = {
			let entry = self.inner.entries.get(key)?;
			let last_access = entry.last_access();
			let expired = self.inner.expiration.is_expired_with_override(
				now,
				last_access,
				entry.installed_at(),
				entry.access_ttl_override(),
			);
			let cleared = entry.is_cleared();
			let stale_value = (allow_stale_while_revalidate && expired && !cleared).then(|| entry.peek()).flatten();
			(expired || cleared, stale_value, last_access)
		};

		if stale_or_cleared {
			if let Some(value) = stale_value {
				self.maybe_trigger_async_reload(key);
				self.inner.metrics.record_hit();
				return Some(value);
			}
			self.remove_entry(key, 1);
			return None;
		}

		let value = self.inner.entries.get(key)?.touch_and_get()?;
		self.inner.eviction.on_access(key);
		self.inner.metrics.record_hit();
		// Eligibility is judged against the access stamp from *before* this
		// call's `touch_and_get` — using the just-refreshed stamp would always
		// read as zero elapsed and refresh-ahead would never fire.
		self.maybe_trigger_refresh(key, now, last_access);
		Some(value)
	}

	/// Kicks off a background revalidation for a stale-but-served entry under
	/// `LoadStrategy::Async`, sharing the refresh-ahead machinery (and its
	/// per-key in-flight guard) since both are "reload in the background,
	/// keep serving the old value on failure" operations.
	fn maybe_trigger_async_reload(&self, key: &K) {
		let Some(loader) = self.inner.loader.clone() else { return };
		if !self.inner.refresh_guard.try_begin(key) {
			return;
		}

		let cache = self.clone();
		let key = key.clone();
		tokio::spawn(async move {
			cache.run_refresh(loader, key).await;
		});
	}

	fn maybe_trigger_refresh(&self, key: &K, now: Instant, last_access: Instant) {
		if self.inner.config.refresh_strategy != RefreshStrategy::RefreshAhead {
			return;
		}
		let Some(access_ttl) = self.inner.config.access_ttl else { return };
		let Some(loader) = self.inner.loader.clone() else { return };

		if !is_refresh_eligible(now, last_access, access_ttl, self.inner.config.refresh_ahead_factor) {
			return;
		}
		if !self.inner.refresh_guard.try_begin(key) {
			return;
		}

		let cache = self.clone();
		let key = key.clone();
		tokio::spawn(async move {
			cache.run_refresh(loader, key).await;
		});
	}

	async fn run_refresh(&self, loader: Arc<dyn Loader<K, V>>, key: K) {
		let started = Instant::now();
		match loader.load_one(&key).await {
			Ok(Some(value)) => {
				self.inner.metrics.record_load_success(started.elapsed().as_nanos() as u64);
				let cell = self.wrap_value(Arc::new(value));
				if let Some(mut entry) = self.inner.entries.get_mut(&key) {
					entry.replace_value(cell, Instant::now());
					// Re-stamp the tracker so Age eviction sees this key's
					// refreshed creationInstant rather than its original one.
					self.inner.eviction.on_insert(&key);
				}
			},
			Ok(None) => {
				debug!(?key, "refresh-ahead loader returned no value; keeping existing entry");
			},
			Err(err) => {
				// §3 invariant: on failure the existing value and creation
				// instant are unchanged; the entry is simply retried later.
				self.inner.metrics.record_load_failure();
				warn!(?key, error = %err, "refresh-ahead load failed; retaining stale value");
			},
		}
		self.inner.refresh_guard.finish(&key);
	}

	async fn load_and_install(&self, loader: Arc<dyn Loader<K, V>>, key: K) -> Result<Option<Arc<V>>> {
		let started = Instant::now();
		match loader.load_one(&key).await {
			Ok(Some(value)) => {
				self.inner.metrics.record_load_success(started.elapsed().as_nanos() as u64);
				let value = Arc::new(value);
				self.install(key, Arc::clone(&value), None);
				Ok(Some(value))
			},
			// §9 open question: a loader reporting "no value" is treated as
			// a miss and nothing is installed, rather than caching a
			// negative entry.
			Ok(None) => Ok(None),
			Err(err) => {
				self.inner.metrics.record_load_failure();
				Err(err)
			},
		}
	}

	fn wrap_value(&self, value: Arc<V>) -> ValueCell<V> {
		match self.inner.config.reference_type {
			ReferenceType::Strong => ValueCell::strong(value),
			ReferenceType::Soft => ValueCell::soft(value),
			ReferenceType::Weak => ValueCell::weak(&value),
		}
	}

	fn install(&self, key: K, value: Arc<V>, ttl_override: Option<Duration>) {
		let now = Instant::now();
		self.evict_if_full(&key);

		let cell = self.wrap_value(value);
		let entry = match ttl_override {
			Some(ttl) => Entry::with_ttl_override(cell, now, ttl),
			None => Entry::new(cell, now),
		};
		self.inner.entries.insert(key.clone(), entry);
		// Every tracker's `on_insert` is idempotent for an already-tracked
		// key, so a `put` that overwrites an existing entry is reported the
		// same way as a brand-new one.
		self.inner.eviction.on_insert(&key);
	}

	fn evict_if_full(&self, incoming_key: &K) {
		let max_size = self.inner.config.max_size;
		if max_size == 0 || self.inner.entries.contains_key(incoming_key) {
			return;
		}
		if (self.inner.entries.len() as u64) < max_size {
			return;
		}
		if let Some(victim) = self.inner.eviction.select_victim() {
			self.remove_entry(&victim, 1);
		}
		// §4.D: an empty tracker (select_victim returns None) means the put
		// simply proceeds without eviction.
	}

	fn remove_entry(&self, key: &K, eviction_count: u64) {
		if self.inner.entries.remove(key).is_some() {
			self.inner.eviction.on_remove(key);
			if eviction_count > 0 {
				self.inner.metrics.record_eviction(eviction_count);
			}
		}
	}

	/// Installs `value` for `key`, evicting a victim first if at capacity,
	/// then notifying the writer per the configured write strategy.
	#[instrument(skip(self, value), fields(cache = %self.inner.config.cache_name))]
	pub async fn put(&self, key: K, value: V) -> Result<()> {
		self.ensure_open()?;
		let value = Arc::new(value);
		self.apply_write_strategy(&key, Some(Arc::clone(&value))).await?;
		self.install(key, value, None);
		self.inner.metrics.record_put();
		Ok(())
	}

	/// As [`Self::put`], but `ttl` replaces the cache-wide access TTL for
	/// expiry checks against this one entry (§4.I `putWithTtl`).
	pub async fn put_with_ttl(&self, key: K, value: V, ttl: Duration) -> Result<()> {
		self.ensure_open()?;
		let value = Arc::new(value);
		self.apply_write_strategy(&key, Some(Arc::clone(&value))).await?;
		self.install(key, value, Some(ttl));
		self.inner.metrics.record_put();
		Ok(())
	}

	async fn apply_write_strategy(&self, key: &K, value: Option<Arc<V>>) -> Result<()> {
		match (self.inner.config.write_strategy, value) {
			(WriteStrategy::ReadOnly, _) => Ok(()),
			(WriteStrategy::WriteThrough, Some(value)) => {
				let writer = self.inner.writer.clone().expect("validated at construction");
				writer.write(key, value.as_ref()).await
			},
			(WriteStrategy::WriteThrough, None) => {
				let writer = self.inner.writer.clone().expect("validated at construction");
				writer.delete(key).await
			},
			(WriteStrategy::WriteBehind, Some(value)) => {
				self.inner.write_behind.as_ref().expect("validated at construction").enqueue_put(key.clone(), value);
				Ok(())
			},
			(WriteStrategy::WriteBehind, None) => {
				self.inner.write_behind.as_ref().expect("validated at construction").enqueue_remove(key.clone());
				Ok(())
			},
		}
	}

	/// Removes `key`, notifying the writer per write strategy.
	pub async fn invalidate(&self, key: K) -> Result<()> {
		self.ensure_open()?;
		self.apply_write_strategy(&key, None).await?;
		let existed = self.inner.entries.remove(&key).is_some();
		if existed {
			self.inner.eviction.on_remove(&key);
			self.inner.metrics.record_remove();
		}
		Ok(())
	}

	/// Clears every entry and the eviction tracker. Metrics are unchanged.
	pub fn invalidate_all(&self) {
		self.inner.entries.clear();
		self.inner.eviction.clear();
	}

	pub fn size(&self) -> usize {
		self.inner.entries.len()
	}

	pub fn max_size(&self) -> u64 {
		self.inner.config.max_size
	}

	pub fn contains_key(&self, key: &K) -> bool {
		self.inner.entries.contains_key(key)
	}

	/// Bulk-installs every value the loader knows about, bypassing eviction
	/// until all entries are installed (a `warmUp` burst should not evict
	/// the very entries it is installing).
	pub async fn warm_up(&self) -> Result<usize> {
		self.ensure_open()?;
		let Some(loader) = self.inner.loader.clone() else { return Ok(0) };
		let values = loader.load_all().await?;
		let count = values.len();
		let now = Instant::now();
		for (key, value) in values {
			let cell = self.wrap_value(Arc::new(value));
			self.inner.entries.insert(key.clone(), Entry::new(cell, now));
			self.inner.eviction.on_insert(&key);
		}
		Ok(count)
	}

	/// Stops accepting new background work, flushes write-behind with
	/// retries up to `deadline`, and marks the cache closed. Returns the
	/// number of write-behind items discarded after the deadline elapsed.
	pub async fn close(&self, deadline: Duration) -> usize {
		self.inner.shut_down.store(true, Ordering::Release);

		let mut workers = self.inner.workers.lock().await;
		for handle in workers.drain(..) {
			handle.abort();
		}
		drop(workers);

		let Some(write_behind) = &self.inner.write_behind else { return 0 };
		let Some(writer) = &self.inner.writer else { return 0 };
		let adapter = WriteBehindAdapter { inner: Arc::clone(writer) };
		let policy = self.write_behind_policy();
		let outcomes = write_behind.flush(&adapter, &policy, deadline).await;
		outcomes.iter().filter(|o| matches!(o, DrainOutcome::Lost(_))).count()
	}

	fn write_behind_policy(&self) -> WriteBehindPolicy {
		WriteBehindPolicy {
			batch_size: self.inner.config.write_behind_batch_size,
			drain_interval: self.inner.config.write_behind_delay,
			max_retries: self.inner.config.write_behind_max_retries,
			retry_delay: self.inner.config.write_behind_retry_delay,
		}
	}

	async fn write_behind_loop(&self) {
		let policy = self.write_behind_policy();
		loop {
			if self.inner.shut_down.load(Ordering::Acquire) {
				return;
			}
			time::sleep(policy.drain_interval.max(Duration::from_millis(1))).await;
			if let (Some(queue), Some(writer)) = (&self.inner.write_behind, &self.inner.writer) {
				let adapter = WriteBehindAdapter { inner: Arc::clone(writer) };
				queue.drain_batch(&adapter, &policy).await;
			}
		}
	}

	async fn cleanup_loop(&self, interval: Duration) {
		loop {
			if self.inner.shut_down.load(Ordering::Acquire) {
				return;
			}
			time::sleep(interval).await;
			self.sweep_expired();
		}
	}

	fn sweep_expired(&self) {
		let now = Instant::now();
		let expired: Vec<K> = self
			.inner
			.entries
			.iter()
			.filter(|entry| {
				self.inner.expiration.is_expired_with_override(
					now,
					entry.last_access(),
					entry.installed_at(),
					entry.access_ttl_override(),
				) || entry.is_cleared()
			})
			.map(|entry| entry.key().clone())
			.collect();

		let count = expired.len();
		for key in &expired {
			self.remove_entry(key, 0);
		}
		if count > 0 {
			self.inner.metrics.record_eviction(count as u64);
			debug!(count, "cleanup swept expired entries");
		}
	}

	/// Background reclaimer (§4.C / §9): periodically releases Soft cells'
	/// strong guard and checks every cell for clearance, removing any entry
	/// whose value has been reclaimed or dropped by an external owner. Only
	/// spawned when `reference_type` is Soft or Weak — a Strong-only cache
	/// has nothing for this worker to find.
	async fn reclaim_loop(&self, interval: Duration) {
		loop {
			if self.inner.shut_down.load(Ordering::Acquire) {
				return;
			}
			time::sleep(interval).await;
			self.sweep_reclaimed();
		}
	}

	fn sweep_reclaimed(&self) {
		let cleared: Vec<K> = self
			.inner
			.entries
			.iter()
			.filter_map(|entry| {
				entry.reclaim();
				entry.is_cleared().then(|| entry.key().clone())
			})
			.collect();

		let count = cleared.len();
		for key in &cleared {
			self.remove_entry(key, 1);
		}
		if count > 0 {
			debug!(count, "background reclaimer removed cleared soft/weak entries");
		}
	}

	/// Takes a snapshot of the live metrics counters.
	pub fn metrics_snapshot(&self) -> MetricsSnapshot {
		self.inner.metrics.snapshot()
	}

	/// Evaluates the current metrics against `thresholds`.
	pub fn health(&self, thresholds: &HealthThresholds) -> HealthVerdict {
		HealthVerdict::evaluate(&self.inner.metrics.snapshot(), thresholds)
	}

	pub fn cache_name(&self) -> &str {
		&self.inner.config.cache_name
	}

	pub fn reset_metrics(&self) {
		self.inner.metrics.reset();
	}

	/// Assembles the admin/observation surface (§4.K): size, capacity, and
	/// metrics, bundled for snapshot/health/summary rendering.
	pub fn admin(&self) -> crate::admin::AdminView<'_> {
		crate::admin::AdminView {
			cache_name: &self.inner.config.cache_name,
			current_size: self.size() as u64,
			max_size: self.inner.config.max_size,
			metrics: self.inner.metrics.snapshot(),
		}
	}
}

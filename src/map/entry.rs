//! The per-key record owned exclusively by the cache map (§3 Data Model).

// std
use std::{
	sync::{atomic::{AtomicU64, Ordering}, Arc},
	time::Duration,
};
// tokio
use tokio::time::Instant;

use crate::cell::ValueCell;
use crate::clock::AtomicInstant;

/// One live cache record.
///
/// `installed_at` is fixed at first `put` and anchors the absolute TTL; it
/// is never touched again, including by a successful refresh-ahead replace —
/// that is what "refresh-ahead does not extend absolute expiry" means in
/// practice. `created_at` is the value's own freshness stamp: it starts
/// equal to `installed_at` but moves forward on every successful refresh,
/// which is also what the [`super::EvictionPolicy`] Age tracker keys off of.
pub struct Entry<V> {
	cell: ValueCell<V>,
	installed_at: Instant,
	created_at: AtomicInstant,
	last_access: AtomicInstant,
	access_count: AtomicU64,
	/// Set by `putWithTtl`; when present, replaces the cache-wide access TTL
	/// for expiry checks against this entry only.
	access_ttl_override: Option<Duration>,
}

impl<V> Entry<V> {
	/// Installs a brand-new entry at `now`.
	pub fn new(cell: ValueCell<V>, now: Instant) -> Self {
		Self {
			cell,
			installed_at: now,
			created_at: AtomicInstant::new(now, now),
			last_access: AtomicInstant::new(now, now),
			access_count: AtomicU64::new(0),
			access_ttl_override: None,
		}
	}

	/// As [`Self::new`], with a per-entry access TTL overriding the
	/// cache-wide policy (§4.I `putWithTtl`).
	pub fn with_ttl_override(cell: ValueCell<V>, now: Instant, ttl: Duration) -> Self {
		Self { access_ttl_override: Some(ttl), ..Self::new(cell, now) }
	}

	pub fn access_ttl_override(&self) -> Option<Duration> {
		self.access_ttl_override
	}

	/// Reads the value if it is still live, bumping access bookkeeping.
	pub fn touch_and_get(&self) -> Option<Arc<V>> {
		self.last_access.touch();
		self.access_count.fetch_add(1, Ordering::Relaxed);
		self.cell.try_get()
	}

	/// Reads the value without affecting access bookkeeping (used by
	/// diagnostics and by the cleanup sweep's expiry check).
	pub fn peek(&self) -> Option<Arc<V>> {
		self.cell.try_get()
	}

	pub fn is_cleared(&self) -> bool {
		self.cell.is_cleared()
	}

	/// Releases a Soft cell's strong guard; no-op for Strong/Weak. Called by
	/// the background reclaimer before it checks `is_cleared`.
	pub fn reclaim(&self) -> bool {
		self.cell.reclaim()
	}

	pub fn installed_at(&self) -> Instant {
		self.installed_at
	}

	pub fn created_at(&self) -> Instant {
		self.created_at.load().unwrap_or(self.installed_at)
	}

	pub fn last_access(&self) -> Instant {
		self.last_access.load().unwrap_or(self.installed_at)
	}

	pub fn access_count(&self) -> u64 {
		self.access_count.load(Ordering::Relaxed)
	}

	/// Applies a successful refresh-ahead (or write-through overwrite via
	/// `put`) result: the value is replaced and `created_at` advances, but
	/// `installed_at` — and thus the absolute expiry deadline — is untouched.
	pub fn replace_value(&mut self, cell: ValueCell<V>, now: Instant) {
		self.cell = cell;
		self.created_at.store(now);
	}
}

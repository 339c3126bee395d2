//! Refresh-ahead scheduler (§4.G): proactive re-fetch before expiry.
//!
//! Eligibility is evaluated lazily on access rather than by a global sweep,
//! per the design notes. This module only owns the per-key "is a refresh
//! already running" guard and the eligibility arithmetic; the orchestrator
//! in [`crate::map`] decides when to consult it and performs the actual
//! load and value replacement.

// std
use std::{hash::Hash, time::Duration};
// crates.io
use dashmap::DashSet;
// tokio
use tokio::time::Instant;

/// Tracks which keys currently have a refresh in flight, so at most one
/// refresh task per key runs at a time.
pub struct RefreshGuard<K> {
	in_flight: DashSet<K>,
}

impl<K: Eq + Hash + Clone> RefreshGuard<K> {
	pub fn new() -> Self {
		Self { in_flight: DashSet::new() }
	}

	/// Attempts to claim `key` for a refresh. Returns `true` if this caller
	/// is now responsible for running it (and must call [`Self::finish`]
	/// when done), `false` if a refresh for `key` is already running.
	pub fn try_begin(&self, key: &K) -> bool {
		self.in_flight.insert(key.clone())
	}

	/// Releases the claim on `key` once its refresh has completed.
	pub fn finish(&self, key: &K) {
		self.in_flight.remove(key);
	}

	/// Number of refreshes currently running.
	pub fn len(&self) -> usize {
		self.in_flight.len()
	}
}

impl<K: Eq + Hash + Clone> Default for RefreshGuard<K> {
	fn default() -> Self {
		Self::new()
	}
}

/// `elapsedAccessAge ≥ f · accessTtl` — §4.G eligibility test.
pub fn is_refresh_eligible(now: Instant, last_access: Instant, access_ttl: Duration, factor: f64) -> bool {
	let elapsed = now.saturating_duration_since(last_access);
	let threshold = access_ttl.mul_f64(factor);
	elapsed >= threshold
}

//! Monotonic clock helpers and the per-entry expiration policy.
//!
//! The engine never reads wall-clock time on the hot path: every expiry and
//! metrics-timestamp computation is derived from [`tokio::time::Instant`],
//! encoded where needed as a nanosecond offset from a fixed per-process
//! epoch so it can live in an `AtomicU64` without locking.

// std
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
// tokio
use tokio::time::Instant;

/// Sentinel stored in an offset field meaning "never set".
pub const NEVER: u64 = u64::MAX;

/// Encodes `instant` as a nanosecond offset from `epoch`.
///
/// Panics in debug builds if `instant` precedes `epoch`; callers only ever
/// pass instants observed after the epoch was captured.
pub fn instant_as_offset(epoch: Instant, instant: Instant) -> u64 {
	let elapsed = instant.saturating_duration_since(epoch);
	elapsed.as_secs().saturating_mul(1_000_000_000).saturating_add(u64::from(elapsed.subsec_nanos()))
}

/// Inverse of [`instant_as_offset`].
pub fn instant_from_offset(epoch: Instant, offset_nanos: u64) -> Instant {
	let secs = offset_nanos / 1_000_000_000;
	let subsec_nanos = (offset_nanos % 1_000_000_000) as u32;
	epoch + Duration::new(secs, subsec_nanos)
}

/// Lock-free holder of an `Option<Instant>`, encoded against a shared epoch.
///
/// Used for `last_access`, `last_write`, and similar per-entry timestamps
/// that are updated far more often than they are read.
#[derive(Debug)]
pub struct AtomicInstant {
	epoch: Instant,
	offset: AtomicU64,
}

impl AtomicInstant {
	/// Creates a holder with no timestamp recorded yet.
	pub fn none(epoch: Instant) -> Self {
		Self { epoch, offset: AtomicU64::new(NEVER) }
	}

	/// Creates a holder already set to `instant`.
	pub fn new(epoch: Instant, instant: Instant) -> Self {
		Self { epoch, offset: AtomicU64::new(instant_as_offset(epoch, instant)) }
	}

	/// Stores `instant`, ordered `Release` so readers that `Acquire`-load see
	/// any writes that happened-before the store.
	pub fn store(&self, instant: Instant) {
		self.offset.store(instant_as_offset(self.epoch, instant), Ordering::Release);
	}

	/// Stores "now".
	pub fn touch(&self) {
		self.store(Instant::now());
	}

	/// Loads the recorded instant, or `None` if never set.
	pub fn load(&self) -> Option<Instant> {
		match self.offset.load(Ordering::Acquire) {
			NEVER => None,
			offset => Some(instant_from_offset(self.epoch, offset)),
		}
	}
}

/// Per-entry expiration rule, derived from [`crate::config::CacheConfig`].
///
/// `access_ttl` expires an entry `ttl` after it was last read or written;
/// `absolute_ttl` expires an entry `ttl` after it was *installed*,
/// independent of access or of any later refresh-ahead replacement. A
/// configuration may carry either, both, or neither; an entry with neither
/// never expires on its own (it can still be evicted).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpirationPolicy {
	/// Time-to-live measured from the most recent access (read or write).
	pub access_ttl: Option<Duration>,
	/// Time-to-live measured from the entry's original installation.
	pub absolute_ttl: Option<Duration>,
}

impl ExpirationPolicy {
	/// Returns whether an entry last accessed at `last_access` and
	/// originally installed at `installed_at` is expired as of `now`.
	pub fn is_expired(&self, now: Instant, last_access: Instant, installed_at: Instant) -> bool {
		self.is_expired_with_override(now, last_access, installed_at, None)
	}

	/// As [`Self::is_expired`], but `access_override` — when present —
	/// replaces the cache-wide `access_ttl` for this one check. Used for
	/// entries installed via `putWithTtl`.
	pub fn is_expired_with_override(
		&self,
		now: Instant,
		last_access: Instant,
		installed_at: Instant,
		access_override: Option<Duration>,
	) -> bool {
		let access_ttl = access_override.or(self.access_ttl);
		let access_expired = access_ttl.is_some_and(|ttl| now.saturating_duration_since(last_access) >= ttl);
		let absolute_expired =
			self.absolute_ttl.is_some_and(|ttl| now.saturating_duration_since(installed_at) >= ttl);

		access_expired || absolute_expired
	}

	/// Returns `true` if this policy can ever expire an entry.
	pub fn is_bounded(&self) -> bool {
		self.access_ttl.is_some() || self.absolute_ttl.is_some()
	}
}

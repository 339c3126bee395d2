//! Lock-free metrics counters, snapshots, and health-verdict gating.
//!
//! Mirrors the teacher's `ProviderMetrics` / `ProviderMetricsSnapshot` split:
//! a live struct of [`AtomicU64`] counters that every call site bumps with a
//! relaxed fetch-add, and an immutable [`MetricsSnapshot`] taken off it for
//! reporting and diffing.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use serde::{Deserialize, Serialize};
// tokio
use tokio::time::Instant;

use crate::clock::instant_as_offset;

/// Live, shareable counter bank for one cache instance.
///
/// All operations are a single atomic fetch-add; there is no cross-counter
/// atomicity, so a snapshot may transiently show `requests` one ahead of
/// `hits + misses` — this is expected and documented, not a bug.
#[derive(Debug)]
pub struct CacheMetrics {
	epoch: Instant,
	requests: AtomicU64,
	hits: AtomicU64,
	misses: AtomicU64,
	load_success: AtomicU64,
	load_failure: AtomicU64,
	total_load_nanos: AtomicU64,
	evictions: AtomicU64,
	puts: AtomicU64,
	removes: AtomicU64,
}

impl CacheMetrics {
	/// Creates a zeroed counter bank anchored to `epoch` for timestamp encoding.
	pub fn new(epoch: Instant) -> Self {
		Self {
			epoch,
			requests: AtomicU64::new(0),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			load_success: AtomicU64::new(0),
			load_failure: AtomicU64::new(0),
			total_load_nanos: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
			puts: AtomicU64::new(0),
			removes: AtomicU64::new(0),
		}
	}

	/// Records a cache hit (and the implicit request).
	pub fn record_hit(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	/// Records a cache miss (and the implicit request).
	pub fn record_miss(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	/// Records a successful loader invocation that took `nanos`.
	pub fn record_load_success(&self, nanos: u64) {
		self.load_success.fetch_add(1, Ordering::Relaxed);
		self.total_load_nanos.fetch_add(nanos, Ordering::Relaxed);
	}

	/// Records a failed loader invocation.
	pub fn record_load_failure(&self) {
		self.load_failure.fetch_add(1, Ordering::Relaxed);
	}

	/// Records `n` evictions (cleanup and capacity-driven alike).
	pub fn record_eviction(&self, n: u64) {
		self.evictions.fetch_add(n, Ordering::Relaxed);
	}

	/// Records a `put`.
	pub fn record_put(&self) {
		self.puts.fetch_add(1, Ordering::Relaxed);
	}

	/// Records an `invalidate`/`remove`.
	pub fn record_remove(&self) {
		self.removes.fetch_add(1, Ordering::Relaxed);
	}

	/// Takes an immutable copy of all counters, timestamped now.
	pub fn snapshot(&self) -> MetricsSnapshot {
		MetricsSnapshot {
			timestamp_nanos: instant_as_offset(self.epoch, Instant::now()),
			requests: self.requests.load(Ordering::Relaxed),
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			load_success: self.load_success.load(Ordering::Relaxed),
			load_failure: self.load_failure.load(Ordering::Relaxed),
			total_load_nanos: self.total_load_nanos.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
			puts: self.puts.load(Ordering::Relaxed),
			removes: self.removes.load(Ordering::Relaxed),
		}
	}

	/// Resets every counter to zero.
	pub fn reset(&self) {
		self.requests.store(0, Ordering::Relaxed);
		self.hits.store(0, Ordering::Relaxed);
		self.misses.store(0, Ordering::Relaxed);
		self.load_success.store(0, Ordering::Relaxed);
		self.load_failure.store(0, Ordering::Relaxed);
		self.total_load_nanos.store(0, Ordering::Relaxed);
		self.evictions.store(0, Ordering::Relaxed);
		self.puts.store(0, Ordering::Relaxed);
		self.removes.store(0, Ordering::Relaxed);
	}
}

/// Immutable copy of [`CacheMetrics`] at one instant, with derived rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
	/// Nanoseconds since this cache instance's epoch. Monotonic within an
	/// instance; not a wall-clock value and not comparable across instances.
	pub timestamp_nanos: u64,
	pub requests: u64,
	pub hits: u64,
	pub misses: u64,
	pub load_success: u64,
	pub load_failure: u64,
	pub total_load_nanos: u64,
	pub evictions: u64,
	pub puts: u64,
	pub removes: u64,
}

impl MetricsSnapshot {
	/// `hits / max(1, hits + misses)`.
	pub fn hit_rate(&self) -> f64 {
		self.hits as f64 / (self.hits + self.misses).max(1) as f64
	}

	/// `misses / max(1, hits + misses)`.
	pub fn miss_rate(&self) -> f64 {
		self.misses as f64 / (self.hits + self.misses).max(1) as f64
	}

	/// `loadFailure / max(1, loadSuccess + loadFailure)`.
	pub fn failure_rate(&self) -> f64 {
		self.load_failure as f64 / (self.load_success + self.load_failure).max(1) as f64
	}

	/// `totalLoadNanos / max(1, loadSuccess)`.
	pub fn average_load_nanos(&self) -> u64 {
		self.total_load_nanos / self.load_success.max(1)
	}

	/// Component-wise positive difference against an earlier snapshot,
	/// keeping the later (`self`'s) timestamp. Negative deltas (a counter
	/// appearing to have gone backwards, e.g. after a `reset()` raced the
	/// read) are clamped to zero rather than wrapping.
	pub fn diff(&self, earlier: &Self) -> Self {
		Self {
			timestamp_nanos: self.timestamp_nanos.max(earlier.timestamp_nanos),
			requests: self.requests.saturating_sub(earlier.requests),
			hits: self.hits.saturating_sub(earlier.hits),
			misses: self.misses.saturating_sub(earlier.misses),
			load_success: self.load_success.saturating_sub(earlier.load_success),
			load_failure: self.load_failure.saturating_sub(earlier.load_failure),
			total_load_nanos: self.total_load_nanos.saturating_sub(earlier.total_load_nanos),
			evictions: self.evictions.saturating_sub(earlier.evictions),
			puts: self.puts.saturating_sub(earlier.puts),
			removes: self.removes.saturating_sub(earlier.removes),
		}
	}
}

/// Thresholds gating a [`HealthVerdict`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
	pub min_hit_rate: f64,
	pub max_failure_rate: f64,
	pub max_avg_load_millis: u64,
	pub min_samples: u64,
}

impl HealthThresholds {
	/// `minHitRate=0.60, maxFailureRate=0.10, maxAvgLoadMs=100, minSamples=10`.
	pub const fn default_preset() -> Self {
		Self { min_hit_rate: 0.60, max_failure_rate: 0.10, max_avg_load_millis: 100, min_samples: 10 }
	}

	/// `minHitRate=0.80, maxFailureRate=0.05, maxAvgLoadMs=50, minSamples=10`.
	pub const fn strict() -> Self {
		Self { min_hit_rate: 0.80, max_failure_rate: 0.05, max_avg_load_millis: 50, min_samples: 10 }
	}

	/// `minHitRate=0.40, maxFailureRate=0.20, maxAvgLoadMs=500, minSamples=10`.
	pub const fn relaxed() -> Self {
		Self { min_hit_rate: 0.40, max_failure_rate: 0.20, max_avg_load_millis: 500, min_samples: 10 }
	}
}

impl Default for HealthThresholds {
	fn default() -> Self {
		Self::default_preset()
	}
}

/// Overall health status; `Down` iff `errors` is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
	Up,
	Down,
}

/// Result of gating a [`MetricsSnapshot`] against [`HealthThresholds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthVerdict {
	pub status: HealthStatus,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
	pub info: Vec<String>,
}

impl HealthVerdict {
	/// Evaluates `snapshot` against `thresholds`, per spec §4.B / §8 S7.
	pub fn evaluate(snapshot: &MetricsSnapshot, thresholds: &HealthThresholds) -> Self {
		let mut errors = Vec::new();
		let mut warnings = Vec::new();
		let mut info = Vec::new();

		if snapshot.requests < thresholds.min_samples {
			info.push(format!(
				"Sample size {} is below the minimum of {} to draw conclusions",
				snapshot.requests, thresholds.min_samples
			));
		}
		if snapshot.hit_rate() < thresholds.min_hit_rate {
			warnings.push(format!(
				"Low hit rate: {:.2} is below the threshold of {:.2}",
				snapshot.hit_rate(),
				thresholds.min_hit_rate
			));
		}
		if snapshot.failure_rate() > thresholds.max_failure_rate {
			errors.push(format!(
				"High load failure rate: {:.2} exceeds the threshold of {:.2}",
				snapshot.failure_rate(),
				thresholds.max_failure_rate
			));
		}
		let avg_load_millis = snapshot.average_load_nanos() / 1_000_000;
		if avg_load_millis > thresholds.max_avg_load_millis {
			warnings.push(format!(
				"High average load time: {}ms exceeds the threshold of {}ms",
				avg_load_millis, thresholds.max_avg_load_millis
			));
		}

		let status = if errors.is_empty() { HealthStatus::Up } else { HealthStatus::Down };
		Self { status, errors, warnings, info }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_metrics() -> CacheMetrics {
		CacheMetrics::new(Instant::now())
	}

	#[test]
	fn hit_rate_and_failure_rate_are_derived_on_read() {
		let metrics = sample_metrics();
		metrics.record_hit();
		metrics.record_hit();
		metrics.record_miss();
		metrics.record_load_success(1_000_000);
		metrics.record_load_failure();

		let snapshot = metrics.snapshot();
		assert_eq!(snapshot.requests, 3);
		assert!((snapshot.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
		assert!((snapshot.failure_rate() - 0.5).abs() < 1e-9);
		assert_eq!(snapshot.average_load_nanos(), 1_000_000);
	}

	#[test]
	fn snapshot_diff_matches_scenario_s6() {
		let metrics = sample_metrics();
		metrics.record_hit();
		metrics.record_hit();
		metrics.record_miss();
		let snapshot_a = metrics.snapshot();

		metrics.record_hit();
		metrics.record_miss();
		metrics.record_miss();
		let snapshot_b = metrics.snapshot();

		let delta = snapshot_b.diff(&snapshot_a);
		assert_eq!(delta.hits, 1);
		assert_eq!(delta.misses, 2);
		assert_eq!(delta.requests, 3);
		assert!((delta.hit_rate() - (1.0 / 3.0)).abs() < 1e-9);
	}

	#[test]
	fn reset_zeroes_every_counter() {
		let metrics = sample_metrics();
		metrics.record_hit();
		metrics.record_put();
		metrics.reset();

		let snapshot = metrics.snapshot();
		assert_eq!(snapshot.requests, 0);
		assert_eq!(snapshot.puts, 0);
	}

	#[test]
	fn default_preset_flags_low_hit_rate_scenario_s7() {
		let metrics = sample_metrics();
		for _ in 0..30 {
			metrics.record_hit();
		}
		for _ in 0..70 {
			metrics.record_miss();
		}
		metrics.record_load_success(10_000_000);

		let verdict = HealthVerdict::evaluate(&metrics.snapshot(), &HealthThresholds::default_preset());
		assert_eq!(verdict.status, HealthStatus::Up);
		assert!(verdict.errors.is_empty());
		assert!(!verdict.warnings.is_empty());
	}

	#[test]
	fn strict_preset_flags_what_relaxed_tolerates() {
		let metrics = sample_metrics();
		for _ in 0..70 {
			metrics.record_hit();
		}
		for _ in 0..30 {
			metrics.record_miss();
		}

		let snapshot = metrics.snapshot();
		let strict_verdict = HealthVerdict::evaluate(&snapshot, &HealthThresholds::strict());
		let relaxed_verdict = HealthVerdict::evaluate(&snapshot, &HealthThresholds::relaxed());

		assert!(!strict_verdict.warnings.is_empty());
		assert!(relaxed_verdict.warnings.is_empty());
	}

	#[test]
	fn high_failure_rate_brings_the_cache_down() {
		let metrics = sample_metrics();
		for _ in 0..20 {
			metrics.record_load_success(0);
		}
		for _ in 0..5 {
			metrics.record_load_failure();
		}

		let verdict = HealthVerdict::evaluate(&metrics.snapshot(), &HealthThresholds::default_preset());
		assert_eq!(verdict.status, HealthStatus::Down);
		assert!(!verdict.errors.is_empty());
	}
}

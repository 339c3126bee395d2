//! Bridges a cache's internal [`crate::metrics::MetricsSnapshot`] onto the
//! `metrics` crate's global recorder, and optionally installs the bundled
//! Prometheus exporter. Unlike the always-on atomic counters in
//! [`crate::metrics`], everything here is inert unless a recorder is
//! installed — publishing to an uninstalled recorder is a documented no-op.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use metrics::Label;
use smallvec::SmallVec;

use crate::metrics::MetricsSnapshot;

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

type LabelSet = SmallVec<[Label; 2]>;

const METRIC_REQUESTS_TOTAL: &str = "concache_requests_total";
const METRIC_HITS_TOTAL: &str = "concache_hits_total";
const METRIC_MISSES_TOTAL: &str = "concache_misses_total";
const METRIC_LOAD_FAILURES_TOTAL: &str = "concache_load_failures_total";
const METRIC_EVICTIONS_TOTAL: &str = "concache_evictions_total";
const METRIC_LOAD_DURATION: &str = "concache_load_duration_seconds";

#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the bundled Prometheus recorder. Safe to call more than once;
/// later calls after the first successful install are no-ops.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> crate::error::Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new().install_recorder().map_err(|err| crate::error::Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);
	Ok(())
}

/// Returns the installed Prometheus handle, if any.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Publishes the delta between `current` and the last snapshot seen by this
/// publisher as counter increments, tagged with `cache_name`.
///
/// Each call is independent; callers typically invoke this periodically
/// (e.g. from the same interval that drives the cleanup loop) rather than
/// per-operation, to keep label cardinality-sensitive recorders cheap.
pub struct MetricsPublisher {
	cache_name: String,
	last: AtomicSnapshot,
}

#[derive(Default)]
struct AtomicSnapshot {
	requests: AtomicU64,
	hits: AtomicU64,
	misses: AtomicU64,
	load_failures: AtomicU64,
	evictions: AtomicU64,
}

impl MetricsPublisher {
	pub fn new(cache_name: impl Into<String>) -> Self {
		Self { cache_name: cache_name.into(), last: AtomicSnapshot::default() }
	}

	/// Publishes the increase since the previous call as counter increments.
	pub fn publish(&self, current: &MetricsSnapshot) {
		let labels = self.labels();

		let requests_delta = delta(&self.last.requests, current.requests);
		let hits_delta = delta(&self.last.hits, current.hits);
		let misses_delta = delta(&self.last.misses, current.misses);
		let load_failures_delta = delta(&self.last.load_failures, current.load_failure);
		let evictions_delta = delta(&self.last.evictions, current.evictions);

		metrics::counter!(METRIC_REQUESTS_TOTAL, labels.iter()).increment(requests_delta);
		metrics::counter!(METRIC_HITS_TOTAL, labels.iter()).increment(hits_delta);
		metrics::counter!(METRIC_MISSES_TOTAL, labels.iter()).increment(misses_delta);
		metrics::counter!(METRIC_LOAD_FAILURES_TOTAL, labels.iter()).increment(load_failures_delta);
		metrics::counter!(METRIC_EVICTIONS_TOTAL, labels.iter()).increment(evictions_delta);
		metrics::histogram!(METRIC_LOAD_DURATION, labels.iter())
			.record(current.average_load_nanos() as f64 / 1_000_000_000.0);
	}

	fn labels(&self) -> LabelSet {
		let mut labels = LabelSet::new();
		labels.push(Label::new("cache_name", self.cache_name.clone()));
		labels
	}
}

/// Stores `current` and returns how much higher it is than the previously
/// stored value; never goes negative (a counter reset is reported as 0).
fn delta(slot: &AtomicU64, current: u64) -> u64 {
	let previous = slot.swap(current, Ordering::Relaxed);
	current.saturating_sub(previous)
}

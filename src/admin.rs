//! Observation/admin surface (§4.K): the stable, externally-facing view of a
//! running cache — size, metrics, health, and a JSON rendering with the
//! field names hierarchical monitoring systems expect, distinct from the
//! Rust-native [`crate::metrics::MetricsSnapshot`] used for in-process diffing.

// std
use std::time::Duration;
// crates.io
use serde::{Deserialize, Serialize};

use crate::{
	error::Result,
	metrics::{HealthThresholds, HealthVerdict, MetricsSnapshot},
};

/// Characters replaced with `_` when a cache name is exposed to a
/// hierarchical namespace (e.g. a management identifier).
const RESERVED_CHARS: [char; 6] = [':', ',', '=', '"', '*', '?'];

/// Replaces every reserved character in `name` with an underscore.
pub fn sanitize_identifier(name: &str) -> String {
	name.chars().map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c }).collect()
}

/// Builds `<domain>:type=<type>,name=<sanitized-cache-name>`.
pub fn management_identifier(domain: &str, type_name: &str, cache_name: &str) -> String {
	format!("{domain}:type={type_name},name={}", sanitize_identifier(cache_name))
}

/// Stable external JSON shape for a metrics snapshot.
///
/// Field names are fixed by the external interface and intentionally do not
/// follow Rust naming conventions (`cacheName`, not `cache_name`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshotView {
	#[serde(rename = "cacheName")]
	pub cache_name: String,
	pub timestamp: u64,
	#[serde(rename = "requestCount")]
	pub request_count: u64,
	#[serde(rename = "hitCount")]
	pub hit_count: u64,
	#[serde(rename = "missCount")]
	pub miss_count: u64,
	#[serde(rename = "loadSuccessCount")]
	pub load_success_count: u64,
	#[serde(rename = "loadFailureCount")]
	pub load_failure_count: u64,
	#[serde(rename = "evictionCount")]
	pub eviction_count: u64,
	#[serde(rename = "hitRate")]
	pub hit_rate: f64,
	#[serde(rename = "missRate")]
	pub miss_rate: f64,
	#[serde(rename = "averageLoadTimeMillis")]
	pub average_load_time_millis: u64,
	#[serde(rename = "totalLoadTimeMillis")]
	pub total_load_time_millis: u64,
	#[serde(rename = "currentSize")]
	pub current_size: u64,
	#[serde(rename = "maxSize")]
	pub max_size: u64,
	#[serde(rename = "fillPercent")]
	pub fill_percent: f64,
}

impl CacheSnapshotView {
	/// Assembles the external view from a cache's name, capacity, and raw
	/// metrics snapshot.
	pub fn new(cache_name: &str, current_size: u64, max_size: u64, snapshot: &MetricsSnapshot) -> Self {
		let fill_percent = if max_size == 0 { -1.0 } else { 100.0 * current_size as f64 / max_size as f64 };

		Self {
			cache_name: cache_name.to_string(),
			timestamp: snapshot.timestamp_nanos,
			request_count: snapshot.requests,
			hit_count: snapshot.hits,
			miss_count: snapshot.misses,
			load_success_count: snapshot.load_success,
			load_failure_count: snapshot.load_failure,
			eviction_count: snapshot.evictions,
			hit_rate: snapshot.hit_rate(),
			miss_rate: snapshot.miss_rate(),
			average_load_time_millis: snapshot.average_load_nanos() / 1_000_000,
			total_load_time_millis: snapshot.total_load_nanos / 1_000_000,
			current_size,
			max_size,
			fill_percent,
		}
	}

	/// Renders as a single-line, human-readable summary suitable for logs.
	pub fn summary(&self) -> String {
		format!(
			"{}: size={}/{} hitRate={:.1}% requests={} evictions={} avgLoad={}ms",
			self.cache_name,
			self.current_size,
			self.max_size,
			self.hit_rate * 100.0,
			self.request_count,
			self.eviction_count,
			self.average_load_time_millis,
		)
	}

	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(self)?)
	}
}

/// Full admin surface: snapshot, health, and a reset hook, as exposed by
/// [`crate::map::Cache::admin`].
pub struct AdminView<'a> {
	pub cache_name: &'a str,
	pub current_size: u64,
	pub max_size: u64,
	pub metrics: MetricsSnapshot,
}

impl<'a> AdminView<'a> {
	pub fn snapshot(&self) -> CacheSnapshotView {
		CacheSnapshotView::new(self.cache_name, self.current_size, self.max_size, &self.metrics)
	}

	pub fn health(&self, thresholds: &HealthThresholds) -> HealthVerdict {
		HealthVerdict::evaluate(&self.metrics, thresholds)
	}

	pub fn management_identifier(&self, domain: &str) -> String {
		management_identifier(domain, "Cache", self.cache_name)
	}
}

/// `average_load_time_millis` as a [`Duration`], for callers that prefer a
/// typed value over a raw millisecond count.
pub fn average_load_duration(snapshot: &CacheSnapshotView) -> Duration {
	Duration::from_millis(snapshot.average_load_time_millis)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_replaces_every_reserved_character() {
		assert_eq!(sanitize_identifier("tenant:a,b=\"c\"*d?"), "tenant_a_b__c__d_");
		assert_eq!(sanitize_identifier("plain-name"), "plain-name");
	}

	#[test]
	fn management_identifier_matches_the_documented_pattern() {
		let id = management_identifier("com.example.cache", "Cache", "sessions:v2");
		assert_eq!(id, "com.example.cache:type=Cache,name=sessions_v2");
	}

	#[test]
	fn fill_percent_is_negative_one_when_unbounded() {
		let snapshot = MetricsSnapshot {
			timestamp_nanos: 0,
			requests: 0,
			hits: 0,
			misses: 0,
			load_success: 0,
			load_failure: 0,
			total_load_nanos: 0,
			evictions: 0,
			puts: 0,
			removes: 0,
		};
		let view = CacheSnapshotView::new("c", 10, 0, &snapshot);
		assert_eq!(view.fill_percent, -1.0);
	}

	#[test]
	fn fill_percent_is_the_size_over_capacity_ratio() {
		let snapshot = MetricsSnapshot {
			timestamp_nanos: 0,
			requests: 0,
			hits: 0,
			misses: 0,
			load_success: 0,
			load_failure: 0,
			total_load_nanos: 0,
			evictions: 0,
			puts: 0,
			removes: 0,
		};
		let view = CacheSnapshotView::new("c", 25, 100, &snapshot);
		assert_eq!(view.fill_percent, 25.0);
	}

	#[test]
	fn summary_contains_the_cache_name_and_size() {
		let snapshot = MetricsSnapshot {
			timestamp_nanos: 0,
			requests: 10,
			hits: 8,
			misses: 2,
			load_success: 2,
			load_failure: 0,
			total_load_nanos: 4_000_000,
			evictions: 0,
			puts: 0,
			removes: 0,
		};
		let view = CacheSnapshotView::new("sessions", 3, 10, &snapshot);
		let summary = view.summary();
		assert!(summary.contains("sessions"));
		assert!(summary.contains("3/10"));
	}
}

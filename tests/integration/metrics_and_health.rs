//! End-to-end coverage of the metrics/health surface (§8 S6, S7), driven
//! entirely through the public `Cache<K, V>` API.

// std
use std::sync::Arc;
// crates.io
use async_trait::async_trait;
use concache::{Cache, CacheBuilder, Error, HealthStatus, HealthThresholds, Loader, Result};

struct FlakyLoader;

#[async_trait]
impl Loader<String, i32> for FlakyLoader {
	async fn load_one(&self, key: &String) -> Result<Option<i32>> {
		if key == "bad" {
			return Err(Error::LoadFailure("upstream rejected the request".into()));
		}
		Ok(Some(1))
	}
}

#[tokio::test]
async fn scenario_s6_metrics_diff_reports_only_the_activity_between_two_snapshots() {
	let cache: Cache<String, i32> = Cache::new(CacheBuilder::new("metrics-diff").build().unwrap()).unwrap();

	cache.put("a".to_string(), 1).await.unwrap();
	cache.get("a".to_string()).await.unwrap();
	let before = cache.metrics_snapshot();

	cache.get("a".to_string()).await.unwrap();
	cache.get("missing".to_string()).await.unwrap();
	let after = cache.metrics_snapshot();

	let delta = after.diff(&before);

	assert_eq!(delta.hits, 1);
	assert_eq!(delta.misses, 1);
	assert_eq!(delta.requests, 2);
}

#[tokio::test]
async fn scenario_s7_default_thresholds_flag_a_low_hit_rate_as_a_warning_not_down() {
	let cache: Cache<String, i32> = Cache::new(CacheBuilder::new("health-warning").build().unwrap()).unwrap();

	for i in 0..30 {
		cache.put(format!("k{i}"), i).await.unwrap();
	}
	for i in 0..30 {
		cache.get(format!("k{i}")).await.unwrap();
	}
	for i in 0..70 {
		cache.get(format!("missing-{i}")).await.unwrap();
	}

	let verdict = cache.health(&HealthThresholds::default_preset());

	assert_eq!(verdict.status, HealthStatus::Up);
	assert!(!verdict.warnings.is_empty());
}

#[tokio::test]
async fn scenario_s7_high_failure_rate_brings_the_cache_down() {
	let cache: Cache<String, i32> =
		Cache::with_collaborators(CacheBuilder::new("health-down").build().unwrap(), Some(Arc::new(FlakyLoader)), None).unwrap();

	for _ in 0..20 {
		cache.get("bad".to_string()).await.ok();
	}

	let verdict = cache.health(&HealthThresholds::default_preset());

	assert_eq!(verdict.status, HealthStatus::Down);
	assert!(!verdict.errors.is_empty());
}

#[tokio::test]
async fn admin_view_exposes_a_management_identifier_and_a_json_snapshot() {
	let cache: Cache<String, i32> = Cache::new(CacheBuilder::new("admin:surface").build().unwrap()).unwrap();
	cache.put("k".to_string(), 1).await.unwrap();
	cache.get("k".to_string()).await.unwrap();

	let admin = cache.admin();

	assert!(admin.management_identifier("com.example.cache").contains("name=admin_surface"));
	assert_eq!(admin.snapshot().current_size, 1);
	assert_eq!(admin.health(&HealthThresholds::relaxed()).status, HealthStatus::Up);
}

//! End-to-end coverage of the eviction and expiry literal scenarios, driven
//! entirely through the public `Cache<K, V>` API.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use async_trait::async_trait;
use concache::{Cache, CacheBuilder, Error, EvictionPolicyKind, Loader, Result, Writer};

struct StaticLoader {
	values: dashmap::DashMap<String, i32>,
}

#[async_trait]
impl Loader<String, i32> for StaticLoader {
	async fn load_one(&self, key: &String) -> Result<Option<i32>> {
		Ok(self.values.get(key).map(|v| *v))
	}
}

struct IdentityLoader {
	values: dashmap::DashMap<i32, String>,
}

#[async_trait]
impl Loader<i32, String> for IdentityLoader {
	async fn load_one(&self, key: &i32) -> Result<Option<String>> {
		Ok(self.values.get(key).map(|v| v.clone()))
	}
}

struct AlwaysFailingWriter;

#[async_trait]
impl Writer<String, i32> for AlwaysFailingWriter {
	async fn write(&self, _key: &String, _value: &i32) -> Result<()> {
		Err(Error::WriteFailure("downstream store rejected the write".into()))
	}

	async fn delete(&self, _key: &String) -> Result<()> {
		Ok(())
	}
}

#[tokio::test]
async fn scenario_s1_lru_eviction_keeps_the_recently_touched_key() {
	let config = CacheBuilder::new("s1-lru").max_size(2).eviction_policy(EvictionPolicyKind::Lru).build().unwrap();
	let cache: Cache<String, i32> = Cache::new(config).unwrap();

	cache.put("a".into(), 1).await.unwrap();
	cache.put("b".into(), 2).await.unwrap();
	cache.get("a".into()).await.unwrap();
	cache.put("c".into(), 3).await.unwrap();

	assert!(cache.contains_key(&"a".to_string()));
	assert!(!cache.contains_key(&"b".to_string()));
	assert!(cache.contains_key(&"c".to_string()));
	assert_eq!(cache.size(), 2);
}

#[tokio::test]
async fn scenario_s1_literal_loader_backed_keys_1_2_3_1_4() {
	let values = dashmap::DashMap::new();
	for key in [1, 2, 3, 4] {
		values.insert(key, format!("v{key}"));
	}
	let loader = Arc::new(IdentityLoader { values });

	let config = CacheBuilder::new("s1-literal").max_size(3).eviction_policy(EvictionPolicyKind::Lru).build().unwrap();
	let cache: Cache<i32, String> = Cache::with_collaborators(config, Some(loader), None).unwrap();

	for key in [1, 2, 3, 1, 4] {
		cache.get(key).await.unwrap();
	}

	assert_eq!(cache.size(), 3);
	assert!(cache.contains_key(&1));
	assert!(!cache.contains_key(&2));
	assert!(cache.contains_key(&3));
	assert!(cache.contains_key(&4));
	assert_eq!(cache.metrics_snapshot().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_s2_entries_expire_after_idle_access_ttl() {
	let config = CacheBuilder::new("s2-ttl").access_ttl(Duration::from_secs(30)).build().unwrap();
	let cache: Cache<String, i32> = Cache::new(config).unwrap();

	cache.put("k".into(), 1).await.unwrap();
	assert!(cache.get("k".into()).await.unwrap().is_some());

	tokio::time::advance(Duration::from_secs(31)).await;

	assert_eq!(cache.get("k".into()).await.unwrap(), None);
}

#[tokio::test]
async fn scenario_s4_write_through_failure_leaves_the_cache_unchanged() {
	let mut config = CacheBuilder::new("s4-write-through").build().unwrap();
	config.write_strategy = concache::WriteStrategy::WriteThrough;
	let cache: Cache<String, i32> = Cache::with_collaborators(config, None, Some(Arc::new(AlwaysFailingWriter))).unwrap();

	let result = cache.put("k".into(), 1).await;

	assert!(result.is_err());
	assert!(!cache.contains_key(&"k".to_string()));
	assert_eq!(cache.get("k".into()).await.unwrap(), None);
}

#[tokio::test]
async fn loader_backed_cache_fills_on_miss_and_serves_from_cache_after() {
	let values = dashmap::DashMap::new();
	values.insert("tenant-a".to_string(), 100);
	let loader = Arc::new(StaticLoader { values });

	let cache: Cache<String, i32> =
		Cache::with_collaborators(CacheBuilder::new("loader-backed").build().unwrap(), Some(loader), None).unwrap();

	assert_eq!(*cache.get("tenant-a".into()).await.unwrap().unwrap(), 100);
	assert_eq!(cache.get("unknown-tenant".into()).await.unwrap(), None);
}

//! End-to-end coverage of loader single-flight coalescing, driven entirely
//! through the public `Cache<K, V>` API.

// std
use std::sync::Arc;
// crates.io
use async_trait::async_trait;
use concache::{Cache, CacheBuilder, Loader, Result};

struct CountingLoader;

#[async_trait]
impl Loader<String, i32> for CountingLoader {
	async fn load_one(&self, _key: &String) -> Result<Option<i32>> {
		// Yield so concurrent callers actually overlap instead of serializing
		// through the loader one at a time.
		tokio::task::yield_now().await;
		Ok(Some(7))
	}
}

#[tokio::test]
async fn scenario_s3_fifty_concurrent_misses_share_a_single_load() {
	let loader = Arc::new(CountingLoader);
	let cache: Arc<Cache<String, i32>> = Arc::new(
		Cache::with_collaborators(CacheBuilder::new("single-flight").build().unwrap(), Some(loader.clone()), None).unwrap(),
	);

	let mut handles = Vec::new();
	for _ in 0..50 {
		let cache = Arc::clone(&cache);
		handles.push(tokio::spawn(async move { cache.get("shared-key".to_string()).await }));
	}

	for handle in handles {
		assert_eq!(*handle.await.unwrap().unwrap().unwrap(), 7);
	}

	assert_eq!(cache.size(), 1);
}

#[tokio::test]
async fn distinct_keys_do_not_coalesce_into_each_other() {
	let loader = Arc::new(CountingLoader);
	let cache: Arc<Cache<String, i32>> = Arc::new(
		Cache::with_collaborators(CacheBuilder::new("distinct-keys").build().unwrap(), Some(loader), None).unwrap(),
	);

	let a = tokio::spawn({
		let cache = Arc::clone(&cache);
		async move { cache.get("a".to_string()).await }
	});
	let b = tokio::spawn({
		let cache = Arc::clone(&cache);
		async move { cache.get("b".to_string()).await }
	});

	a.await.unwrap().unwrap();
	b.await.unwrap().unwrap();

	assert_eq!(cache.size(), 2);
}

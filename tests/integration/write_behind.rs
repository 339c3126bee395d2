//! End-to-end coverage of write-behind persistence (§8 S5), driven entirely
//! through the public `Cache<K, V>` API.

// std
use std::{
	sync::{
		atomic::{AtomicU32, Ordering},
		Arc,
	},
	time::Duration,
};
// crates.io
use async_trait::async_trait;
use concache::{Cache, CacheBuilder, Error, Result, Writer};

struct FlakyWriter {
	remaining_failures: AtomicU32,
	writes: dashmap::DashMap<String, i32>,
}

#[async_trait]
impl Writer<String, i32> for FlakyWriter {
	async fn write(&self, key: &String, value: &i32) -> Result<()> {
		let should_fail = self
			.remaining_failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None })
			.is_ok();
		if should_fail {
			return Err(Error::WriteFailure("downstream store briefly unavailable".into()));
		}
		self.writes.insert(key.clone(), *value);
		Ok(())
	}

	async fn delete(&self, key: &String) -> Result<()> {
		self.writes.remove(key);
		Ok(())
	}
}

#[tokio::test]
async fn scenario_s5_write_behind_retries_until_success_then_persists() {
	let writer = Arc::new(FlakyWriter { remaining_failures: AtomicU32::new(2), writes: dashmap::DashMap::new() });

	let config = CacheBuilder::new("write-behind")
		.write_strategy(concache::WriteStrategy::WriteBehind)
		.write_behind_retries(5, Duration::from_millis(1))
		.build()
		.unwrap();
	let cache: Cache<String, i32> = Cache::with_collaborators(config, None, Some(writer.clone())).unwrap();

	cache.put("k".to_string(), 42).await.unwrap();

	// Reads come straight from the map; persistence is eventual.
	assert_eq!(*cache.get("k".to_string()).await.unwrap().unwrap(), 42);

	let discarded = cache.close(Duration::from_secs(5)).await;

	assert_eq!(discarded, 0);
	assert_eq!(*writer.writes.get("k").unwrap(), 42);
}

#[tokio::test]
async fn write_behind_drops_a_write_once_the_flush_deadline_elapses() {
	let writer = Arc::new(FlakyWriter { remaining_failures: AtomicU32::new(u32::MAX), writes: dashmap::DashMap::new() });

	let config = CacheBuilder::new("write-behind-timeout")
		.write_strategy(concache::WriteStrategy::WriteBehind)
		.write_behind_retries(100, Duration::from_millis(5))
		.build()
		.unwrap();
	let cache: Cache<String, i32> = Cache::with_collaborators(config, None, Some(writer.clone())).unwrap();

	cache.put("k".to_string(), 1).await.unwrap();

	let discarded = cache.close(Duration::from_millis(20)).await;

	assert_eq!(discarded, 1);
	assert!(writer.writes.get("k").is_none());
}

#[tokio::test]
async fn a_remove_enqueued_after_a_put_cancels_the_put() {
	let writer = Arc::new(FlakyWriter { remaining_failures: AtomicU32::new(0), writes: dashmap::DashMap::new() });

	let config = CacheBuilder::new("write-behind-cancel").write_strategy(concache::WriteStrategy::WriteBehind).build().unwrap();
	let cache: Cache<String, i32> = Cache::with_collaborators(config, None, Some(writer.clone())).unwrap();

	cache.put("k".to_string(), 1).await.unwrap();
	cache.invalidate("k".to_string()).await.unwrap();

	cache.close(Duration::from_secs(1)).await;

	assert!(writer.writes.get("k").is_none());
}

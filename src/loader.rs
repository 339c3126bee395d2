//! External value producer/consumer contracts (§4.E).
//!
//! `Loader` and `Writer` are the cache's only points of contact with
//! external systems; both are async traits (`async_trait`, matching the
//! teacher's async I/O boundary) and must tolerate concurrent invocation —
//! the write-behind worker and the loading coordinator call them without
//! holding any cache-internal lock.

// std
use std::collections::HashMap;
// crates.io
use async_trait::async_trait;

use crate::error::Result;

/// Produces values for keys absent from (or stale in) the cache.
#[async_trait]
pub trait Loader<K, V>: Send + Sync
where
	K: Send + Sync,
	V: Send + Sync,
{
	/// Loads a single value, or `Ok(None)` for "no value for this key"
	/// (treated as a miss, never installed — see the open question in §9).
	async fn load_one(&self, key: &K) -> Result<Option<V>>;

	/// Bulk-loads every value the loader knows about, used by `warmUp` and
	/// by the [`crate::list::CacheList`] reload path. Default: unsupported,
	/// per §9's "optional capability, not a required interface" note.
	async fn load_all(&self) -> Result<HashMap<K, V>>
	where
		K: Eq + std::hash::Hash,
	{
		Ok(HashMap::new())
	}
}

/// Persists values written through or behind the cache.
#[async_trait]
pub trait Writer<K, V>: Send + Sync
where
	K: Send + Sync,
	V: Send + Sync,
{
	/// Persists one key/value pair.
	async fn write(&self, key: &K, value: &V) -> Result<()>;

	/// Persists a batch; default implementation calls [`Writer::write`] per
	/// entry, which is correct but not necessarily efficient — writers
	/// backed by a bulk API should override this.
	async fn write_all(&self, entries: &[(K, V)]) -> Result<()>
	where
		K: Clone,
		V: Clone,
	{
		for (key, value) in entries {
			self.write(key, value).await?;
		}
		Ok(())
	}

	/// Deletes one key.
	async fn delete(&self, key: &K) -> Result<()>;

	/// Deletes a batch; default implementation calls [`Writer::delete`] per key.
	async fn delete_all(&self, keys: &[K]) -> Result<()>
	where
		K: Clone,
	{
		for key in keys {
			self.delete(key).await?;
		}
		Ok(())
	}

	/// Flushes any writer-internal buffering. Default: no-op.
	async fn flush(&self) -> Result<()> {
		Ok(())
	}
}

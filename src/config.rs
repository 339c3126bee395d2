//! Configuration surface: recognized options, enums, and a validating builder.
//!
//! Mirrors `registry.rs`'s `IdentityProviderRegistration` + `RegistryBuilder`
//! pattern: a plain data struct with `Default`, a fluent builder that
//! accumulates overrides, and a `validate()` pass invoked once at
//! construction so a misconfigured cache never starts running.

// std
use std::time::Duration;
// crates.io
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `LRU | LFU | FIFO | RANDOM | TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionPolicyKind {
	Lru,
	Lfu,
	Fifo,
	Random,
	#[serde(rename = "TTL")]
	Age,
}

/// `ON_MISS | REFRESH_AHEAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshStrategy {
	OnMiss,
	RefreshAhead,
}

/// `READ_ONLY | WRITE_THROUGH | WRITE_BEHIND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteStrategy {
	ReadOnly,
	WriteThrough,
	WriteBehind,
}

/// `STRONG | SOFT | WEAK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferenceType {
	Strong,
	Soft,
	Weak,
}

/// `SYNC | ASYNC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadStrategy {
	Sync,
	Async,
}

/// `ONE | ALL` — list load strategy (§6, `CacheList` variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListLoadStrategy {
	One,
	All,
}

/// Full recognized configuration surface for a [`crate::map::Cache`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
	pub cache_name: String,
	/// Access TTL; `None` means idle entries never expire on their own.
	pub access_ttl: Option<Duration>,
	/// Absolute TTL; `None` means "no absolute cap".
	pub absolute_ttl: Option<Duration>,
	/// Capacity bound; `0` means unbounded.
	pub max_size: u64,
	pub eviction_policy: EvictionPolicyKind,
	pub refresh_strategy: RefreshStrategy,
	/// Fraction of `access_ttl` elapsed before an entry becomes refresh-eligible.
	pub refresh_ahead_factor: f64,
	pub refresh_ahead_threads: usize,
	pub write_strategy: WriteStrategy,
	pub write_behind_batch_size: usize,
	pub write_behind_delay: Duration,
	pub write_behind_max_retries: u32,
	pub write_behind_retry_delay: Duration,
	pub load_strategy: LoadStrategy,
	pub reference_type: ReferenceType,
	pub enable_metrics: bool,
	pub enable_jmx: bool,
	pub enable_auto_cleanup: bool,
	pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			cache_name: "cache".to_string(),
			access_ttl: None,
			absolute_ttl: None,
			max_size: 0,
			eviction_policy: EvictionPolicyKind::Lru,
			refresh_strategy: RefreshStrategy::OnMiss,
			refresh_ahead_factor: 0.75,
			refresh_ahead_threads: 1,
			write_strategy: WriteStrategy::ReadOnly,
			write_behind_batch_size: 16,
			write_behind_delay: Duration::from_millis(0),
			write_behind_max_retries: 3,
			write_behind_retry_delay: Duration::from_millis(1000),
			load_strategy: LoadStrategy::Sync,
			reference_type: ReferenceType::Strong,
			enable_metrics: true,
			enable_jmx: false,
			enable_auto_cleanup: false,
			cleanup_interval: Duration::from_secs(60),
		}
	}
}

impl CacheConfig {
	/// Validates every invariant §7 requires be rejected at construction.
	pub fn validate(&self) -> Result<()> {
		if self.cache_name.trim().is_empty() {
			return Err(Error::ConfigurationError {
				field: "cache_name",
				reason: "must not be empty".into(),
			});
		}
		if self.refresh_strategy == RefreshStrategy::RefreshAhead
			&& !(0.0 < self.refresh_ahead_factor && self.refresh_ahead_factor < 1.0)
		{
			return Err(Error::ConfigurationError {
				field: "refresh_ahead_factor",
				reason: "must be strictly between 0 and 1".into(),
			});
		}
		if self.refresh_strategy == RefreshStrategy::RefreshAhead && self.access_ttl.is_none() {
			return Err(Error::ConfigurationError {
				field: "refresh_ahead_factor",
				reason: "refresh-ahead requires an access_ttl to compute eligibility against".into(),
			});
		}
		if self.refresh_ahead_threads == 0 {
			return Err(Error::ConfigurationError {
				field: "refresh_ahead_threads",
				reason: "must be at least 1".into(),
			});
		}
		if self.write_strategy == WriteStrategy::WriteBehind && self.write_behind_batch_size == 0 {
			return Err(Error::ConfigurationError {
				field: "write_behind_batch_size",
				reason: "must be at least 1".into(),
			});
		}
		Ok(())
	}
}

/// Fluent, validating builder for [`CacheConfig`].
///
/// Grounded in `RegistryBuilder`'s accumulate-then-`build()` shape.
#[derive(Debug, Default)]
pub struct CacheBuilder {
	config: CacheConfig,
}

impl CacheBuilder {
	pub fn new(cache_name: impl Into<String>) -> Self {
		Self { config: CacheConfig { cache_name: cache_name.into(), ..CacheConfig::default() } }
	}

	pub fn access_ttl(mut self, ttl: Duration) -> Self {
		self.config.access_ttl = Some(ttl);
		self
	}

	pub fn absolute_ttl(mut self, ttl: Duration) -> Self {
		self.config.absolute_ttl = Some(ttl);
		self
	}

	pub fn max_size(mut self, max_size: u64) -> Self {
		self.config.max_size = max_size;
		self
	}

	pub fn eviction_policy(mut self, policy: EvictionPolicyKind) -> Self {
		self.config.eviction_policy = policy;
		self
	}

	pub fn refresh_ahead(mut self, factor: f64, threads: usize) -> Self {
		self.config.refresh_strategy = RefreshStrategy::RefreshAhead;
		self.config.refresh_ahead_factor = factor;
		self.config.refresh_ahead_threads = threads;
		self
	}

	pub fn write_strategy(mut self, strategy: WriteStrategy) -> Self {
		self.config.write_strategy = strategy;
		self
	}

	pub fn write_behind_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
		self.config.write_behind_max_retries = max_retries;
		self.config.write_behind_retry_delay = retry_delay;
		self
	}

	pub fn load_strategy(mut self, strategy: LoadStrategy) -> Self {
		self.config.load_strategy = strategy;
		self
	}

	pub fn reference_type(mut self, reference_type: ReferenceType) -> Self {
		self.config.reference_type = reference_type;
		self
	}

	pub fn enable_metrics(mut self, enabled: bool) -> Self {
		self.config.enable_metrics = enabled;
		self
	}

	pub fn auto_cleanup(mut self, interval: Duration) -> Self {
		self.config.enable_auto_cleanup = true;
		self.config.cleanup_interval = interval;
		self
	}

	/// Validates the accumulated configuration and returns it.
	pub fn build(self) -> Result<CacheConfig> {
		self.config.validate()?;
		Ok(self.config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_validates() {
		assert!(CacheConfig::default().validate().is_ok());
	}

	#[test]
	fn empty_cache_name_is_rejected() {
		let config = CacheBuilder::new("").build();
		assert!(config.is_err());
	}

	#[test]
	fn refresh_ahead_factor_out_of_range_is_rejected() {
		let config = CacheBuilder::new("c").access_ttl(Duration::from_secs(60)).refresh_ahead(1.5, 1).build();
		assert!(matches!(config, Err(Error::ConfigurationError { field: "refresh_ahead_factor", .. })));
	}

	#[test]
	fn refresh_ahead_without_access_ttl_is_rejected() {
		let config = CacheBuilder::new("c").refresh_ahead(0.75, 1).build();
		assert!(config.is_err());
	}

	#[test]
	fn builder_applies_overrides() {
		let config = CacheBuilder::new("sessions")
			.max_size(100)
			.eviction_policy(EvictionPolicyKind::Lfu)
			.write_strategy(WriteStrategy::WriteBehind)
			.build()
			.unwrap();

		assert_eq!(config.max_size, 100);
		assert_eq!(config.eviction_policy, EvictionPolicyKind::Lfu);
		assert_eq!(config.write_strategy, WriteStrategy::WriteBehind);
	}
}

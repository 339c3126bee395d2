//! A concurrent, in-process cache engine with loader-driven single-flight
//! fill, pluggable eviction, proactive refresh-ahead, and write-through/
//! write-behind persistence — built for services that need a keyed cache
//! with production-grade observability, not just a bounded map.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod admin;
pub mod cell;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod eviction;
#[cfg(feature = "metrics")] pub mod export;
pub mod list;
pub mod loader;
pub mod map;
pub mod metrics;
pub mod refresh;
pub mod write_behind;

mod error;

#[cfg(feature = "prometheus")] pub use crate::export::install_default_exporter;
#[cfg(feature = "metrics")] pub use crate::export::MetricsPublisher;
pub use crate::{
	admin::{sanitize_identifier, AdminView, CacheSnapshotView},
	config::{CacheBuilder, CacheConfig, EvictionPolicyKind, ListLoadStrategy, LoadStrategy, ReferenceType, RefreshStrategy, WriteStrategy},
	error::{Error, Result},
	list::{CacheList, ListLoader},
	loader::{Loader, Writer},
	map::Cache,
	metrics::{HealthStatus, HealthThresholds, HealthVerdict, MetricsSnapshot},
};

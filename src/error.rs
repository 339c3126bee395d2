//! Crate-wide error types and `Result` alias.

// std
use std::sync::Arc;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the cache engine.
///
/// The taxonomy intentionally keeps load/write failures non-fatal: a coalesced
/// load failure or a write-through failure never poisons the cache. Only
/// [`Error::CapacityExhaustion`] represents an internal invariant violation
/// that callers should treat as a bug report rather than a retryable error.
#[allow(missing_docs)]
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	#[error("Loader failed for key: {0}")]
	LoadFailure(String),
	#[error("Writer failed during write-through: {0}")]
	WriteFailure(String),
	#[error("Internal invariant violated: {0}")]
	CapacityExhaustion(String),
	#[error("Invalid configuration for {field}: {reason}")]
	ConfigurationError { field: &'static str, reason: String },
	#[error("Operation rejected; cache is shut down")]
	Shutdown,
	#[error("Operation not supported: {0}")]
	Unsupported(&'static str),
	#[cfg(feature = "prometheus")]
	#[error("Metrics exporter error: {0}")]
	Metrics(String),
	#[error(transparent)]
	Serde(#[from] Arc<serde_json::Error>),
}
impl From<serde_json::Error> for Error {
	fn from(value: serde_json::Error) -> Self {
		Self::Serde(Arc::new(value))
	}
}

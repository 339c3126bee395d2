//! Reference cells: strong, soft, and weak value holders.
//!
//! Rust has no garbage collector to cooperate with, so "soft" and "weak"
//! holding are approximated with [`std::sync::Weak`] plus, for soft cells, a
//! strong guard that a background reclaimer can release under pressure. Once
//! a soft or weak cell's value is gone, [`ValueCell::try_get`] reports a miss
//! and the caller is expected to remove the entry (see `map`'s cleanup loop).

// std
use std::sync::{Arc, Weak};
// crates.io
use parking_lot::RwLock;

/// A value holder with one of three retention strategies.
///
/// Reclaim hints (the guard inside [`ValueCell::Soft`]) never hold the value
/// strongly once released — that release is one-way; a cleared cell cannot
/// be un-cleared, it must be reloaded.
pub enum ValueCell<V> {
	/// Always returns the value; never reclaimed by the background sweep.
	Strong(Arc<V>),
	/// May be reclaimed under memory pressure; `guard` is the reclaimable
	/// strong handle, `weak` is how callers observe reclamation.
	Soft { weak: Weak<V>, guard: Arc<RwLock<Option<Arc<V>>>> },
	/// Only ever held weakly; survives exactly as long as some other owner
	/// (outside the cache) keeps the `Arc` alive.
	Weak(Weak<V>),
}

impl<V> ValueCell<V> {
	/// Wraps `value` for strong retention.
	pub fn strong(value: Arc<V>) -> Self {
		Self::Strong(value)
	}

	/// Wraps `value` for soft retention: held strongly until reclaimed.
	pub fn soft(value: Arc<V>) -> Self {
		let weak = Arc::downgrade(&value);
		Self::Soft { weak, guard: Arc::new(RwLock::new(Some(value))) }
	}

	/// Wraps `value` for weak retention: the cache never owns a strong
	/// reference to it at all.
	pub fn weak(value: &Arc<V>) -> Self {
		Self::Weak(Arc::downgrade(value))
	}

	/// Returns the value if it is still live.
	pub fn try_get(&self) -> Option<Arc<V>> {
		match self {
			Self::Strong(value) => Some(Arc::clone(value)),
			Self::Soft { weak, .. } | Self::Weak(weak) => weak.upgrade(),
		}
	}

	/// Returns `true` if this cell's value has been reclaimed or dropped.
	///
	/// Always `false` for [`ValueCell::Strong`].
	pub fn is_cleared(&self) -> bool {
		match self {
			Self::Strong(_) => false,
			Self::Soft { weak, .. } | Self::Weak(weak) => weak.strong_count() == 0,
		}
	}

	/// Releases the soft guard's strong hold, if any. No-op for `Strong`
	/// and `Weak`, which have no guard to release. Called by the background
	/// reclaimer; not normally invoked directly.
	pub fn reclaim(&self) -> bool {
		match self {
			Self::Soft { guard, .. } => guard.write().take().is_some(),
			Self::Strong(_) | Self::Weak(_) => false,
		}
	}
}

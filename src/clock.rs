//! Time sources used for token expiration bookkeeping.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// self
use crate::_prelude::*;

/// Supplies the current Unix time in whole seconds.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current Unix timestamp in seconds.
	fn now(&self) -> i64;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> i64 {
		OffsetDateTime::now_utc().unix_timestamp()
	}
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);
impl ManualClock {
	/// Creates a clock pinned at `now`.
	pub fn new(now: i64) -> Self {
		Self(AtomicI64::new(now))
	}

	/// Moves the clock to an absolute instant.
	pub fn set(&self, now: i64) {
		self.0.store(now, Ordering::SeqCst);
	}

	/// Moves the clock forward by `secs`.
	pub fn advance(&self, secs: i64) {
		self.0.fetch_add(secs, Ordering::SeqCst);
	}
}
impl Clock for ManualClock {
	fn now(&self) -> i64 {
		self.0.load(Ordering::SeqCst)
	}
}

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, RequestOutcome, SchemeKind};

/// Counts the requests one manager sends to its token service.
///
/// Served-from-cache calls and followers that join an in-flight request never reach the
/// service and are not counted. Background refreshes are.
#[derive(Debug, Default)]
pub struct RequestMetrics {
	counts: [AtomicU64; 3],
}
impl RequestMetrics {
	/// Requests sent, foreground and background.
	pub fn attempts(&self) -> u64 {
		self.count(RequestOutcome::Attempt)
	}

	/// Requests whose response was parsed into a token.
	pub fn successes(&self) -> u64 {
		self.count(RequestOutcome::Success)
	}

	/// Requests that ended in a transport, status or parse error.
	pub fn failures(&self) -> u64 {
		self.count(RequestOutcome::Failure)
	}

	/// Requests still running, or whose leading caller was dropped before they resolved.
	pub fn unresolved(&self) -> u64 {
		self.attempts().saturating_sub(self.successes() + self.failures())
	}

	/// Bumps this manager's counter and the global `metrics` counter for `outcome`.
	pub(crate) fn record(&self, kind: SchemeKind, outcome: RequestOutcome) {
		self.counts[outcome as usize].fetch_add(1, Ordering::Relaxed);

		obs::record_request_outcome(kind, outcome);
	}

	fn count(&self, outcome: RequestOutcome) -> u64 {
		self.counts[outcome as usize].load(Ordering::Relaxed)
	}
}

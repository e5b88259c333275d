// self
use crate::obs::{RequestOutcome, SchemeKind};

/// Name of the global counter incremented for every token request outcome.
pub const TOKEN_REQUEST_COUNTER: &str = "ibm_cloud_auth_token_request_total";

/// Increments [`TOKEN_REQUEST_COUNTER`] labeled with `scheme` and `outcome`.
///
/// Without the `metrics` feature this does nothing; per-manager counts are still kept in
/// [`RequestMetrics`](crate::manager::RequestMetrics).
pub fn record_request_outcome(kind: SchemeKind, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(TOKEN_REQUEST_COUNTER, "scheme" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

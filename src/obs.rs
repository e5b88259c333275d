//! Observability helpers for token requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ibm_cloud_auth.token_request` with the
//!   `scheme` and `stage` fields, and to route [`TracingLogger`] output into `tracing`.
//! - Enable `metrics` to increment the `ibm_cloud_auth_token_request_total` counter for every
//!   attempt/success/failure, labeled by `scheme` + `outcome`.

mod log;
mod metrics;
mod tracing;

pub use self::{log::*, metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Token schemes observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemeKind {
	/// IAM apikey exchange.
	Iam,
	/// IAM compute-resource token exchange.
	Container,
	/// IAM trusted-profile "assume" exchange.
	IamAssume,
	/// Cloud Pak for Data.
	Cp4d,
	/// VPC instance metadata exchange.
	VpcInstance,
	/// MCSP v1 apikey exchange.
	Mcsp,
	/// MCSP v2 apikey exchange.
	McspV2,
}
impl SchemeKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SchemeKind::Iam => "iam",
			SchemeKind::Container => "container",
			SchemeKind::IamAssume => "iam_assume",
			SchemeKind::Cp4d => "cp4d",
			SchemeKind::VpcInstance => "vpc_instance",
			SchemeKind::Mcsp => "mcsp",
			SchemeKind::McspV2 => "mcsp_v2",
		}
	}
}
impl Display for SchemeKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each token request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// A network refresh was started.
	Attempt,
	/// The refresh stored a new token.
	Success,
	/// The refresh failed and the error was propagated (or dropped, for background refreshes).
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

//! Authenticators stamp an `Authorization` header onto outbound service requests.
//!
//! Static variants ([`BasicAuthenticator`], [`BearerTokenAuthenticator`],
//! [`NoAuthAuthenticator`]) need no network access. [`TokenAuthenticator`] asks its
//! [`TokenManager`](crate::manager::TokenManager) for a bearer token on every call and relies on
//! the manager for caching and refresh pacing.

mod basic;
mod bearer;
mod managed;
mod no_auth;

pub use self::{basic::*, bearer::*, managed::*, no_auth::*};

// crates.io
use ::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TokenRequestError},
	obs::SchemeKind,
};

/// Boxed future returned by [`Authenticator::authenticate`].
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Adds credentials to outbound request headers.
pub trait Authenticator
where
	Self: Debug + Send + Sync,
{
	/// Authentication type handled by this authenticator.
	fn authentication_type(&self) -> AuthType;

	/// Sets the `Authorization` header; `headers` is left untouched on failure.
	fn authenticate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a>;
}

/// Authentication types understood by external configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthType {
	/// Basic username and password.
	Basic,
	/// Caller-managed bearer token.
	BearerToken,
	/// IAM apikey.
	Iam,
	/// IAM trusted profile assume.
	IamAssume,
	/// IAM compute-resource token.
	Container,
	/// Cloud Pak for Data.
	Cp4d,
	/// No authentication.
	NoAuth,
	/// VPC instance metadata.
	Vpc,
	/// MCSP v1.
	Mcsp,
	/// MCSP v2.
	McspV2,
}
impl AuthType {
	/// Configuration name of the type.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthType::Basic => "basic",
			AuthType::BearerToken => "bearerToken",
			AuthType::Iam => "iam",
			AuthType::IamAssume => "iamAssume",
			AuthType::Container => "container",
			AuthType::Cp4d => "cp4d",
			AuthType::NoAuth => "noAuth",
			AuthType::Vpc => "vpc",
			AuthType::Mcsp => "mcsp",
			AuthType::McspV2 => "mcspv2",
		}
	}
}
impl Display for AuthType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for AuthType {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		const ALL: [AuthType; 10] = [
			AuthType::Basic,
			AuthType::BearerToken,
			AuthType::Iam,
			AuthType::IamAssume,
			AuthType::Container,
			AuthType::Cp4d,
			AuthType::NoAuth,
			AuthType::Vpc,
			AuthType::Mcsp,
			AuthType::McspV2,
		];

		let s = s.trim();

		ALL.into_iter()
			.find(|ty| ty.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| ConfigError::UnsupportedAuthType { value: s.to_owned() })
	}
}
impl From<SchemeKind> for AuthType {
	fn from(kind: SchemeKind) -> Self {
		match kind {
			SchemeKind::Iam => AuthType::Iam,
			SchemeKind::Container => AuthType::Container,
			SchemeKind::IamAssume => AuthType::IamAssume,
			SchemeKind::Cp4d => AuthType::Cp4d,
			SchemeKind::VpcInstance => AuthType::Vpc,
			SchemeKind::Mcsp => AuthType::Mcsp,
			SchemeKind::McspV2 => AuthType::McspV2,
		}
	}
}

/// Inserts a sensitive `Authorization` header.
pub(crate) fn set_authorization(headers: &mut HeaderMap, value: &str) -> Result<()> {
	let mut value = HeaderValue::from_str(value)
		.map_err(|_| TokenRequestError::HeaderValue { name: AUTHORIZATION.as_str().to_owned() })?;

	value.set_sensitive(true);
	headers.insert(AUTHORIZATION, value);

	Ok(())
}

//! Per-scheme token request construction.
//!
//! A [`TokenScheme`] only knows how to ask its token service for a token and how to turn the
//! answer into [`TokenInfo`]. Caching, expiration checks, and request pacing live in
//! [`TokenManager`](crate::manager::TokenManager), which drives any scheme the same way.

pub mod assume;
pub mod container;
pub mod cp4d;
pub mod iam;
pub mod mcsp;
pub mod mcsp_v2;
pub mod vpc;

pub use self::{assume::*, container::*, cp4d::*, iam::*, mcsp::*, mcsp_v2::*, vpc::*};

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	manager::RequestContext,
	obs::SchemeKind,
	token::{TokenInfo, TokenSecret},
};

/// Boxed future returned by [`TokenScheme::request_token`].
pub type SchemeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Strategy that builds token requests for one authentication scheme.
///
/// Schemes are cloned into each refresh, so they should stay cheap to clone; anything shared
/// (delegate managers, readers) belongs behind an `Arc`.
pub trait TokenScheme
where
	Self: 'static + Clone + Send + Sync,
{
	/// Label used in spans and metrics.
	const KIND: SchemeKind;
	/// Seconds subtracted from `expire_time` when deciding whether the cached token is expired.
	const EXPIRY_MARGIN: i64 = 0;
	/// Token service URL used when the options do not supply one.
	const DEFAULT_URL: Option<&'static str> = None;
	/// Operation paths stripped from a caller-supplied URL before it is stored.
	const OPERATION_PATHS: &'static [&'static str] = &[];

	/// Performs the network exchange and returns the parsed response body.
	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue>;

	/// Converts a successful response into cached token state.
	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo>;

	/// Called after the manager's extra headers change.
	fn headers_changed(&self, _headers: &BTreeMap<String, String>) {}

	/// Called after the manager's TLS verification flag changes.
	fn ssl_verification_changed(&self, _disabled: bool) {}
}

/// Returns the trimmed, non-empty value of a required option.
pub(crate) fn require(option: &'static str, value: Option<&str>) -> Result<String, ConfigError> {
	non_empty(value).map(str::to_owned).ok_or(ConfigError::MissingOption { option })
}

/// Returns a required credential, rejecting values wrapped in braces or quotes.
pub(crate) fn require_credential(
	option: &'static str,
	value: Option<&str>,
) -> Result<TokenSecret, ConfigError> {
	let value = require(option, value)?;

	check_credential(option, &value)?;

	Ok(TokenSecret::new(value))
}

/// Validates an optional credential the same way as [`require_credential`].
pub(crate) fn optional_credential(
	option: &'static str,
	value: Option<&str>,
) -> Result<Option<TokenSecret>, ConfigError> {
	match non_empty(value) {
		Some(value) => {
			check_credential(option, value)?;

			Ok(Some(TokenSecret::new(value)))
		},
		None => Ok(None),
	}
}

/// Treats empty and whitespace-only strings as unset.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

/// Rejects credentials that begin or end with `{`, `}` or `"`.
pub(crate) fn check_credential(option: &'static str, value: &str) -> Result<(), ConfigError> {
	let wrapped = |c: char| matches!(c, '{' | '}' | '"');

	if value.starts_with(wrapped) || value.ends_with(wrapped) {
		return Err(ConfigError::InvalidCredential { option });
	}

	Ok(())
}

//! Cached token state produced by a successful token exchange.

// self
use crate::{
	_prelude::*,
	error::TokenParseError,
	token::{jwt::JwtClaims, secret::TokenSecret},
};

/// Token state saved after a successful exchange.
///
/// `expire_time` and `refresh_time` only ever exist alongside the token they were derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
	/// Bearer token handed to callers.
	pub access_token: TokenSecret,
	/// Refresh token returned by IAM, if any.
	pub refresh_token: Option<TokenSecret>,
	/// Instant (Unix seconds) the token stops being usable.
	pub expire_time: i64,
	/// Instant (Unix seconds) after which a background refresh should start.
	pub refresh_time: i64,
}
impl TokenInfo {
	/// Builds token state from a JWT, deriving timings from its `exp`/`iat` claims.
	pub fn from_jwt(token: impl Into<String>) -> Result<Self, TokenParseError> {
		let token = token.into();
		let (expire_time, refresh_time) = JwtClaims::decode(&token)?.timing();

		Ok(Self { access_token: TokenSecret::new(token), refresh_token: None, expire_time, refresh_time })
	}

	/// Extracts the JWT stored under `field` in a token service response.
	pub fn from_response(body: &JsonValue, field: &'static str) -> Result<Self, TokenParseError> {
		let token = body
			.get(field)
			.and_then(JsonValue::as_str)
			.filter(|token| !token.is_empty())
			.ok_or(TokenParseError::MissingField { field })?;

		Self::from_jwt(token)
	}

	/// Attaches the response's `refresh_token`, if it carries one.
	pub fn with_refresh_token_from(mut self, body: &JsonValue) -> Self {
		self.refresh_token = body.get("refresh_token").and_then(JsonValue::as_str).map(TokenSecret::new);

		self
	}

	/// Returns `true` once `now` reaches `expire_time - margin`.
	pub fn is_expired_at(&self, now: i64, margin: i64) -> bool {
		now >= self.expire_time.saturating_sub(margin)
	}

	/// Returns `true` once `now` reaches the proactive refresh instant.
	pub fn needs_refresh_at(&self, now: i64) -> bool {
		now >= self.refresh_time
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	use serde_json::json;
	// self
	use super::*;

	fn jwt(iat: i64, exp: i64) -> String {
		format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(format!("{{\"iat\":{iat},\"exp\":{exp}}}")))
	}

	#[test]
	fn reads_token_by_field_name() {
		let body = json!({ "token": jwt(1000, 2000), "refresh_token": "r1" });
		let info = TokenInfo::from_response(&body, "token")
			.expect("Token field should be present.")
			.with_refresh_token_from(&body);

		assert_eq!(info.expire_time, 2000);
		assert_eq!(info.refresh_time, 1800);
		assert_eq!(info.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
	}

	#[test]
	fn missing_field_is_a_parse_error() {
		let err = TokenInfo::from_response(&json!({ "access_token": jwt(1, 2) }), "accessToken")
			.expect_err("Wrong field name must fail.");

		assert!(matches!(err, TokenParseError::MissingField { field: "accessToken" }));
		assert!(err.to_string().starts_with("Access token not present in response"));
	}

	#[test]
	fn expiry_checks_honor_margin_and_threshold() {
		let info = TokenInfo::from_jwt(jwt(1000, 2000)).expect("Fixture token should decode.");

		assert!(!info.needs_refresh_at(1799));
		assert!(info.needs_refresh_at(1800));
		assert!(!info.is_expired_at(1990, 0));
		assert!(info.is_expired_at(1990, 10));
		assert!(info.is_expired_at(2000, 0));
	}
}

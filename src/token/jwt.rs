//! Unverified JSON Web Token payload decoding.
//!
//! Only the payload segment is read; signatures are never checked. The token service is the
//! authority, and the claims are used purely to schedule refreshes.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, error::TokenParseError};

/// Timing claims read from a JWT payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct JwtClaims {
	/// Expiration instant (Unix seconds).
	pub exp: Option<f64>,
	/// Issued-at instant (Unix seconds).
	pub iat: Option<f64>,
}
impl JwtClaims {
	/// Decodes the payload segment of `token`.
	pub fn decode(token: &str) -> Result<Self, TokenParseError> {
		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next()) {
			(Some(header), Some(payload)) if !header.is_empty() && !payload.is_empty() => payload,
			_ => return Err(invalid("expected dot-separated header and payload segments")),
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(|e| invalid(format!("payload is not base64url: {e}")))?;
		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de)
			.map_err(|e| invalid(format!("payload claims are malformed at `{}`: {}", e.path(), e.inner())))
	}

	/// Computes `(expire_time, refresh_time)`.
	///
	/// With both claims present, `expire_time = exp` and `refresh_time` falls after 80% of
	/// `exp - iat` has elapsed. Without them both instants are `0`, forcing a refresh on the next
	/// call.
	pub fn timing(&self) -> (i64, i64) {
		let (Some(exp), Some(iat)) = (self.exp, self.iat) else {
			return (0, 0);
		};
		let exp = exp.floor() as i64;
		let iat = iat.floor() as i64;
		let ttl = exp.saturating_sub(iat);
		// `now >= exp - ttl * 0.2` for integer `now` is `now >= exp - floor(ttl / 5)`.
		let refresh_time = exp.saturating_sub(ttl.div_euclid(5)).min(exp);

		(exp, refresh_time)
	}
}

fn invalid(reason: impl Into<String>) -> TokenParseError {
	TokenParseError::InvalidJwt { reason: reason.into() }
}

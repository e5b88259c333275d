// crates.io
use ::http::HeaderMap;
// self
use crate::{
	_prelude::*,
	authenticator::{self, AuthFuture, AuthType, Authenticator},
	scheme,
	token::TokenSecret,
};

/// Sends a caller-managed bearer token; the caller replaces it before it expires.
#[derive(Debug)]
pub struct BearerTokenAuthenticator {
	token: RwLock<TokenSecret>,
}
impl BearerTokenAuthenticator {
	/// Validates and stores the initial token.
	pub fn new(bearer_token: &str) -> Result<Self> {
		Ok(Self { token: RwLock::new(scheme::require_credential("bearer_token", Some(bearer_token))?) })
	}

	/// Replaces the token used by future requests.
	pub fn set_bearer_token(&self, bearer_token: &str) -> Result<()> {
		*self.token.write() = scheme::require_credential("bearer_token", Some(bearer_token))?;

		Ok(())
	}

	/// Current token.
	pub fn bearer_token(&self) -> String {
		self.token.read().expose().to_owned()
	}
}
impl Authenticator for BearerTokenAuthenticator {
	fn authentication_type(&self) -> AuthType {
		AuthType::BearerToken
	}

	fn authenticate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		let value = format!("Bearer {}", self.token.read().expose());

		Box::pin(async move { authenticator::set_authorization(headers, &value) })
	}
}

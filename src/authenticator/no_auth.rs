// crates.io
use ::http::HeaderMap;
// self
use crate::authenticator::{AuthFuture, AuthType, Authenticator};

/// Leaves requests unauthenticated.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuthAuthenticator;
impl Authenticator for NoAuthAuthenticator {
	fn authentication_type(&self) -> AuthType {
		AuthType::NoAuth
	}

	fn authenticate<'a>(&'a self, _headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		Box::pin(async { Ok(()) })
	}
}

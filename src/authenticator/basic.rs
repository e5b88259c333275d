// crates.io
use ::http::HeaderMap;
// self
use crate::{
	_prelude::*,
	authenticator::{self, AuthFuture, AuthType, Authenticator},
	http::basic_auth_value,
	scheme,
};

/// Sends a fixed username and password with every request.
#[derive(Clone)]
pub struct BasicAuthenticator {
	username: String,
	header: String,
}
impl BasicAuthenticator {
	/// Validates the credentials and precomputes the header value.
	pub fn new(username: &str, password: &str) -> Result<Self> {
		let username = scheme::require_credential("username", Some(username))?;
		let password = scheme::require_credential("password", Some(password))?;
		let header = basic_auth_value(username.expose(), password.expose());

		Ok(Self { username: username.into_inner(), header })
	}

	/// Configured user name.
	pub fn username(&self) -> &str {
		&self.username
	}
}
impl Authenticator for BasicAuthenticator {
	fn authentication_type(&self) -> AuthType {
		AuthType::Basic
	}

	fn authenticate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		Box::pin(async move { authenticator::set_authorization(headers, &self.header) })
	}
}
impl Debug for BasicAuthenticator {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("BasicAuthenticator").field("username", &self.username).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::header::AUTHORIZATION;
	// self
	use super::*;
	use crate::error::ConfigError;

	#[tokio::test]
	async fn sets_basic_header() {
		let auth = BasicAuthenticator::new("user", "pass").expect("Credentials are valid.");
		let mut headers = HeaderMap::new();

		auth.authenticate(&mut headers).await.expect("Basic auth cannot fail.");

		assert_eq!(headers.get(AUTHORIZATION).expect("Header should be set."), "Basic dXNlcjpwYXNz");
		assert!(!format!("{auth:?}").contains("pass"));
	}

	#[test]
	fn rejects_quoted_credentials() {
		assert!(matches!(
			BasicAuthenticator::new("\"user\"", "pass"),
			Err(Error::Config(ConfigError::InvalidCredential { option: "username" }))
		));
		assert!(matches!(
			BasicAuthenticator::new("user", ""),
			Err(Error::Config(ConfigError::MissingOption { option: "password" }))
		));
	}
}

//! Cloud Pak for Data token exchange.

// crates.io
use ::http::Method;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{TokenRequest, basic_auth_value},
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{self, SchemeFuture, TokenScheme},
	token::{TokenInfo, TokenSecret},
};

/// Basic-auth validation endpoint.
pub const CP4D_VALIDATE_AUTH_PATH: &str = "/v1/preauth/validateAuth";
/// JSON authorization endpoint.
pub const CP4D_AUTHORIZE_PATH: &str = "/v1/authorize";

/// Cloud Pak for Data token manager.
pub type Cp4dTokenManager = TokenManager<Cp4dScheme>;

/// CP4D endpoint used to obtain tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cp4dEndpoint {
	/// `GET /v1/preauth/validateAuth` with Basic username/password; token in `accessToken`.
	#[default]
	ValidateAuth,
	/// `POST /v1/authorize` with a JSON body carrying a password or an apikey; token in `token`.
	Authorize,
}
impl Cp4dEndpoint {
	fn path(self) -> &'static str {
		match self {
			Self::ValidateAuth => CP4D_VALIDATE_AUTH_PATH,
			Self::Authorize => CP4D_AUTHORIZE_PATH,
		}
	}

	fn token_field(self) -> &'static str {
		match self {
			Self::ValidateAuth => "accessToken",
			Self::Authorize => "token",
		}
	}
}

/// Options for [`Cp4dTokenManager`].
#[derive(Clone, Debug, Default)]
pub struct Cp4dOptions {
	/// CP4D user (required).
	pub username: Option<String>,
	/// User password.
	pub password: Option<String>,
	/// User apikey; only accepted by [`Cp4dEndpoint::Authorize`].
	pub apikey: Option<String>,
	/// Endpoint variant.
	pub endpoint: Cp4dEndpoint,
	/// Shared manager options; `url` is required.
	pub manager: ManagerOptions,
}
impl Cp4dOptions {
	/// Sets the user name.
	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the password.
	pub fn with_password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(password.into());

		self
	}

	/// Sets the apikey.
	pub fn with_apikey(mut self, apikey: impl Into<String>) -> Self {
		self.apikey = Some(apikey.into());

		self
	}

	/// Selects the endpoint variant.
	pub fn with_endpoint(mut self, endpoint: Cp4dEndpoint) -> Self {
		self.endpoint = endpoint;

		self
	}

	/// Sets the CP4D URL.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.manager = self.manager.with_url(url);

		self
	}

	/// Replaces the shared manager options.
	pub fn with_manager(mut self, manager: ManagerOptions) -> Self {
		self.manager = manager;

		self
	}

	pub(crate) fn scheme(&self) -> Result<Cp4dScheme> {
		scheme::require("url", self.manager.url.as_deref())?;

		let username = scheme::require_credential("username", self.username.as_deref())?;
		let password = scheme::optional_credential("password", self.password.as_deref())?;
		let apikey = scheme::optional_credential("apikey", self.apikey.as_deref())?;
		let credential = match (self.endpoint, password, apikey) {
			(_, Some(password), None) => Cp4dCredential::Password(password),
			(Cp4dEndpoint::Authorize, None, Some(apikey)) => Cp4dCredential::Apikey(apikey),
			(Cp4dEndpoint::ValidateAuth, None, None) =>
				Err(ConfigError::MissingOption { option: "password" })?,
			(Cp4dEndpoint::ValidateAuth, _, Some(_)) => Err(ConfigError::conflicting(
				"the validateAuth endpoint accepts a password, not an apikey",
			))?,
			(Cp4dEndpoint::Authorize, _, _) =>
				Err(ConfigError::conflicting("exactly one of password or apikey must be set"))?,
		};

		Ok(Cp4dScheme { username, credential, endpoint: self.endpoint })
	}
}

#[derive(Clone, Debug)]
enum Cp4dCredential {
	Password(TokenSecret),
	Apikey(TokenSecret),
}

/// Username grant against Cloud Pak for Data.
#[derive(Clone, Debug)]
pub struct Cp4dScheme {
	username: TokenSecret,
	credential: Cp4dCredential,
	endpoint: Cp4dEndpoint,
}
impl Cp4dScheme {
	fn build(&self, ctx: &RequestContext) -> Result<TokenRequest> {
		let url = ctx.endpoint(self.endpoint.path())?;
		let username = self.username.expose();

		Ok(match (self.endpoint, &self.credential) {
			(Cp4dEndpoint::ValidateAuth, Cp4dCredential::Password(password)) => ctx
				.request(Method::GET, url)
				.with_header("Accept", "application/json")
				.with_header("Authorization", basic_auth_value(username, password.expose())),
			(_, credential) => {
				let body = match credential {
					Cp4dCredential::Password(password) =>
						json!({ "username": username, "password": password.expose() }),
					Cp4dCredential::Apikey(apikey) =>
						json!({ "username": username, "api_key": apikey.expose() }),
				};

				ctx.request(Method::POST, url)
					.with_header("Content-Type", "application/json")
					.with_header("Accept", "application/json")
					.with_json(body)
			},
		})
	}
}
impl TokenScheme for Cp4dScheme {
	const KIND: SchemeKind = SchemeKind::Cp4d;
	const OPERATION_PATHS: &'static [&'static str] = &[CP4D_VALIDATE_AUTH_PATH, CP4D_AUTHORIZE_PATH];

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move { ctx.send(self.build(ctx)?).await })
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, self.endpoint.token_field())?)
	}
}

impl TokenManager<Cp4dScheme> {
	/// Builds a Cloud Pak for Data token manager.
	pub fn new(options: Cp4dOptions) -> Result<Self> {
		let scheme = options.scheme()?;

		Self::with_scheme(scheme, options.manager)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{RequestBody, stub::StubHttpClient};

	fn context() -> (Arc<StubHttpClient>, RequestContext) {
		let http = Arc::new(StubHttpClient::default().with_json(200, json!({})));
		let ctx = RequestContext::new(
			"https://cpd.example.com",
			http.clone(),
			Arc::new(crate::obs::TracingLogger),
		);

		(http, ctx)
	}

	fn options() -> Cp4dOptions {
		Cp4dOptions::default().with_url("https://cpd.example.com").with_username("admin")
	}

	#[tokio::test]
	async fn validate_auth_uses_basic_get() {
		let (http, ctx) = context();
		let scheme = options().with_password("secret").scheme().expect("Options should be valid.");

		scheme.request_token(&ctx).await.expect("Stubbed request should succeed.");

		let request = &http.requests()[0];

		assert_eq!(request.method, Method::GET);
		assert_eq!(request.url.as_str(), "https://cpd.example.com/v1/preauth/validateAuth");
		assert_eq!(request.header("Authorization"), Some(basic_auth_value("admin", "secret").as_str()));
		assert_eq!(request.body, RequestBody::Empty);
	}

	#[tokio::test]
	async fn authorize_posts_apikey_as_json() {
		let (http, ctx) = context();
		let scheme = options()
			.with_apikey("key")
			.with_endpoint(Cp4dEndpoint::Authorize)
			.scheme()
			.expect("Options should be valid.");

		scheme.request_token(&ctx).await.expect("Stubbed request should succeed.");

		let request = &http.requests()[0];

		assert_eq!(request.method, Method::POST);
		assert_eq!(request.url.as_str(), "https://cpd.example.com/v1/authorize");
		assert_eq!(request.body, RequestBody::Json(json!({ "username": "admin", "api_key": "key" })));
	}

	#[test]
	fn credentials_are_validated_per_endpoint() {
		assert!(matches!(
			Cp4dOptions::default().with_username("admin").with_password("p").scheme(),
			Err(Error::Config(ConfigError::MissingOption { option: "url" }))
		));
		assert!(matches!(
			options().scheme(),
			Err(Error::Config(ConfigError::MissingOption { option: "password" }))
		));
		assert!(matches!(
			options().with_apikey("key").scheme(),
			Err(Error::Config(ConfigError::ConflictingOptions { .. }))
		));
		assert!(matches!(
			options().with_password("p").with_apikey("key").with_endpoint(Cp4dEndpoint::Authorize).scheme(),
			Err(Error::Config(ConfigError::ConflictingOptions { .. }))
		));
	}

	#[test]
	fn token_field_follows_endpoint() {
		let scheme = options().with_password("p").scheme().expect("Options should be valid.");
		let err = scheme.save_token_info(&json!({ "token": "x" })).expect_err("Wrong field must fail.");

		assert!(err.to_string().contains("accessToken"));
	}
}

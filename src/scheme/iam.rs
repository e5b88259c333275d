//! IAM token service requests.
//!
//! Every IAM grant is a form POST to `/identity/token`. [`IamRequest`] carries the parts shared
//! by all of them (scope, optional client credentials), and [`IamApikeyScheme`] adds the apikey
//! grant on top.

// crates.io
use ::http::Method;
// self
use crate::{
	_prelude::*,
	http::{TokenRequest, basic_auth_value},
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{self, SchemeFuture, TokenScheme},
	token::{TokenInfo, TokenSecret},
};

/// Production IAM endpoint used when no URL is configured.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";
/// Token operation path, stripped from caller-supplied URLs.
pub const IAM_TOKEN_PATH: &str = "/identity/token";
/// Seconds before `exp` at which IAM tokens are already considered expired.
pub const IAM_EXPIRY_MARGIN: i64 = 10;

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// IAM token manager using the apikey grant.
pub type IamTokenManager = TokenManager<IamApikeyScheme>;

/// Request parts shared by all IAM grants.
#[derive(Clone, Debug, Default)]
pub struct IamRequest {
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	scope: Option<String>,
}
impl IamRequest {
	/// Creates the shared request parts; blank values count as unset.
	pub fn new(client_id: Option<&str>, client_secret: Option<&str>, scope: Option<&str>) -> Self {
		let mut request = Self::default();

		request.set_client_id_and_secret(client_id, client_secret);
		request.set_scope(scope);

		request
	}

	/// Client id sent in the Basic authorization header.
	pub fn client_id(&self) -> Option<&str> {
		self.client_id.as_deref()
	}

	/// Scope sent as a form field.
	pub fn scope(&self) -> Option<&str> {
		self.scope.as_deref()
	}

	/// Replaces the scope.
	pub fn set_scope(&mut self, scope: Option<&str>) {
		self.scope = scheme::non_empty(scope).map(str::to_owned);
	}

	/// Replaces the client credentials.
	pub fn set_client_id_and_secret(&mut self, client_id: Option<&str>, client_secret: Option<&str>) {
		self.client_id = scheme::non_empty(client_id).map(str::to_owned);
		self.client_secret = scheme::non_empty(client_secret).map(TokenSecret::new);
	}

	/// Assembles the form POST for `form`, adding scope and client authentication.
	pub fn build(
		&self,
		ctx: &RequestContext,
		mut form: BTreeMap<String, String>,
	) -> Result<TokenRequest> {
		if let Some(scope) = &self.scope {
			form.insert("scope".into(), scope.clone());
		}

		let mut request = ctx
			.request(Method::POST, ctx.endpoint(IAM_TOKEN_PATH)?)
			.with_header("Content-Type", "application/x-www-form-urlencoded")
			.with_header("Accept", "application/json")
			.with_form(form);

		match (&self.client_id, &self.client_secret) {
			(Some(id), Some(secret)) => {
				request = request.with_header("Authorization", basic_auth_value(id, secret.expose()));
			},
			(None, None) => {},
			_ => ctx.logger().warn(
				"Only one of client id and client secret is set; the Authorization header will be omitted.",
			),
		}

		Ok(request)
	}
}

/// Schemes that talk to the IAM token endpoint.
pub trait IamRequestScheme
where
	Self: TokenScheme,
{
	/// Whether [`TokenManager::refresh_token`] may hand out the stored refresh token.
	const EXPOSES_REFRESH_TOKEN: bool = true;

	/// Shared request parts used for this scheme's own exchange.
	fn iam_request_mut(&mut self) -> &mut IamRequest;

	/// Replaces the scope used for future requests.
	fn set_scope(&mut self, scope: Option<&str>) {
		self.iam_request_mut().set_scope(scope);
	}

	/// Replaces the client credentials used for future requests.
	fn set_client_id_and_secret(&mut self, client_id: Option<&str>, client_secret: Option<&str>) {
		self.iam_request_mut().set_client_id_and_secret(client_id, client_secret);
	}
}

impl<S> TokenManager<S>
where
	S: IamRequestScheme,
{
	/// Sets the scope sent with future token requests.
	pub fn set_scope(&self, scope: Option<&str>) {
		self.update_scheme(|scheme| scheme.set_scope(scope));
	}

	/// Sets the client credentials sent with future token requests.
	pub fn set_client_id_and_secret(&self, client_id: Option<&str>, client_secret: Option<&str>) {
		self.update_scheme(|scheme| scheme.set_client_id_and_secret(client_id, client_secret));
	}

	/// Refresh token returned with the cached access token.
	pub fn refresh_token(&self) -> Option<String> {
		if !S::EXPOSES_REFRESH_TOKEN {
			self.logger().warn("Refresh tokens are not available for assumed trusted profiles.");

			return None;
		}

		self.token_info().and_then(|info| info.refresh_token).map(TokenSecret::into_inner)
	}
}

/// Options for [`IamTokenManager`].
#[derive(Clone, Debug, Default)]
pub struct IamOptions {
	/// IAM apikey (required).
	pub apikey: Option<String>,
	/// Client id for the Basic authorization header.
	pub client_id: Option<String>,
	/// Client secret for the Basic authorization header.
	pub client_secret: Option<String>,
	/// Scope form field.
	pub scope: Option<String>,
	/// Shared manager options; `url` defaults to [`DEFAULT_IAM_URL`].
	pub manager: ManagerOptions,
}
impl IamOptions {
	/// Sets the apikey.
	pub fn with_apikey(mut self, apikey: impl Into<String>) -> Self {
		self.apikey = Some(apikey.into());

		self
	}

	/// Sets both client credentials.
	pub fn with_client_id_and_secret(
		mut self,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		self.client_id = Some(client_id.into());
		self.client_secret = Some(client_secret.into());

		self
	}

	/// Sets the scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the IAM URL.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.manager = self.manager.with_url(url);

		self
	}

	/// Replaces the shared manager options.
	pub fn with_manager(mut self, manager: ManagerOptions) -> Self {
		self.manager = manager;

		self
	}

	pub(crate) fn scheme(&self) -> Result<IamApikeyScheme> {
		Ok(IamApikeyScheme {
			apikey: scheme::require_credential("apikey", self.apikey.as_deref())?,
			request: IamRequest::new(
				self.client_id.as_deref(),
				self.client_secret.as_deref(),
				self.scope.as_deref(),
			),
		})
	}
}

/// Apikey grant against IAM.
#[derive(Clone, Debug)]
pub struct IamApikeyScheme {
	apikey: TokenSecret,
	request: IamRequest,
}
impl TokenScheme for IamApikeyScheme {
	const DEFAULT_URL: Option<&'static str> = Some(DEFAULT_IAM_URL);
	const EXPIRY_MARGIN: i64 = IAM_EXPIRY_MARGIN;
	const KIND: SchemeKind = SchemeKind::Iam;
	const OPERATION_PATHS: &'static [&'static str] = &[IAM_TOKEN_PATH];

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move {
			let request = self.request.build(
				ctx,
				form([
					("grant_type", APIKEY_GRANT_TYPE),
					("apikey", self.apikey.expose()),
					("response_type", "cloud_iam"),
				]),
			)?;

			ctx.send(request).await
		})
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, "access_token")?.with_refresh_token_from(response))
	}
}
impl IamRequestScheme for IamApikeyScheme {
	fn iam_request_mut(&mut self) -> &mut IamRequest {
		&mut self.request
	}
}

impl TokenManager<IamApikeyScheme> {
	/// Builds an IAM apikey token manager.
	pub fn new(options: IamOptions) -> Result<Self> {
		let scheme = options.scheme()?;

		Self::with_scheme(scheme, options.manager)
	}
}

/// Collects string pairs into a form body.
pub(crate) fn form<const N: usize>(fields: [(&str, &str); N]) -> BTreeMap<String, String> {
	fields.into_iter().map(|(name, value)| (name.to_owned(), value.to_owned())).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		error::ConfigError,
		http::{RequestBody, stub::StubHttpClient},
		obs::{LogLevel, RecordingLogger},
	};

	fn context(logger: Arc<RecordingLogger>) -> (Arc<StubHttpClient>, RequestContext) {
		let http = Arc::new(StubHttpClient::default().with_json(200, json!({ "access_token": "x" })));
		let ctx = RequestContext::new(DEFAULT_IAM_URL, http.clone(), logger);

		(http, ctx)
	}

	#[tokio::test]
	async fn apikey_form_carries_scope_and_client_credentials() {
		let (http, ctx) = context(Default::default());
		let scheme = IamOptions::default()
			.with_apikey("abc")
			.with_client_id_and_secret("bx", "bx")
			.with_scope("openid")
			.scheme()
			.expect("Options should be valid.");

		scheme.request_token(&ctx).await.expect("Stubbed request should succeed.");

		let request = &http.requests()[0];

		assert_eq!(request.method, Method::POST);
		assert_eq!(request.url.as_str(), "https://iam.cloud.ibm.com/identity/token");
		assert_eq!(request.header("authorization"), Some("Basic Yng6Yng="));
		assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
		assert_eq!(
			request.body,
			RequestBody::Form(form([
				("apikey", "abc"),
				("grant_type", APIKEY_GRANT_TYPE),
				("response_type", "cloud_iam"),
				("scope", "openid"),
			]))
		);
	}

	#[tokio::test]
	async fn lone_client_id_only_warns() {
		let logger = Arc::new(RecordingLogger::default());
		let (http, ctx) = context(logger.clone());
		let mut scheme =
			IamOptions::default().with_apikey("abc").scheme().expect("Options should be valid.");

		scheme.set_client_id_and_secret(Some("bx"), None);
		scheme.request_token(&ctx).await.expect("Stubbed request should succeed.");

		assert!(http.requests()[0].header("Authorization").is_none());
		assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
	}

	#[test]
	fn apikey_is_required_and_checked() {
		assert!(matches!(
			IamOptions::default().scheme(),
			Err(Error::Config(ConfigError::MissingOption { option: "apikey" }))
		));
		assert!(matches!(
			IamOptions::default().with_apikey("{abc}").scheme(),
			Err(Error::Config(ConfigError::InvalidCredential { option: "apikey" }))
		));
	}

	#[test]
	fn url_defaults_and_operation_path_is_stripped() {
		let options = ManagerOptions::default().with_http_client(Arc::new(StubHttpClient::default()));
		let default = IamTokenManager::new(
			IamOptions::default().with_apikey("abc").with_manager(options.clone()),
		)
		.expect("Manager should build.");
		let custom = IamTokenManager::new(
			IamOptions::default()
				.with_apikey("abc")
				.with_manager(options.with_url("https://iam.test.cloud.ibm.com/identity/token")),
		)
		.expect("Manager should build.");

		assert_eq!(default.service_url(), DEFAULT_IAM_URL);
		assert_eq!(custom.service_url(), "https://iam.test.cloud.ibm.com");
	}
}

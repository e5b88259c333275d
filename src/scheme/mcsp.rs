//! Multi-Cloud SaaS Platform (MCSP) v1 apikey exchange.

// crates.io
use ::http::Method;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{self, SchemeFuture, TokenScheme},
	token::{TokenInfo, TokenSecret},
};

/// Token operation path appended to the MCSP URL.
pub const MCSP_TOKEN_PATH: &str = "/siusermgr/api/1.0/apikeys/token";

/// MCSP v1 token manager.
pub type McspTokenManager = TokenManager<McspScheme>;

/// Options for [`McspTokenManager`].
#[derive(Clone, Debug, Default)]
pub struct McspOptions {
	/// MCSP apikey (required).
	pub apikey: Option<String>,
	/// Shared manager options; `url` is required.
	pub manager: ManagerOptions,
}
impl McspOptions {
	/// Sets the apikey.
	pub fn with_apikey(mut self, apikey: impl Into<String>) -> Self {
		self.apikey = Some(apikey.into());

		self
	}

	/// Sets the MCSP URL.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.manager = self.manager.with_url(url);

		self
	}

	/// Replaces the shared manager options.
	pub fn with_manager(mut self, manager: ManagerOptions) -> Self {
		self.manager = manager;

		self
	}

	pub(crate) fn scheme(&self) -> Result<McspScheme> {
		scheme::require("url", self.manager.url.as_deref())?;

		Ok(McspScheme { apikey: scheme::require_credential("apikey", self.apikey.as_deref())? })
	}
}

/// Apikey grant against MCSP v1.
#[derive(Clone, Debug)]
pub struct McspScheme {
	apikey: TokenSecret,
}
impl TokenScheme for McspScheme {
	const KIND: SchemeKind = SchemeKind::Mcsp;

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move {
			let request = ctx
				.request(Method::POST, ctx.endpoint(MCSP_TOKEN_PATH)?)
				.with_header("Content-Type", "application/json")
				.with_header("Accept", "application/json")
				.with_json(json!({ "apikey": self.apikey.expose() }));

			ctx.send(request).await
		})
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, "token")?)
	}
}

impl TokenManager<McspScheme> {
	/// Builds an MCSP v1 token manager.
	pub fn new(options: McspOptions) -> Result<Self> {
		let scheme = options.scheme()?;

		Self::with_scheme(scheme, options.manager)
	}
}

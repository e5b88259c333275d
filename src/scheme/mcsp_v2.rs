//! MCSP v2 apikey exchange with scoped role and action claims.

// crates.io
use ::http::Method;
use serde_json::{Map, json};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{self, SchemeFuture, TokenScheme},
	token::{TokenInfo, TokenSecret},
};

/// MCSP v2 token manager.
pub type McspV2TokenManager = TokenManager<McspV2Scheme>;

/// Options for [`McspV2TokenManager`].
#[derive(Clone, Debug)]
pub struct McspV2Options {
	/// MCSP apikey (required).
	pub apikey: Option<String>,
	/// Scope collection type, e.g. `accounts` (required).
	pub scope_collection_type: Option<String>,
	/// Scope id (required).
	pub scope_id: Option<String>,
	/// Include built-in actions in the token.
	pub include_builtin_actions: bool,
	/// Include custom actions in the token.
	pub include_custom_actions: bool,
	/// Include roles in the token.
	pub include_roles: bool,
	/// Prefix roles with their definition scope.
	pub prefix_roles_with_definition_scope: bool,
	/// Extra claims: a JSON object, or a string holding one.
	pub caller_ext_claim: Option<JsonValue>,
	/// Shared manager options; `url` is required.
	pub manager: ManagerOptions,
}
impl McspV2Options {
	/// Sets the apikey.
	pub fn with_apikey(mut self, apikey: impl Into<String>) -> Self {
		self.apikey = Some(apikey.into());

		self
	}

	/// Sets the scope collection type and scope id.
	pub fn with_scope(
		mut self,
		scope_collection_type: impl Into<String>,
		scope_id: impl Into<String>,
	) -> Self {
		self.scope_collection_type = Some(scope_collection_type.into());
		self.scope_id = Some(scope_id.into());

		self
	}

	/// Sets `includeBuiltinActions`.
	pub fn with_include_builtin_actions(mut self, include: bool) -> Self {
		self.include_builtin_actions = include;

		self
	}

	/// Sets `includeCustomActions`.
	pub fn with_include_custom_actions(mut self, include: bool) -> Self {
		self.include_custom_actions = include;

		self
	}

	/// Sets `includeRoles`.
	pub fn with_include_roles(mut self, include: bool) -> Self {
		self.include_roles = include;

		self
	}

	/// Sets `prefixRolesWithDefinitionScope`.
	pub fn with_prefix_roles_with_definition_scope(mut self, prefix: bool) -> Self {
		self.prefix_roles_with_definition_scope = prefix;

		self
	}

	/// Sets the caller extension claim.
	pub fn with_caller_ext_claim(mut self, claim: impl Into<JsonValue>) -> Self {
		self.caller_ext_claim = Some(claim.into());

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

	pub(crate) fn scheme(&self) -> Result<McspV2Scheme> {
		scheme::require("url", self.manager.url.as_deref())?;

		Ok(McspV2Scheme {
			apikey: scheme::require_credential("apikey", self.apikey.as_deref())?,
			scope_collection_type: scheme::require(
				"scope_collection_type",
				self.scope_collection_type.as_deref(),
			)?,
			scope_id: scheme::require("scope_id", self.scope_id.as_deref())?,
			include_builtin_actions: self.include_builtin_actions,
			include_custom_actions: self.include_custom_actions,
			include_roles: self.include_roles,
			prefix_roles_with_definition_scope: self.prefix_roles_with_definition_scope,
			caller_ext_claim: self.caller_ext_claim.as_ref().map(parse_caller_ext_claim).transpose()?,
		})
	}
}
impl Default for McspV2Options {
	fn default() -> Self {
		Self {
			apikey: None,
			scope_collection_type: None,
			scope_id: None,
			include_builtin_actions: false,
			include_custom_actions: false,
			include_roles: true,
			prefix_roles_with_definition_scope: false,
			caller_ext_claim: None,
			manager: ManagerOptions::default(),
		}
	}
}

/// Apikey grant against MCSP v2.
#[derive(Clone, Debug)]
pub struct McspV2Scheme {
	apikey: TokenSecret,
	scope_collection_type: String,
	scope_id: String,
	include_builtin_actions: bool,
	include_custom_actions: bool,
	include_roles: bool,
	prefix_roles_with_definition_scope: bool,
	caller_ext_claim: Option<Map<String, JsonValue>>,
}
impl McspV2Scheme {
	fn url(&self, ctx: &RequestContext) -> Result<Url> {
		let mut url = ctx.endpoint("")?;

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidOption {
				option: "url",
				reason: "the URL cannot carry a path".into(),
			})?
			.pop_if_empty()
			.extend([
				"api",
				"2.0",
				self.scope_collection_type.as_str(),
				self.scope_id.as_str(),
				"apikeys",
				"token",
			]);

		Ok(url)
	}
}
impl TokenScheme for McspV2Scheme {
	const KIND: SchemeKind = SchemeKind::McspV2;

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move {
			let mut body = json!({ "apikey": self.apikey.expose() });

			if let Some(claim) = &self.caller_ext_claim {
				body["callerExtClaim"] = JsonValue::Object(claim.clone());
			}

			let request = ctx
				.request(Method::POST, self.url(ctx)?)
				.with_query([
					("includeBuiltinActions", self.include_builtin_actions.to_string()),
					("includeCustomActions", self.include_custom_actions.to_string()),
					("includeRoles", self.include_roles.to_string()),
					(
						"prefixRolesWithDefinitionScope",
						self.prefix_roles_with_definition_scope.to_string(),
					),
				])
				.with_header("Content-Type", "application/json")
				.with_header("Accept", "application/json")
				.with_json(body);

			ctx.send(request).await
		})
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, "token")?)
	}
}

impl TokenManager<McspV2Scheme> {
	/// Builds an MCSP v2 token manager.
	pub fn new(options: McspV2Options) -> Result<Self> {
		let scheme = options.scheme()?;

		Self::with_scheme(scheme, options.manager)
	}
}

/// Accepts a JSON object, or a string containing a JSON object.
pub fn parse_caller_ext_claim(claim: &JsonValue) -> Result<Map<String, JsonValue>, ConfigError> {
	let parsed;
	let claim = match claim {
		JsonValue::String(raw) => {
			parsed = serde_json::from_str::<JsonValue>(raw).map_err(|e| {
				ConfigError::InvalidCallerExtClaim { reason: format!("not valid JSON ({e})") }
			})?;

			&parsed
		},
		other => other,
	};

	match claim {
		JsonValue::Object(map) => Ok(map.clone()),
		_ => Err(ConfigError::InvalidCallerExtClaim {
			reason: "expected a JSON object or a string holding one".into(),
		}),
	}
}

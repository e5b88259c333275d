//! VPC instance metadata token exchange.
//!
//! A token is obtained in two hops: an instance identity token from the metadata service,
//! then an IAM token for the instance's trusted profile in exchange for it.

// crates.io
use ::http::Method;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TokenParseError},
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{self, SchemeFuture, TokenScheme},
	token::TokenInfo,
};

/// Link-local metadata service address.
pub const DEFAULT_VPC_METADATA_URL: &str = "http://169.254.169.254";
/// Metadata service API version sent with every call.
pub const VPC_METADATA_VERSION: &str = "2022-03-01";

const INSTANCE_IDENTITY_TOKEN_PATH: &str = "/instance_identity/v1/token";
const INSTANCE_IAM_TOKEN_PATH: &str = "/instance_identity/v1/iam_token";
const INSTANCE_IDENTITY_TOKEN_TTL_SECS: u64 = 300;

/// VPC instance token manager.
pub type VpcInstanceTokenManager = TokenManager<VpcInstanceScheme>;

/// Trusted profile linked to the instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VpcProfile {
	/// Profile CRN.
	Crn(String),
	/// Profile id.
	Id(String),
}

/// Options for [`VpcInstanceTokenManager`].
#[derive(Clone, Debug, Default)]
pub struct VpcOptions {
	/// Trusted profile CRN.
	pub iam_profile_crn: Option<String>,
	/// Trusted profile id.
	pub iam_profile_id: Option<String>,
	/// Shared manager options; `url` defaults to [`DEFAULT_VPC_METADATA_URL`].
	pub manager: ManagerOptions,
}
impl VpcOptions {
	/// Sets the profile CRN.
	pub fn with_iam_profile_crn(mut self, crn: impl Into<String>) -> Self {
		self.iam_profile_crn = Some(crn.into());

		self
	}

	/// Sets the profile id.
	pub fn with_iam_profile_id(mut self, id: impl Into<String>) -> Self {
		self.iam_profile_id = Some(id.into());

		self
	}

	/// Replaces the shared manager options.
	pub fn with_manager(mut self, manager: ManagerOptions) -> Self {
		self.manager = manager;

		self
	}

	pub(crate) fn scheme(&self) -> Result<VpcInstanceScheme, ConfigError> {
		let profile = match (
			scheme::non_empty(self.iam_profile_crn.as_deref()),
			scheme::non_empty(self.iam_profile_id.as_deref()),
		) {
			(Some(_), Some(_)) =>
				return Err(ConfigError::conflicting(
					"at most one of iam_profile_crn or iam_profile_id may be set",
				)),
			(Some(crn), None) => Some(VpcProfile::Crn(crn.into())),
			(None, Some(id)) => Some(VpcProfile::Id(id.into())),
			(None, None) => None,
		};

		Ok(VpcInstanceScheme { profile })
	}
}

/// Instance identity grant against the VPC metadata service.
#[derive(Clone, Debug)]
pub struct VpcInstanceScheme {
	profile: Option<VpcProfile>,
}
impl VpcInstanceScheme {
	async fn instance_identity_token(&self, ctx: &RequestContext) -> Result<String> {
		let request = ctx
			.request(Method::PUT, ctx.endpoint(INSTANCE_IDENTITY_TOKEN_PATH)?)
			.with_query([("version", VPC_METADATA_VERSION)])
			.with_header("Content-Type", "application/json")
			.with_header("Accept", "application/json")
			.with_header("Metadata-Flavor", "ibm")
			.with_json(json!({ "expires_in": INSTANCE_IDENTITY_TOKEN_TTL_SECS }));
		let response = ctx.send(request).await?;

		response
			.get("access_token")
			.and_then(JsonValue::as_str)
			.filter(|token| !token.is_empty())
			.map(str::to_owned)
			.ok_or_else(|| TokenParseError::MissingField { field: "access_token" }.into())
	}
}
impl TokenScheme for VpcInstanceScheme {
	const DEFAULT_URL: Option<&'static str> = Some(DEFAULT_VPC_METADATA_URL);
	const KIND: SchemeKind = SchemeKind::VpcInstance;

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move {
			let identity_token = self.instance_identity_token(ctx).await?;
			let body = match &self.profile {
				Some(VpcProfile::Crn(crn)) => json!({ "trusted_profile": { "crn": crn } }),
				Some(VpcProfile::Id(id)) => json!({ "trusted_profile": { "id": id } }),
				None => json!({}),
			};
			let request = ctx
				.request(Method::POST, ctx.endpoint(INSTANCE_IAM_TOKEN_PATH)?)
				.with_query([("version", VPC_METADATA_VERSION)])
				.with_header("Content-Type", "application/json")
				.with_header("Accept", "application/json")
				.with_header("Authorization", format!("Bearer {identity_token}"))
				.with_json(body);

			ctx.send(request).await
		})
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, "access_token")?)
	}
}

impl TokenManager<VpcInstanceScheme> {
	/// Builds a VPC instance token manager.
	pub fn new(options: VpcOptions) -> Result<Self> {
		let scheme = options.scheme()?;

		Self::with_scheme(scheme, options.manager)
	}
}

//! Trusted profile "assume" exchange.
//!
//! The caller's apikey is first traded for a regular IAM token by a private
//! [`IamTokenManager`]; that token is then exchanged for a token of the trusted profile.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{
		self, IamOptions, IamRequest, IamRequestScheme, IamTokenManager, SchemeFuture, TokenScheme,
		iam::{DEFAULT_IAM_URL, IAM_EXPIRY_MARGIN, IAM_TOKEN_PATH, form},
	},
	token::TokenInfo,
};

const ASSUME_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:assume";

/// Trusted profile assume token manager.
pub type IamAssumeTokenManager = TokenManager<IamAssumeScheme>;

/// Trusted profile to assume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrustedProfile {
	/// Profile CRN.
	Crn(String),
	/// Profile id.
	Id(String),
	/// Profile name, which is only unique within an account.
	Name {
		/// Profile name.
		name: String,
		/// Account that owns the profile.
		account: String,
	},
}

/// Options for [`IamAssumeTokenManager`].
#[derive(Clone, Debug, Default)]
pub struct IamAssumeOptions {
	/// Apikey exchanged for the initial IAM token (required).
	pub apikey: Option<String>,
	/// Client id used when obtaining the initial IAM token.
	pub client_id: Option<String>,
	/// Client secret used when obtaining the initial IAM token.
	pub client_secret: Option<String>,
	/// Scope used when obtaining the initial IAM token.
	pub scope: Option<String>,
	/// Trusted profile CRN.
	pub iam_profile_crn: Option<String>,
	/// Trusted profile id.
	pub iam_profile_id: Option<String>,
	/// Trusted profile name; requires `iam_account_id`.
	pub iam_profile_name: Option<String>,
	/// Account owning the named profile.
	pub iam_account_id: Option<String>,
	/// Shared manager options, also used by the initial IAM exchange.
	pub manager: ManagerOptions,
}
impl IamAssumeOptions {
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

	/// Sets the profile name and the account owning it.
	pub fn with_iam_profile_name(
		mut self,
		name: impl Into<String>,
		account_id: impl Into<String>,
	) -> Self {
		self.iam_profile_name = Some(name.into());
		self.iam_account_id = Some(account_id.into());

		self
	}

	/// Replaces the shared manager options.
	pub fn with_manager(mut self, manager: ManagerOptions) -> Self {
		self.manager = manager;

		self
	}

	/// Validates the profile options.
	pub fn profile(&self) -> Result<TrustedProfile, ConfigError> {
		let crn = scheme::non_empty(self.iam_profile_crn.as_deref());
		let id = scheme::non_empty(self.iam_profile_id.as_deref());
		let name = scheme::non_empty(self.iam_profile_name.as_deref());
		let account = scheme::non_empty(self.iam_account_id.as_deref());

		match (crn, id, name, account) {
			(Some(crn), None, None, None) => Ok(TrustedProfile::Crn(crn.into())),
			(None, Some(id), None, None) => Ok(TrustedProfile::Id(id.into())),
			(None, None, Some(name), Some(account)) =>
				Ok(TrustedProfile::Name { name: name.into(), account: account.into() }),
			(None, None, Some(_), None) =>
				Err(ConfigError::conflicting("iam_account_id must be set together with iam_profile_name")),
			(_, _, None, Some(_)) if crn.is_some() != id.is_some() =>
				Err(ConfigError::conflicting("iam_account_id is only valid with iam_profile_name")),
			_ => Err(ConfigError::conflicting(
				"exactly one of iam_profile_crn, iam_profile_id or iam_profile_name must be set",
			)),
		}
	}
}

/// Assume grant against IAM.
#[derive(Clone, Debug)]
pub struct IamAssumeScheme {
	profile: TrustedProfile,
	delegate: IamTokenManager,
	request: IamRequest,
}
impl IamAssumeScheme {
	/// Profile this scheme assumes.
	pub fn profile(&self) -> &TrustedProfile {
		&self.profile
	}
}
impl TokenScheme for IamAssumeScheme {
	const DEFAULT_URL: Option<&'static str> = Some(DEFAULT_IAM_URL);
	const EXPIRY_MARGIN: i64 = IAM_EXPIRY_MARGIN;
	const KIND: SchemeKind = SchemeKind::IamAssume;
	const OPERATION_PATHS: &'static [&'static str] = &[IAM_TOKEN_PATH];

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move {
			let access_token = self.delegate.get_token().await?;
			let mut fields =
				form([("grant_type", ASSUME_GRANT_TYPE), ("access_token", access_token.as_str())]);

			match &self.profile {
				TrustedProfile::Crn(crn) => {
					fields.insert("profile_crn".into(), crn.clone());
				},
				TrustedProfile::Id(id) => {
					fields.insert("profile_id".into(), id.clone());
				},
				TrustedProfile::Name { name, account } => {
					fields.insert("profile_name".into(), name.clone());
					fields.insert("account".into(), account.clone());
				},
			}

			ctx.send(self.request.build(ctx, fields)?).await
		})
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, "access_token")?)
	}

	fn headers_changed(&self, headers: &BTreeMap<String, String>) {
		self.delegate.set_headers(headers.clone());
	}

	fn ssl_verification_changed(&self, disabled: bool) {
		self.delegate.set_disable_ssl_verification(disabled);
	}
}
impl IamRequestScheme for IamAssumeScheme {
	const EXPOSES_REFRESH_TOKEN: bool = false;

	fn iam_request_mut(&mut self) -> &mut IamRequest {
		&mut self.request
	}

	fn set_scope(&mut self, scope: Option<&str>) {
		self.delegate.set_scope(scope);
	}

	fn set_client_id_and_secret(&mut self, client_id: Option<&str>, client_secret: Option<&str>) {
		self.delegate.set_client_id_and_secret(client_id, client_secret);
	}
}

impl TokenManager<IamAssumeScheme> {
	/// Builds an assume token manager together with its private IAM manager.
	pub fn new(options: IamAssumeOptions) -> Result<Self> {
		let profile = options.profile()?;
		let manager = options.manager.with_default_services()?;
		let delegate = IamTokenManager::new(IamOptions {
			apikey: options.apikey,
			client_id: options.client_id,
			client_secret: options.client_secret,
			scope: options.scope,
			manager: manager.clone(),
		})?;

		Self::with_scheme(IamAssumeScheme { profile, delegate, request: IamRequest::default() }, manager)
	}
}

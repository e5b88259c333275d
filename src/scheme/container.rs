//! Compute-resource token exchange for workloads running in IBM Cloud containers.

// std
use std::{fs, io};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TokenRequestError},
	manager::{ManagerOptions, RequestContext, TokenManager},
	obs::SchemeKind,
	scheme::{
		self, IamRequest, IamRequestScheme, SchemeFuture, TokenScheme,
		iam::{DEFAULT_IAM_URL, IAM_EXPIRY_MARGIN, IAM_TOKEN_PATH, form},
	},
	token::TokenInfo,
};

/// Files tried, in order, when no CR token filename is configured.
pub const DEFAULT_CR_TOKEN_FILES: [&str; 3] = [
	"/var/run/secrets/tokens/vault-token",
	"/var/run/secrets/tokens/sa-token",
	"/var/run/secrets/codeengine.cloud.ibm.com/compute-resource-token/token",
];

const CR_TOKEN_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:cr-token";

/// Container token manager.
pub type ContainerTokenManager = TokenManager<ContainerScheme>;

/// Reads compute-resource token files.
pub trait CrTokenReader
where
	Self: Debug + Send + Sync,
{
	/// Returns the raw file contents at `path`.
	fn read(&self, path: &str) -> io::Result<String>;
}

/// Reads CR tokens from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsCrTokenReader;
impl CrTokenReader for FsCrTokenReader {
	fn read(&self, path: &str) -> io::Result<String> {
		fs::read_to_string(path)
	}
}

/// Options for [`ContainerTokenManager`].
#[derive(Clone, Debug, Default)]
pub struct ContainerOptions {
	/// CR token file; when unset, [`DEFAULT_CR_TOKEN_FILES`] are tried.
	pub cr_token_filename: Option<String>,
	/// Trusted profile name.
	pub iam_profile_name: Option<String>,
	/// Trusted profile id.
	pub iam_profile_id: Option<String>,
	/// Client id for the Basic authorization header.
	pub client_id: Option<String>,
	/// Client secret for the Basic authorization header.
	pub client_secret: Option<String>,
	/// Scope form field.
	pub scope: Option<String>,
	/// File reader; defaults to [`FsCrTokenReader`].
	pub cr_token_reader: Option<Arc<dyn CrTokenReader>>,
	/// Shared manager options; `url` defaults to the production IAM endpoint.
	pub manager: ManagerOptions,
}
impl ContainerOptions {
	/// Sets the CR token file.
	pub fn with_cr_token_filename(mut self, filename: impl Into<String>) -> Self {
		self.cr_token_filename = Some(filename.into());

		self
	}

	/// Sets the trusted profile name.
	pub fn with_iam_profile_name(mut self, name: impl Into<String>) -> Self {
		self.iam_profile_name = Some(name.into());

		self
	}

	/// Sets the trusted profile id.
	pub fn with_iam_profile_id(mut self, id: impl Into<String>) -> Self {
		self.iam_profile_id = Some(id.into());

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

	/// Overrides how CR token files are read.
	pub fn with_cr_token_reader(mut self, reader: Arc<dyn CrTokenReader>) -> Self {
		self.cr_token_reader = Some(reader);

		self
	}

	/// Replaces the shared manager options.
	pub fn with_manager(mut self, manager: ManagerOptions) -> Self {
		self.manager = manager;

		self
	}

	pub(crate) fn scheme(&self) -> Result<ContainerScheme> {
		let profile_name = scheme::non_empty(self.iam_profile_name.as_deref()).map(str::to_owned);
		let profile_id = scheme::non_empty(self.iam_profile_id.as_deref()).map(str::to_owned);

		if profile_name.is_none() && profile_id.is_none() {
			return Err(ConfigError::conflicting(
				"at least one of iam_profile_name or iam_profile_id must be set",
			)
			.into());
		}

		Ok(ContainerScheme {
			cr_token_filename: scheme::non_empty(self.cr_token_filename.as_deref()).map(str::to_owned),
			profile_name,
			profile_id,
			reader: self.cr_token_reader.clone().unwrap_or_else(|| Arc::new(FsCrTokenReader)),
			request: IamRequest::new(
				self.client_id.as_deref(),
				self.client_secret.as_deref(),
				self.scope.as_deref(),
			),
		})
	}
}

/// CR token grant against IAM.
#[derive(Clone, Debug)]
pub struct ContainerScheme {
	cr_token_filename: Option<String>,
	profile_name: Option<String>,
	profile_id: Option<String>,
	reader: Arc<dyn CrTokenReader>,
	request: IamRequest,
}
impl ContainerScheme {
	/// Reads the current CR token; the file is consulted on every call.
	pub fn read_cr_token(&self) -> Result<String, TokenRequestError> {
		if let Some(path) = &self.cr_token_filename {
			return self.read_one(path).map_err(|message| TokenRequestError::CrToken {
				path: path.clone(),
				message,
			});
		}

		DEFAULT_CR_TOKEN_FILES.iter().find_map(|path| self.read_one(path).ok()).ok_or_else(|| {
			TokenRequestError::CrToken {
				path: DEFAULT_CR_TOKEN_FILES.join(", "),
				message: "none of the default files holds a token".into(),
			}
		})
	}

	fn read_one(&self, path: &str) -> Result<String, String> {
		let raw = self.reader.read(path).map_err(|e| e.to_string())?;
		let token = raw.trim();

		if token.is_empty() {
			return Err("the file is empty".into());
		}

		Ok(token.to_owned())
	}
}
impl TokenScheme for ContainerScheme {
	const DEFAULT_URL: Option<&'static str> = Some(DEFAULT_IAM_URL);
	const EXPIRY_MARGIN: i64 = IAM_EXPIRY_MARGIN;
	const KIND: SchemeKind = SchemeKind::Container;
	const OPERATION_PATHS: &'static [&'static str] = &[IAM_TOKEN_PATH];

	fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
		Box::pin(async move {
			let cr_token = self.read_cr_token()?;
			let mut fields = form([("grant_type", CR_TOKEN_GRANT_TYPE), ("cr_token", cr_token.as_str())]);

			if let Some(name) = &self.profile_name {
				fields.insert("profile_name".into(), name.clone());
			}
			if let Some(id) = &self.profile_id {
				fields.insert("profile_id".into(), id.clone());
			}

			ctx.send(self.request.build(ctx, fields)?).await
		})
	}

	fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
		Ok(TokenInfo::from_response(response, "access_token")?.with_refresh_token_from(response))
	}
}
impl IamRequestScheme for ContainerScheme {
	fn iam_request_mut(&mut self) -> &mut IamRequest {
		&mut self.request
	}
}

impl TokenManager<ContainerScheme> {
	/// Builds a container token manager.
	pub fn new(options: ContainerOptions) -> Result<Self> {
		let scheme = options.scheme()?;

		Self::with_scheme(scheme, options.manager)
	}

	/// Points future requests at a specific CR token file.
	pub fn set_cr_token_filename(&self, filename: impl Into<String>) {
		let filename = filename.into();

		self.update_scheme(|scheme| scheme.cr_token_filename = Some(filename));
	}

	/// Sets the trusted profile name sent with future requests.
	pub fn set_iam_profile_name(&self, name: impl Into<String>) {
		let name = name.into();

		self.update_scheme(|scheme| scheme.profile_name = Some(name));
	}

	/// Sets the trusted profile id sent with future requests.
	pub fn set_iam_profile_id(&self, id: impl Into<String>) {
		let id = id.into();

		self.update_scheme(|scheme| scheme.profile_id = Some(id));
	}

	/// Configured CR token file, if any.
	pub fn cr_token_filename(&self) -> Option<String> {
		self.read_scheme(|scheme| scheme.cr_token_filename.clone())
	}
}

// crates.io
use ::http::HeaderMap;
// self
use crate::{
	_prelude::*,
	authenticator::{self, AuthFuture, AuthType, Authenticator},
	manager::TokenManager,
	scheme::{
		ContainerOptions, ContainerScheme, Cp4dOptions, Cp4dScheme, IamApikeyScheme,
		IamAssumeOptions, IamAssumeScheme, IamOptions, McspOptions, McspScheme, McspV2Options,
		McspV2Scheme, TokenScheme, VpcInstanceScheme, VpcOptions,
	},
};

/// IAM apikey authenticator.
pub type IamAuthenticator = TokenAuthenticator<IamApikeyScheme>;
/// Container (compute-resource token) authenticator.
pub type ContainerAuthenticator = TokenAuthenticator<ContainerScheme>;
/// Trusted profile assume authenticator.
pub type IamAssumeAuthenticator = TokenAuthenticator<IamAssumeScheme>;
/// Cloud Pak for Data authenticator.
pub type CloudPakForDataAuthenticator = TokenAuthenticator<Cp4dScheme>;
/// VPC instance authenticator.
pub type VpcInstanceAuthenticator = TokenAuthenticator<VpcInstanceScheme>;
/// MCSP v1 authenticator.
pub type McspAuthenticator = TokenAuthenticator<McspScheme>;
/// MCSP v2 authenticator.
pub type McspV2Authenticator = TokenAuthenticator<McspV2Scheme>;

/// Scheme options that can build their token manager.
pub trait IntoTokenManager {
	/// Scheme driven by the resulting manager.
	type Scheme: TokenScheme;

	/// Validates the options and builds the manager.
	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>>;
}
impl IntoTokenManager for IamOptions {
	type Scheme = IamApikeyScheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<IamApikeyScheme>::new(self)
	}
}
impl IntoTokenManager for ContainerOptions {
	type Scheme = ContainerScheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<ContainerScheme>::new(self)
	}
}
impl IntoTokenManager for IamAssumeOptions {
	type Scheme = IamAssumeScheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<IamAssumeScheme>::new(self)
	}
}
impl IntoTokenManager for Cp4dOptions {
	type Scheme = Cp4dScheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<Cp4dScheme>::new(self)
	}
}
impl IntoTokenManager for VpcOptions {
	type Scheme = VpcInstanceScheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<VpcInstanceScheme>::new(self)
	}
}
impl IntoTokenManager for McspOptions {
	type Scheme = McspScheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<McspScheme>::new(self)
	}
}
impl IntoTokenManager for McspV2Options {
	type Scheme = McspV2Scheme;

	fn into_token_manager(self) -> Result<TokenManager<Self::Scheme>> {
		TokenManager::<McspV2Scheme>::new(self)
	}
}

/// Sends a bearer token obtained from a [`TokenManager`].
pub struct TokenAuthenticator<S>
where
	S: TokenScheme,
{
	manager: TokenManager<S>,
}
impl<S> TokenAuthenticator<S>
where
	S: TokenScheme,
{
	/// Builds the token manager described by `options`.
	pub fn new<O>(options: O) -> Result<Self>
	where
		O: IntoTokenManager<Scheme = S>,
	{
		Ok(Self::from_manager(options.into_token_manager()?))
	}

	/// Wraps an existing manager; clones of it share the token cache.
	pub fn from_manager(manager: TokenManager<S>) -> Self {
		Self { manager }
	}

	/// Manager used to obtain tokens.
	pub fn token_manager(&self) -> &TokenManager<S> {
		&self.manager
	}
}
impl<S> Authenticator for TokenAuthenticator<S>
where
	S: TokenScheme,
{
	fn authentication_type(&self) -> AuthType {
		S::KIND.into()
	}

	fn authenticate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthFuture<'a> {
		Box::pin(async move {
			let token = self.manager.get_token().await?;

			authenticator::set_authorization(headers, &format!("Bearer {token}"))
		})
	}
}
impl<S> Debug for TokenAuthenticator<S>
where
	S: TokenScheme,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("TokenAuthenticator").field("manager", &self.manager).finish()
	}
}

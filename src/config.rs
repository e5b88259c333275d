//! Authenticator construction from external configuration.
//!
//! Properties are flat `NAME -> value` maps keyed by upper-case names such as `AUTH_TYPE`,
//! `APIKEY` or `AUTH_URL`. [`EnvConfigLoader`] reads them from `<SERVICE>_<NAME>` environment
//! variables; [`MapConfigLoader`] serves them from memory.

// std
use std::{env, ffi::OsString};
// self
use crate::{
	_prelude::*,
	authenticator::{
		AuthType, Authenticator, BasicAuthenticator, BearerTokenAuthenticator, NoAuthAuthenticator,
		TokenAuthenticator,
	},
	error::ConfigError,
	manager::ManagerOptions,
	scheme::{
		self, ContainerOptions, Cp4dEndpoint, Cp4dOptions, IamAssumeOptions, IamOptions,
		McspOptions, McspV2Options, VpcOptions,
	},
};

/// Source of per-service configuration properties.
pub trait ExternalConfigLoader
where
	Self: Send + Sync,
{
	/// Returns the properties of `service_name`, or `None` when nothing is configured.
	fn load(&self, service_name: &str) -> Option<BTreeMap<String, String>>;
}

/// Reads `<SERVICE>_<PROPERTY>` environment variables.
///
/// The service name is upper-cased and `-` becomes `_`, so service `my-service` reads
/// `MY_SERVICE_APIKEY` as property `APIKEY`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvConfigLoader;
impl ExternalConfigLoader for EnvConfigLoader {
	fn load(&self, service_name: &str) -> Option<BTreeMap<String, String>> {
		properties_from_vars(service_name, unicode_vars(env::vars_os()))
	}
}

/// In-memory properties keyed by service name.
#[derive(Clone, Debug, Default)]
pub struct MapConfigLoader {
	services: BTreeMap<String, BTreeMap<String, String>>,
}
impl MapConfigLoader {
	/// Adds or replaces the properties of one service.
	pub fn with_service<I, K, V>(mut self, service_name: impl Into<String>, properties: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.services.insert(
			service_name.into(),
			properties.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		);

		self
	}
}
impl ExternalConfigLoader for MapConfigLoader {
	fn load(&self, service_name: &str) -> Option<BTreeMap<String, String>> {
		self.services.get(service_name).filter(|properties| !properties.is_empty()).cloned()
	}
}

/// Loads the properties of `service_name` and builds the authenticator they describe.
pub fn authenticator_from_config(
	loader: &dyn ExternalConfigLoader,
	service_name: &str,
	manager: ManagerOptions,
) -> Result<Arc<dyn Authenticator>> {
	let properties = loader
		.load(service_name)
		.ok_or_else(|| ConfigError::NoExternalConfig { service: service_name.to_owned() })?;

	authenticator_from_properties(&properties, manager)
}

/// Builds an authenticator from configuration properties.
///
/// `AUTH_TYPE` selects the authenticator; when it is absent, `iam` is used if `APIKEY` is set
/// and `container` otherwise. `AUTH_URL` and `AUTH_DISABLE_SSL` override the matching fields of
/// `manager`.
pub fn authenticator_from_properties(
	properties: &BTreeMap<String, String>,
	manager: ManagerOptions,
) -> Result<Arc<dyn Authenticator>> {
	let props = Properties(properties);
	let auth_type = match props.get("AUTH_TYPE") {
		Some(value) => value.parse()?,
		None if props.get("APIKEY").is_some() => AuthType::Iam,
		None => AuthType::Container,
	};
	let mut manager = manager;

	if let Some(url) = props.get("AUTH_URL") {
		manager.url = Some(url.to_owned());
	}
	if let Some(disable) = props.bool("AUTH_DISABLE_SSL")? {
		manager.disable_ssl_verification = disable;
	}

	let authenticator: Arc<dyn Authenticator> = match auth_type {
		AuthType::Basic => Arc::new(BasicAuthenticator::new(
			props.get("USERNAME").unwrap_or_default(),
			props.get("PASSWORD").unwrap_or_default(),
		)?),
		AuthType::BearerToken =>
			Arc::new(BearerTokenAuthenticator::new(props.get("BEARER_TOKEN").unwrap_or_default())?),
		AuthType::NoAuth => Arc::new(NoAuthAuthenticator),
		AuthType::Iam => Arc::new(TokenAuthenticator::new(IamOptions {
			apikey: props.owned("APIKEY"),
			client_id: props.owned("CLIENT_ID"),
			client_secret: props.owned("CLIENT_SECRET"),
			scope: props.owned("SCOPE"),
			manager,
		})?),
		AuthType::Container => Arc::new(TokenAuthenticator::new(ContainerOptions {
			cr_token_filename: props.owned("CR_TOKEN_FILENAME"),
			iam_profile_name: props.owned("IAM_PROFILE_NAME"),
			iam_profile_id: props.owned("IAM_PROFILE_ID"),
			client_id: props.owned("CLIENT_ID"),
			client_secret: props.owned("CLIENT_SECRET"),
			scope: props.owned("SCOPE"),
			cr_token_reader: None,
			manager,
		})?),
		AuthType::IamAssume => Arc::new(TokenAuthenticator::new(IamAssumeOptions {
			apikey: props.owned("APIKEY"),
			client_id: props.owned("CLIENT_ID"),
			client_secret: props.owned("CLIENT_SECRET"),
			scope: props.owned("SCOPE"),
			iam_profile_crn: props.owned("IAM_PROFILE_CRN"),
			iam_profile_id: props.owned("IAM_PROFILE_ID"),
			iam_profile_name: props.owned("IAM_PROFILE_NAME"),
			iam_account_id: props.owned("IAM_ACCOUNT_ID"),
			manager,
		})?),
		AuthType::Cp4d => {
			let endpoint = match props.bool("VALIDATE_AUTH")? {
				Some(true) => Cp4dEndpoint::ValidateAuth,
				Some(false) => Cp4dEndpoint::Authorize,
				None if props.get("APIKEY").is_some() => Cp4dEndpoint::Authorize,
				None => Cp4dEndpoint::ValidateAuth,
			};

			Arc::new(TokenAuthenticator::new(Cp4dOptions {
				username: props.owned("USERNAME"),
				password: props.owned("PASSWORD"),
				apikey: props.owned("APIKEY"),
				endpoint,
				manager,
			})?)
		},
		AuthType::Vpc => Arc::new(TokenAuthenticator::new(VpcOptions {
			iam_profile_crn: props.owned("IAM_PROFILE_CRN"),
			iam_profile_id: props.owned("IAM_PROFILE_ID"),
			manager,
		})?),
		AuthType::Mcsp => Arc::new(TokenAuthenticator::new(McspOptions {
			apikey: props.owned("APIKEY"),
			manager,
		})?),
		AuthType::McspV2 => {
			let defaults = McspV2Options::default();

			Arc::new(TokenAuthenticator::new(McspV2Options {
				apikey: props.owned("APIKEY"),
				scope_collection_type: props.owned("SCOPE_COLLECTION_TYPE"),
				scope_id: props.owned("SCOPE_ID"),
				include_builtin_actions: props
					.bool("INCLUDE_BUILTIN_ACTIONS")?
					.unwrap_or(defaults.include_builtin_actions),
				include_custom_actions: props
					.bool("INCLUDE_CUSTOM_ACTIONS")?
					.unwrap_or(defaults.include_custom_actions),
				include_roles: props.bool("INCLUDE_ROLES")?.unwrap_or(defaults.include_roles),
				prefix_roles_with_definition_scope: props
					.bool("PREFIX_ROLES")?
					.unwrap_or(defaults.prefix_roles_with_definition_scope),
				caller_ext_claim: props.owned("CALLER_EXT_CLAIM").map(JsonValue::String),
				manager,
			})?)
		},
	};

	Ok(authenticator)
}

/// Collects the variables that start with the service prefix, keyed by the remainder.
pub(crate) fn properties_from_vars<I>(service_name: &str, vars: I) -> Option<BTreeMap<String, String>>
where
	I: IntoIterator<Item = (String, String)>,
{
	let prefix = format!("{}_", service_name.to_uppercase().replace('-', "_"));
	let properties = vars
		.into_iter()
		.filter_map(|(name, value)| {
			name.strip_prefix(&prefix)
				.filter(|property| !property.is_empty())
				.map(|property| (property.to_owned(), value))
		})
		.collect::<BTreeMap<_, _>>();

	if properties.is_empty() { None } else { Some(properties) }
}

/// Drops variables whose name or value is not valid UTF-8.
pub(crate) fn unicode_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
	I: IntoIterator<Item = (OsString, OsString)>,
{
	vars.into_iter()
		.filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

struct Properties<'a>(&'a BTreeMap<String, String>);
impl Properties<'_> {
	fn get(&self, name: &str) -> Option<&str> {
		scheme::non_empty(self.0.get(name).map(String::as_str))
	}

	fn owned(&self, name: &str) -> Option<String> {
		self.get(name).map(str::to_owned)
	}

	fn bool(&self, name: &'static str) -> Result<Option<bool>, ConfigError> {
		match self.get(name) {
			None => Ok(None),
			Some(value) if value.eq_ignore_ascii_case("true") => Ok(Some(true)),
			Some(value) if value.eq_ignore_ascii_case("false") => Ok(Some(false)),
			Some(value) => Err(ConfigError::InvalidOption {
				option: name,
				reason: format!("expected `true` or `false`, got `{value}`"),
			}),
		}
	}
}

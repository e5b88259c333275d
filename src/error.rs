//! Crate-level error types shared across token managers, schemes, and authenticators.
//!
//! Every error is `Clone` so a single failed refresh can be handed to each caller that queued
//! behind it.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shared, cloneable error source.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fix the options instead of retrying.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The token service call failed or could not be assembled.
	#[error(transparent)]
	TokenRequest(#[from] TokenRequestError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The token service answered, but the payload was unusable.
	#[error(transparent)]
	TokenParse(#[from] TokenParseError),
}

/// Configuration and validation failures raised while constructing managers.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// A required option was not supplied.
	#[error("Missing required option `{option}`.")]
	MissingOption {
		/// Option name.
		option: &'static str,
	},
	/// Mutually exclusive options were combined, or none of a required group was set.
	#[error("Conflicting options: {message}.")]
	ConflictingOptions {
		/// Human-readable description of the conflict.
		message: String,
	},
	/// An option carried an unusable value.
	#[error("Option `{option}` is invalid: {reason}.")]
	InvalidOption {
		/// Option name.
		option: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// A URL option could not be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The MCSP v2 caller extension claim is neither a JSON object nor a JSON object string.
	#[error("The callerExtClaim option is invalid: {reason}.")]
	InvalidCallerExtClaim {
		/// Why the claim was rejected.
		reason: String,
	},
	/// A credential value is wrapped in braces or quotes, which usually means a copy/paste slip.
	#[error(
		"The `{option}` value must not start or end with curly brackets or quotes. Remove them from your credential."
	)]
	InvalidCredential {
		/// Option name.
		option: &'static str,
	},
	/// The external configuration named an unknown authenticator type.
	#[error("Unsupported authentication type `{value}`.")]
	UnsupportedAuthType {
		/// Raw type name.
		value: String,
	},
	/// The external configuration loader had no properties for the service.
	#[error("No external configuration found for service `{service}`.")]
	NoExternalConfig {
		/// Service name that was looked up.
		service: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// No transport was supplied and the default reqwest transport is disabled.
	#[error("No HTTP client was supplied and the `reqwest` feature is disabled.")]
	MissingHttpClient,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}

	pub(crate) fn conflicting(message: impl Into<String>) -> Self {
		Self::ConflictingOptions { message: message.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures while obtaining a token from the token service.
#[derive(Clone, Debug, ThisError)]
pub enum TokenRequestError {
	/// Token service returned a non-success status.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Body preview or status summary.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The compute-resource token file could not be used.
	#[error("Unable to read the CR token from {path}: {message}.")]
	CrToken {
		/// File (or list of files) consulted.
		path: String,
		/// What went wrong.
		message: String,
	},
	/// The refresh this caller was waiting on was dropped before it settled.
	#[error("The in-flight token request was abandoned before completing.")]
	Abandoned,
	/// A header value could not be encoded.
	#[error("Header `{name}` contains characters that are not allowed in HTTP headers.")]
	HeaderValue {
		/// Header name.
		name: String,
	},
}

/// Transport-level failures (network, timeouts).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The request timed out.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Token service payloads that cannot be turned into cached token state.
#[derive(Clone, Debug, ThisError)]
pub enum TokenParseError {
	/// The response did not carry the expected token field.
	#[error("Access token not present in response (expected field `{field}`).")]
	MissingField {
		/// Field name the scheme reads the token from.
		field: &'static str,
	},
	/// The token is not a decodable JSON Web Token.
	#[error("Access token is not a valid JWT: {reason}.")]
	InvalidJwt {
		/// Decoding failure summary.
		reason: String,
	},
	/// The response body is not JSON.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedBody {
		/// Structured parsing failure.
		#[source]
		source: SharedError,
	},
}

//! Transport primitives for token service exchanges.
//!
//! Token managers never talk to sockets directly. Each scheme assembles a [`TokenRequest`]
//! and hands it to a [`TokenHttpClient`], the crate's only dependency on an HTTP stack.
//! The default [`ReqwestHttpClient`] is available behind the `reqwest` feature; custom
//! transports (mocks, proxies, bespoke SDK stacks) implement the trait themselves.

// crates.io
use ::http::{HeaderMap, Method, header::RETRY_AFTER};
use base64::{Engine, engine::general_purpose::STANDARD};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenHttpClient::execute`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenHttpResponse>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing token service requests.
///
/// Implementations must report non-success statuses as a normal [`TokenHttpResponse`];
/// only failures that prevent a response (DNS, TCP, TLS, timeouts) should surface as errors.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the full response body is available.
	fn execute(&self, request: TokenRequest) -> HttpFuture<'_>;
}

/// Body attached to a [`TokenRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// `application/x-www-form-urlencoded` fields.
	Form(BTreeMap<String, String>),
	/// JSON document.
	Json(JsonValue),
}

/// Fully assembled token service request.
#[derive(Clone, Debug)]
pub struct TokenRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL, including any query parameters.
	pub url: Url,
	/// Request headers; see [`TokenRequest::with_header`] for replacement rules.
	pub headers: BTreeMap<String, String>,
	/// Request body.
	pub body: RequestBody,
	/// Skips TLS certificate and hostname verification when true.
	pub disable_ssl_verification: bool,
}
impl TokenRequest {
	/// Creates a request with no headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self {
			method,
			url,
			headers: BTreeMap::new(),
			body: RequestBody::Empty,
			disable_ssl_verification: false,
		}
	}

	/// Sets a header, replacing any existing header whose name matches ignoring ASCII case.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let name = name.into();

		self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
		self.headers.insert(name, value.into());

		self
	}

	/// Appends query parameters to the URL.
	pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		self.url.query_pairs_mut().extend_pairs(pairs);

		self
	}

	/// Attaches a form body.
	pub fn with_form(mut self, form: BTreeMap<String, String>) -> Self {
		self.body = RequestBody::Form(form);

		self
	}

	/// Attaches a JSON body.
	pub fn with_json(mut self, json: JsonValue) -> Self {
		self.body = RequestBody::Json(json);

		self
	}

	/// Returns a header value, matching the name ignoring ASCII case.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Response captured by a [`TokenHttpClient`].
#[derive(Clone, Debug, Default)]
pub struct TokenHttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl TokenHttpResponse {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Lossy UTF-8 preview of the body, truncated for error messages.
	pub fn body_preview(&self) -> String {
		let body = String::from_utf8_lossy(&self.body);

		if body.chars().count() <= Self::BODY_PREVIEW_LIMIT {
			return body.into_owned();
		}

		let mut buf = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect::<String>();

		buf.push('…');

		buf
	}
}

/// reqwest-backed transport.
///
/// Two clients are kept so per-request TLS verification can follow the manager's
/// `disable_ssl_verification` flag. Token endpoints answer directly, so redirects are
/// never followed.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
	verified: ReqwestClient,
	unverified: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds both the verifying and non-verifying clients.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let verified = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;
		let unverified = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?;

		Ok(Self { verified, unverified })
	}

	/// Wraps caller-provided clients (e.g. with proxies or custom roots).
	pub fn with_clients(verified: ReqwestClient, unverified: ReqwestClient) -> Self {
		Self { verified, unverified }
	}

	fn client(&self, disable_ssl_verification: bool) -> &ReqwestClient {
		if disable_ssl_verification { &self.unverified } else { &self.verified }
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn execute(&self, request: TokenRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let client = self.client(request.disable_ssl_verification);
			let mut builder = client.request(request.method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}

			builder = match request.body {
				RequestBody::Empty => builder,
				RequestBody::Form(form) => builder.form(&form),
				RequestBody::Json(json) => builder.body(json.to_string()),
			};

			let response = builder.send().await.map_err(crate::error::TransportError::from)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(crate::error::TransportError::from)?.to_vec();

			Ok(TokenHttpResponse { status, retry_after, body })
		})
	}
}

/// Builds an `Authorization: Basic` value from a user/secret pair.
pub fn basic_auth_value(user: &str, secret: &str) -> String {
	format!("Basic {}", STANDARD.encode(format!("{user}:{secret}")))
}

/// Parses a `Retry-After` header given either as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

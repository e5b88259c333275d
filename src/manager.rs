//! Token caching and request pacing shared by every token scheme.
//!
//! [`TokenManager`] owns the cached [`TokenInfo`] for one scheme and decides, on each
//! [`TokenManager::get_token`] call, whether to hand out the cached token, join a request that
//! is already in flight, or start a new one. Only one network request runs at a time per
//! manager; concurrent callers wait for its outcome, and an in-flight marker older than
//! [`PACING_WINDOW_SECS`] is treated as stuck so a new caller can take over.
//!
//! When a still-valid token passes its refresh instant, the manager refreshes it on the
//! current tokio runtime while the caller keeps using the cached token.

mod metrics;

pub use self::metrics::RequestMetrics;

// std
use std::mem;
// crates.io
use ::http::Method;
use tokio::{runtime::Handle, sync::oneshot};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	error::{ConfigError, TokenParseError, TokenRequestError},
	http::{TokenHttpClient, TokenRequest},
	obs::{Logger, RequestOutcome, RequestSpan, TracingLogger},
	scheme::{self, TokenScheme},
	token::{TokenInfo, TokenSecret},
};

/// Seconds a token request may stay in flight before another caller may start a new one.
pub const PACING_WINDOW_SECS: i64 = 60;

/// Options shared by every token manager.
#[derive(Clone, Default)]
pub struct ManagerOptions {
	/// Token service base URL; schemes with a default endpoint fall back to it.
	pub url: Option<String>,
	/// Extra headers sent with every token request.
	pub headers: BTreeMap<String, String>,
	/// Skips TLS verification on token requests.
	pub disable_ssl_verification: bool,
	/// Transport; defaults to [`ReqwestHttpClient`] when the `reqwest` feature is enabled.
	pub http_client: Option<Arc<dyn TokenHttpClient>>,
	/// Time source; defaults to [`SystemClock`].
	pub clock: Option<Arc<dyn Clock>>,
	/// Diagnostics sink; defaults to [`TracingLogger`].
	pub logger: Option<Arc<dyn Logger>>,
}
impl ManagerOptions {
	/// Sets the token service URL.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());

		self
	}

	/// Adds one extra header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Replaces the extra headers.
	pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
		self.headers = headers;

		self
	}

	/// Toggles TLS verification for token requests.
	pub fn with_disable_ssl_verification(mut self, disable: bool) -> Self {
		self.disable_ssl_verification = disable;

		self
	}

	/// Overrides the transport.
	pub fn with_http_client(mut self, http_client: Arc<dyn TokenHttpClient>) -> Self {
		self.http_client = Some(http_client);

		self
	}

	/// Overrides the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Overrides the diagnostics sink.
	pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
		self.logger = Some(logger);

		self
	}

	/// Fills unset collaborators with their defaults so clones share the same instances.
	pub(crate) fn with_default_services(mut self) -> Result<Self> {
		if self.http_client.is_none() {
			self.http_client = Some(default_http_client()?);
		}
		if self.clock.is_none() {
			self.clock = Some(Arc::new(SystemClock));
		}
		if self.logger.is_none() {
			self.logger = Some(Arc::new(TracingLogger));
		}

		Ok(self)
	}
}
impl Debug for ManagerOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("ManagerOptions")
			.field("url", &self.url)
			.field("headers", &self.headers.keys().collect::<Vec<_>>())
			.field("disable_ssl_verification", &self.disable_ssl_verification)
			.field("http_client", &self.http_client.is_some())
			.field("clock", &self.clock.is_some())
			.field("logger", &self.logger.is_some())
			.finish()
	}
}

/// Snapshot of manager settings handed to a scheme for one token request.
pub struct RequestContext {
	service_url: String,
	headers: BTreeMap<String, String>,
	disable_ssl_verification: bool,
	http_client: Arc<dyn TokenHttpClient>,
	logger: Arc<dyn Logger>,
}
impl RequestContext {
	#[cfg(test)]
	pub(crate) fn new(
		service_url: impl Into<String>,
		http_client: Arc<dyn TokenHttpClient>,
		logger: Arc<dyn Logger>,
	) -> Self {
		Self {
			service_url: service_url.into(),
			headers: BTreeMap::new(),
			disable_ssl_verification: false,
			http_client,
			logger,
		}
	}

	/// Token service base URL without a trailing slash.
	pub fn service_url(&self) -> &str {
		&self.service_url
	}

	/// Appends `path` to the service URL.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		let url = format!("{}{path}", self.service_url);

		Url::parse(&url).map_err(|source| ConfigError::InvalidUrl { url, source }.into())
	}

	/// Starts a request carrying the manager's extra headers and TLS setting.
	///
	/// Headers set afterwards with [`TokenRequest::with_header`] replace same-named extra headers.
	pub fn request(&self, method: Method, url: Url) -> TokenRequest {
		let mut request = TokenRequest::new(method, url);

		request.headers = self.headers.clone();
		request.disable_ssl_verification = self.disable_ssl_verification;

		request
	}

	/// Executes `request` and parses a 2xx JSON response.
	pub async fn send(&self, request: TokenRequest) -> Result<JsonValue> {
		let response = self.http_client.execute(request).await?;

		if !response.is_success() {
			return Err(TokenRequestError::Endpoint {
				message: response.body_preview(),
				status: Some(response.status),
				retry_after: response.retry_after,
			}
			.into());
		}

		serde_json::from_slice(&response.body)
			.map_err(|e| TokenParseError::MalformedBody { source: Arc::new(e) }.into())
	}

	/// Diagnostics sink of the owning manager.
	pub fn logger(&self) -> &dyn Logger {
		self.logger.as_ref()
	}
}
impl Debug for RequestContext {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("RequestContext")
			.field("service_url", &self.service_url)
			.field("disable_ssl_verification", &self.disable_ssl_verification)
			.finish_non_exhaustive()
	}
}

/// Caches the token of one scheme and paces requests for new ones.
///
/// Cloning is cheap; clones share the cache and the in-flight request.
pub struct TokenManager<S>
where
	S: TokenScheme,
{
	inner: Arc<ManagerInner<S>>,
}
impl<S> TokenManager<S>
where
	S: TokenScheme,
{
	/// Builds a manager around `scheme`, validating the service URL.
	pub fn with_scheme(scheme: S, options: ManagerOptions) -> Result<Self> {
		let service_url =
			resolve_service_url(options.url.as_deref(), S::DEFAULT_URL, S::OPERATION_PATHS)?;
		let options = options.with_default_services()?;
		let (Some(http_client), Some(clock), Some(logger)) =
			(options.http_client, options.clock, options.logger)
		else {
			return Err(ConfigError::MissingHttpClient.into());
		};

		Ok(Self {
			inner: Arc::new(ManagerInner {
				scheme: RwLock::new(scheme),
				settings: RwLock::new(ManagerSettings {
					service_url,
					headers: options.headers,
					disable_ssl_verification: options.disable_ssl_verification,
				}),
				state: Mutex::new(TokenState::default()),
				http_client,
				clock,
				logger,
				metrics: RequestMetrics::default(),
			}),
		})
	}

	/// Returns a usable bearer token, requesting a new one when needed.
	pub async fn get_token(&self) -> Result<String> {
		let token = match self.plan() {
			Plan::Cached(token) => token,
			Plan::CachedNeedsRefresh(token) => {
				self.start_background_refresh();

				token
			},
			Plan::Wait(waiter) =>
				waiter.await.unwrap_or_else(|_| Err(TokenRequestError::Abandoned.into()))?,
			Plan::Lead(id) => self.inner.lead(id).await?,
		};

		Ok(token.into_inner())
	}

	/// Returns `true` when there is no cached token or it is past its expiration margin.
	pub fn is_token_expired(&self) -> bool {
		let now = self.inner.clock.now();

		self.inner
			.state
			.lock()
			.token
			.as_ref()
			.is_none_or(|info| info.is_expired_at(now, S::EXPIRY_MARGIN))
	}

	/// Returns `true` when the cached token has passed its refresh instant.
	pub fn needs_refresh(&self) -> bool {
		let now = self.inner.clock.now();

		self.inner.state.lock().token.as_ref().is_some_and(|info| info.needs_refresh_at(now))
	}

	/// Returns a copy of the cached token state.
	pub fn token_info(&self) -> Option<TokenInfo> {
		self.inner.state.lock().token.clone()
	}

	/// Token service base URL after operation paths and trailing slashes were stripped.
	pub fn service_url(&self) -> String {
		self.inner.settings.read().service_url.clone()
	}

	/// Returns the extra headers sent with token requests.
	pub fn headers(&self) -> BTreeMap<String, String> {
		self.inner.settings.read().headers.clone()
	}

	/// Replaces the extra headers sent with token requests.
	pub fn set_headers(&self, headers: BTreeMap<String, String>) {
		self.inner.scheme.read().headers_changed(&headers);
		self.inner.settings.write().headers = headers;
	}

	/// Returns whether TLS verification is skipped.
	pub fn disable_ssl_verification(&self) -> bool {
		self.inner.settings.read().disable_ssl_verification
	}

	/// Toggles TLS verification for token requests.
	pub fn set_disable_ssl_verification(&self, disable: bool) {
		self.inner.scheme.read().ssl_verification_changed(disable);
		self.inner.settings.write().disable_ssl_verification = disable;
	}

	/// Network request counters for this manager.
	pub fn request_metrics(&self) -> &RequestMetrics {
		&self.inner.metrics
	}

	pub(crate) fn logger(&self) -> &dyn Logger {
		self.inner.logger.as_ref()
	}

	pub(crate) fn read_scheme<R>(&self, f: impl FnOnce(&S) -> R) -> R {
		f(&*self.inner.scheme.read())
	}

	pub(crate) fn update_scheme<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
		f(&mut *self.inner.scheme.write())
	}

	fn plan(&self) -> Plan {
		let inner = &self.inner;
		let now = inner.clock.now();
		let mut state = inner.state.lock();
		let cached = state
			.token
			.as_ref()
			.filter(|info| !info.is_expired_at(now, S::EXPIRY_MARGIN))
			.map(|info| (info.access_token.clone(), info.needs_refresh_at(now)));

		if let Some((token, needs_refresh)) = cached {
			return if needs_refresh { Plan::CachedNeedsRefresh(token) } else { Plan::Cached(token) };
		}
		if let Some(flight) = state.in_flight {
			if now - flight.since < PACING_WINDOW_SECS {
				let (tx, rx) = oneshot::channel();

				state.waiters.push((flight.id, tx));

				return Plan::Wait(rx);
			}

			inner.logger.debug(&format!(
				"Token request started at {} is still unresolved; starting a new one.",
				flight.since
			));
		}

		Plan::Lead(state.begin(now))
	}

	fn start_background_refresh(&self) {
		let Ok(runtime) = Handle::try_current() else {
			self.inner.logger.warn("No async runtime is available; skipping background token refresh.");

			return;
		};
		let now = self.inner.clock.now();
		let id = {
			let mut state = self.inner.state.lock();

			match state.in_flight {
				Some(flight) if now - flight.since < PACING_WINDOW_SECS => return,
				_ => state.begin(now),
			}
		};
		let inner = self.inner.clone();

		inner.logger.debug("Refreshing token in the background.");
		runtime.spawn(async move {
			if let Err(e) = inner.lead(id).await {
				inner.logger.warn(&format!("Background token refresh failed: {e}"));
			}
		});
	}
}
impl<S> Clone for TokenManager<S>
where
	S: TokenScheme,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<S> Debug for TokenManager<S>
where
	S: TokenScheme,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("scheme", &S::KIND)
			.field("service_url", &self.inner.settings.read().service_url)
			.finish_non_exhaustive()
	}
}

struct ManagerInner<S> {
	scheme: RwLock<S>,
	settings: RwLock<ManagerSettings>,
	state: Mutex<TokenState>,
	http_client: Arc<dyn TokenHttpClient>,
	clock: Arc<dyn Clock>,
	logger: Arc<dyn Logger>,
	metrics: RequestMetrics,
}
impl<S> ManagerInner<S>
where
	S: TokenScheme,
{
	async fn lead(&self, id: u64) -> Result<TokenSecret> {
		let guard = InFlightGuard { inner: self, id, settled: false };
		let result = self.request_and_save(id).await;

		guard.settle(&result);

		result
	}

	async fn request_and_save(&self, id: u64) -> Result<TokenSecret> {
		let scheme = self.scheme.read().clone();
		let ctx = self.request_context();
		let span = RequestSpan::new(S::KIND, "get_token");

		self.metrics.record(S::KIND, RequestOutcome::Attempt);

		let result = span
			.instrument(async {
				let response = scheme.request_token(&ctx).await?;

				scheme.save_token_info(&response)
			})
			.await;

		match result {
			Ok(info) => {
				let token = info.access_token.clone();

				self.state.lock().store(id, info);
				self.metrics.record(S::KIND, RequestOutcome::Success);

				Ok(token)
			},
			Err(e) => {
				self.metrics.record(S::KIND, RequestOutcome::Failure);

				Err(e)
			},
		}
	}

	fn request_context(&self) -> RequestContext {
		let settings = self.settings.read();

		RequestContext {
			service_url: settings.service_url.clone(),
			headers: settings.headers.clone(),
			disable_ssl_verification: settings.disable_ssl_verification,
			http_client: self.http_client.clone(),
			logger: self.logger.clone(),
		}
	}

	fn settle(&self, id: u64, result: Result<TokenSecret>) {
		let waiters = {
			let mut state = self.state.lock();

			if state.in_flight.is_some_and(|flight| flight.id == id) {
				state.in_flight = None;
			}

			let (joined, others): (Vec<_>, Vec<_>) =
				mem::take(&mut state.waiters).into_iter().partition(|(flight, _)| *flight == id);

			state.waiters = others;

			joined
		};

		for (_, waiter) in waiters {
			let _ = waiter.send(result.clone());
		}
	}
}

struct ManagerSettings {
	service_url: String,
	headers: BTreeMap<String, String>,
	disable_ssl_verification: bool,
}

#[derive(Default)]
struct TokenState {
	token: Option<TokenInfo>,
	in_flight: Option<InFlight>,
	/// Pending followers, keyed by the flight they joined.
	waiters: Vec<(u64, oneshot::Sender<Result<TokenSecret>>)>,
	/// Flight whose response is cached in `token`.
	token_flight: u64,
	next_id: u64,
}
impl TokenState {
	fn begin(&mut self, now: i64) -> u64 {
		self.next_id += 1;
		self.in_flight = Some(InFlight { id: self.next_id, since: now });

		self.next_id
	}

	/// Caches `info` unless a newer flight already stored its token.
	fn store(&mut self, id: u64, info: TokenInfo) {
		if id >= self.token_flight {
			self.token = Some(info);
			self.token_flight = id;
		}
	}
}

#[derive(Clone, Copy)]
struct InFlight {
	id: u64,
	since: i64,
}

enum Plan {
	Cached(TokenSecret),
	CachedNeedsRefresh(TokenSecret),
	Wait(oneshot::Receiver<Result<TokenSecret>>),
	Lead(u64),
}

/// Resolves waiters with [`TokenRequestError::Abandoned`] if the leading request is dropped.
struct InFlightGuard<'a, S>
where
	S: TokenScheme,
{
	inner: &'a ManagerInner<S>,
	id: u64,
	settled: bool,
}
impl<S> InFlightGuard<'_, S>
where
	S: TokenScheme,
{
	fn settle(mut self, result: &Result<TokenSecret>) {
		self.settled = true;
		self.inner.settle(self.id, result.clone());
	}
}
impl<S> Drop for InFlightGuard<'_, S>
where
	S: TokenScheme,
{
	fn drop(&mut self) {
		if !self.settled {
			self.inner.settle(self.id, Err(TokenRequestError::Abandoned.into()));
		}
	}
}

/// Normalizes a service URL: falls back to `default`, strips one trailing operation path,
/// and removes trailing slashes.
pub(crate) fn resolve_service_url(
	url: Option<&str>,
	default: Option<&'static str>,
	operation_paths: &[&str],
) -> Result<String, ConfigError> {
	let raw = scheme::non_empty(url).or(default).ok_or(ConfigError::MissingOption { option: "url" })?;
	let mut url = raw.trim_end_matches('/');

	for path in operation_paths {
		if let Some(stripped) = url.strip_suffix(path) {
			url = stripped.trim_end_matches('/');

			break;
		}
	}

	Url::parse(url).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })?;

	Ok(url.to_owned())
}

#[cfg(feature = "reqwest")]
fn default_http_client() -> Result<Arc<dyn TokenHttpClient>, ConfigError> {
	Ok(Arc::new(ReqwestHttpClient::new()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_http_client() -> Result<Arc<dyn TokenHttpClient>, ConfigError> {
	Err(ConfigError::MissingHttpClient)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	use serde_json::json;
	use tokio::{sync::Notify, task::JoinHandle};
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		http::stub::StubHttpClient,
		obs::{LogLevel, RecordingLogger, SchemeKind},
		scheme::SchemeFuture,
	};

	#[derive(Clone, Debug, Default)]
	struct StaticScheme {
		stall: bool,
	}
	impl TokenScheme for StaticScheme {
		const DEFAULT_URL: Option<&'static str> = Some("https://token.example.com");
		const KIND: SchemeKind = SchemeKind::Mcsp;
		const OPERATION_PATHS: &'static [&'static str] = &["/v1/token"];

		fn request_token<'a>(&'a self, ctx: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
			Box::pin(async move {
				if self.stall {
					std::future::pending::<()>().await;
				}

				let url = ctx.endpoint("/v1/token")?;

				ctx.send(ctx.request(Method::POST, url)).await
			})
		}

		fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
			Ok(TokenInfo::from_response(response, "token")?)
		}
	}

	/// Holds request `n` until `gates[n]` is notified; the first request may fail.
	#[derive(Clone, Debug)]
	struct GatedScheme {
		calls: Arc<AtomicUsize>,
		gates: Arc<[Notify; 2]>,
		first_fails: bool,
	}
	impl GatedScheme {
		fn new(first_fails: bool) -> Self {
			Self {
				calls: Default::default(),
				gates: Arc::new([Notify::new(), Notify::new()]),
				first_fails,
			}
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenScheme for GatedScheme {
		const DEFAULT_URL: Option<&'static str> = Some("https://token.example.com");
		const KIND: SchemeKind = SchemeKind::Mcsp;
		const OPERATION_PATHS: &'static [&'static str] = &[];

		fn request_token<'a>(&'a self, _: &'a RequestContext) -> SchemeFuture<'a, JsonValue> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst);

				self.gates[call].notified().await;

				match call {
					0 if self.first_fails => Err(TokenRequestError::Endpoint {
						message: "first request failed".into(),
						status: Some(500),
						retry_after: None,
					}
					.into()),
					0 => Ok(json!({ "token": jwt(0, 1_000) })),
					_ => Ok(json!({ "token": jwt(60, 3_600) })),
				}
			})
		}

		fn save_token_info(&self, response: &JsonValue) -> Result<TokenInfo> {
			Ok(TokenInfo::from_response(response, "token")?)
		}
	}

	fn jwt(iat: i64, exp: i64) -> String {
		format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(format!("{{\"iat\":{iat},\"exp\":{exp}}}")))
	}

	fn manager<S>(
		scheme: S,
		http: Arc<StubHttpClient>,
		clock: Arc<ManualClock>,
		logger: Arc<RecordingLogger>,
	) -> TokenManager<S>
	where
		S: TokenScheme,
	{
		TokenManager::with_scheme(
			scheme,
			ManagerOptions::default().with_http_client(http).with_clock(clock).with_logger(logger),
		)
		.expect("Manager should build.")
	}

	fn spawn_get<S>(manager: &TokenManager<S>) -> JoinHandle<Result<String>>
	where
		S: TokenScheme,
	{
		let manager = manager.clone();

		tokio::spawn(async move { manager.get_token().await })
	}

	async fn wait_until(condition: impl Fn() -> bool) {
		while !condition() {
			tokio::task::yield_now().await;
		}
	}

	fn queued<S>(manager: &TokenManager<S>) -> usize
	where
		S: TokenScheme,
	{
		manager.inner.state.lock().waiters.len()
	}

	#[test]
	fn service_url_strips_operation_path_and_slashes() {
		assert_eq!(
			resolve_service_url(Some("https://iam.example.com/v1/token/"), None, &["/v1/token"])
				.expect("URL should resolve."),
			"https://iam.example.com"
		);
		assert_eq!(
			resolve_service_url(None, Some("https://iam.example.com/"), &[])
				.expect("Default should apply."),
			"https://iam.example.com"
		);
		assert!(matches!(
			resolve_service_url(Some("  "), None, &[]),
			Err(ConfigError::MissingOption { option: "url" })
		));
		assert!(matches!(
			resolve_service_url(Some("not a url"), None, &[]),
			Err(ConfigError::InvalidUrl { .. })
		));
	}

	#[tokio::test]
	async fn cached_token_is_reused_until_expiry() {
		let http = Arc::new(
			StubHttpClient::default()
				.with_json(200, json!({ "token": jwt(1_000, 2_000) }))
				.with_json(200, json!({ "token": jwt(2_000, 3_000) })),
		);
		let clock = Arc::new(ManualClock::new(1_000));
		let manager =
			manager(StaticScheme::default(), http.clone(), clock.clone(), Default::default());

		assert!(manager.is_token_expired());

		let first = manager.get_token().await.expect("First request should succeed.");
		let again = manager.get_token().await.expect("Cached token should be returned.");

		assert_eq!(first, again);
		assert_eq!(http.requests().len(), 1);
		assert_eq!(http.requests()[0].url.as_str(), "https://token.example.com/v1/token");

		clock.set(2_000);

		assert!(manager.is_token_expired());

		let renewed = manager.get_token().await.expect("Expired token should be replaced.");

		assert_ne!(first, renewed);
		assert_eq!(manager.request_metrics().attempts(), 2);
		assert_eq!(manager.request_metrics().successes(), 2);
	}

	#[tokio::test]
	async fn error_statuses_and_bad_bodies_are_reported() {
		let http = Arc::new(StubHttpClient::default().with_json(400, json!({ "errorCode": "BXNIM0415E" })));
		let manager = manager(
			StaticScheme::default(),
			http.clone(),
			Arc::new(ManualClock::new(0)),
			Default::default(),
		);
		let err = manager.get_token().await.expect_err("400 must fail.");

		match err {
			Error::TokenRequest(TokenRequestError::Endpoint { message, status, .. }) => {
				assert_eq!(status, Some(400));
				assert!(message.contains("BXNIM0415E"));
			},
			other => panic!("Unexpected error: {other:?}"),
		}

		let err = manager.get_token().await.expect_err("Unscripted response must fail.");

		assert!(matches!(err, Error::TokenRequest(TokenRequestError::Endpoint { status: Some(500), .. })));
		assert_eq!(manager.request_metrics().failures(), 2);
		assert!(manager.token_info().is_none());
	}

	#[tokio::test]
	async fn waiters_are_released_when_leader_is_dropped() {
		let manager = manager(
			StaticScheme { stall: true },
			Arc::new(StubHttpClient::default()),
			Arc::new(ManualClock::new(0)),
			Default::default(),
		);
		let leader = tokio::spawn({
			let manager = manager.clone();

			async move { manager.get_token().await }
		});

		tokio::task::yield_now().await;

		let follower = tokio::spawn({
			let manager = manager.clone();

			async move { manager.get_token().await }
		});

		tokio::task::yield_now().await;
		leader.abort();

		let err = follower
			.await
			.expect("Follower task should not panic.")
			.expect_err("Follower must observe the abandoned request.");

		assert!(matches!(err, Error::TokenRequest(TokenRequestError::Abandoned)));
		assert_eq!(manager.request_metrics().unresolved(), 1);
	}

	#[tokio::test]
	async fn stale_in_flight_request_is_taken_over() {
		let http = Arc::new(StubHttpClient::default().with_json(200, json!({ "token": jwt(0, 3_600) })));
		let clock = Arc::new(ManualClock::new(0));
		let logger = Arc::new(RecordingLogger::default());
		let manager =
			manager(StaticScheme { stall: true }, http.clone(), clock.clone(), logger.clone());
		let stuck = tokio::spawn({
			let manager = manager.clone();

			async move { manager.get_token().await }
		});

		tokio::task::yield_now().await;
		manager.update_scheme(|scheme| scheme.stall = false);
		clock.advance(PACING_WINDOW_SECS);

		let token = manager.get_token().await.expect("New leader should succeed.");

		assert_eq!(token, jwt(0, 3_600));
		assert_eq!(http.requests().len(), 1);
		assert!(
			logger
				.messages(LogLevel::Debug)
				.iter()
				.any(|message| message.contains("still unresolved"))
		);

		stuck.abort();
	}

	#[tokio::test]
	async fn followers_only_observe_the_request_they_joined() {
		let scheme = GatedScheme::new(true);
		let clock = Arc::new(ManualClock::new(0));
		let manager = manager(
			scheme.clone(),
			Arc::new(StubHttpClient::default()),
			clock.clone(),
			Default::default(),
		);
		let stale_leader = spawn_get(&manager);

		wait_until(|| scheme.calls() == 1).await;

		let stale_follower = spawn_get(&manager);

		wait_until(|| queued(&manager) == 1).await;
		clock.advance(PACING_WINDOW_SECS);

		let leader = spawn_get(&manager);

		wait_until(|| scheme.calls() == 2).await;

		let follower = spawn_get(&manager);

		wait_until(|| queued(&manager) == 2).await;
		scheme.gates[0].notify_one();

		for task in [stale_leader, stale_follower] {
			let err = task
				.await
				.expect("Task should not panic.")
				.expect_err("The stale request's callers must see its failure.");

			assert!(matches!(err, Error::TokenRequest(TokenRequestError::Endpoint { status: Some(500), .. })));
		}

		assert_eq!(queued(&manager), 1);

		scheme.gates[1].notify_one();

		for task in [leader, follower] {
			assert_eq!(
				task.await.expect("Task should not panic.").expect("New request should succeed."),
				jwt(60, 3_600)
			);
		}

		assert!(manager.inner.state.lock().in_flight.is_none());
	}

	#[tokio::test]
	async fn late_stale_response_does_not_replace_newer_token() {
		let scheme = GatedScheme::new(false);
		let clock = Arc::new(ManualClock::new(0));
		let manager = manager(
			scheme.clone(),
			Arc::new(StubHttpClient::default()),
			clock.clone(),
			Default::default(),
		);
		let stale_leader = spawn_get(&manager);

		wait_until(|| scheme.calls() == 1).await;
		clock.advance(PACING_WINDOW_SECS);

		let leader = spawn_get(&manager);

		wait_until(|| scheme.calls() == 2).await;
		scheme.gates[1].notify_one();

		assert_eq!(
			leader.await.expect("Task should not panic.").expect("New request should succeed."),
			jwt(60, 3_600)
		);

		scheme.gates[0].notify_one();

		assert_eq!(
			stale_leader.await.expect("Task should not panic.").expect("Stale request still succeeds."),
			jwt(0, 1_000)
		);

		let info = manager.token_info().expect("Token should be cached.");

		assert_eq!(info.access_token.expose(), jwt(60, 3_600));
	}

	#[test]
	fn background_refresh_without_runtime_is_skipped() {
		let logger = Arc::new(RecordingLogger::default());
		let manager = manager(
			StaticScheme::default(),
			Arc::new(StubHttpClient::default()),
			Arc::new(ManualClock::new(0)),
			logger.clone(),
		);

		manager.start_background_refresh();

		assert!(manager.inner.state.lock().in_flight.is_none());
		assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
	}
}

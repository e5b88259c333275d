//! Helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::MockServer;
use serde_json::{Value, json};
// self
use ibm_cloud_auth::{
	clock::ManualClock,
	http::ReqwestHttpClient,
	manager::ManagerOptions,
	obs::RecordingLogger,
};

/// Issue time used by most fixtures.
pub const ISSUED_AT: i64 = 1_000;
/// Expiry paired with [`ISSUED_AT`]; the refresh instant is 1_800.
pub const EXPIRES_AT: i64 = 2_000;

/// Unsigned JWT carrying only `iat` and `exp`.
pub fn jwt(iat: i64, exp: i64) -> String {
	let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"iat":{iat},"exp":{exp}}}"#));

	format!("{header}.{payload}.signature")
}

/// `{ field: jwt(iat, exp) }`.
pub fn token_body(field: &str, iat: i64, exp: i64) -> Value {
	json!({ field: jwt(iat, exp) })
}

/// Manager options pointing at `server` with a manual clock and a recording logger.
pub struct Harness {
	pub clock: Arc<ManualClock>,
	pub logger: Arc<RecordingLogger>,
	pub options: ManagerOptions,
}
impl Harness {
	pub fn new(server: &MockServer) -> Self {
		let clock = Arc::new(ManualClock::new(ISSUED_AT));
		let logger = Arc::new(RecordingLogger::default());
		let http = ReqwestHttpClient::new().expect("Reqwest client should build for tests.");
		let options = ManagerOptions::default()
			.with_url(server.base_url())
			.with_http_client(Arc::new(http))
			.with_clock(clock.clone())
			.with_logger(logger.clone());

		Self { clock, logger, options }
	}
}

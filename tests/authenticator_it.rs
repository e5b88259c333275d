mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::{EXPIRES_AT, Harness, ISSUED_AT, jwt};
use ibm_cloud_auth::{
	authenticator::{AuthType, Authenticator, IamAuthenticator},
	config::{self, MapConfigLoader},
	error::{ConfigError, Error},
	http_types::{HeaderMap, HeaderValue, header::AUTHORIZATION},
	scheme::{IAM_TOKEN_PATH, IamOptions},
};

#[tokio::test]
async fn iam_authenticator_sets_the_bearer_header() {
	let server = MockServer::start_async().await;
	let harness = Harness::new(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(IAM_TOKEN_PATH);
			then.status(200).json_body(json!({ "access_token": jwt(ISSUED_AT, EXPIRES_AT) }));
		})
		.await;
	let authenticator =
		IamAuthenticator::new(IamOptions::default().with_apikey("abc").with_manager(harness.options))
			.expect("IAM authenticator should build.");
	let mut headers = HeaderMap::new();

	authenticator.authenticate(&mut headers).await.expect("Authentication should succeed.");
	authenticator.authenticate(&mut headers).await.expect("Cached token should be reused.");

	let expected = format!("Bearer {}", jwt(ISSUED_AT, EXPIRES_AT));

	assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
	assert_eq!(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()), Some(expected.as_str()));
	assert_eq!(authenticator.authentication_type(), AuthType::Iam);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_token_request_leaves_headers_untouched() {
	let server = MockServer::start_async().await;
	let harness = Harness::new(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path(IAM_TOKEN_PATH);
			then.status(500).body("iam is down");
		})
		.await;

	let authenticator =
		IamAuthenticator::new(IamOptions::default().with_apikey("abc").with_manager(harness.options))
			.expect("IAM authenticator should build.");
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer previous"));

	assert!(authenticator.authenticate(&mut headers).await.is_err());
	assert_eq!(headers.get(AUTHORIZATION), Some(&HeaderValue::from_static("Bearer previous")));
}

#[tokio::test]
async fn configured_iam_authenticator_talks_to_the_configured_url() {
	let server = MockServer::start_async().await;
	let harness = Harness::new(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(IAM_TOKEN_PATH).form_urlencoded_tuple("apikey", "from-config");
			then.status(200).json_body(json!({ "access_token": jwt(ISSUED_AT, EXPIRES_AT) }));
		})
		.await;
	let loader = MapConfigLoader::default().with_service("assistant", [
		("APIKEY", "from-config".to_owned()),
		("AUTH_URL", server.base_url()),
	]);
	let authenticator =
		config::authenticator_from_config(&loader, "assistant", harness.options.with_url("http://unused"))
			.expect("Configured authenticator should build.");
	let mut headers = HeaderMap::new();

	assert_eq!(authenticator.authentication_type(), AuthType::Iam);

	authenticator.authenticate(&mut headers).await.expect("Authentication should succeed.");

	assert!(headers.contains_key(AUTHORIZATION));

	mock.assert_calls_async(1).await;
}

#[test]
fn missing_service_configuration_is_reported() {
	let Err(err) =
		config::authenticator_from_config(&MapConfigLoader::default(), "unknown", Default::default())
	else {
		panic!("Unknown services should fail.");
	};

	assert!(matches!(
		err,
		Error::Config(ConfigError::NoExternalConfig { service }) if service == "unknown"
	));
}

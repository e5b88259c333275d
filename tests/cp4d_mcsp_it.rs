mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::{EXPIRES_AT, Harness, ISSUED_AT, jwt, token_body};
use ibm_cloud_auth::scheme::{
	CP4D_AUTHORIZE_PATH, CP4D_VALIDATE_AUTH_PATH, Cp4dEndpoint, Cp4dOptions, Cp4dTokenManager,
	McspV2Options, McspV2TokenManager,
};

#[tokio::test]
async fn cp4d_validate_auth_uses_basic_credentials() {
	let server = MockServer::start_async().await;
	let harness = Harness::new(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(CP4D_VALIDATE_AUTH_PATH)
				.header("authorization", "Basic YWRtaW46c2VjcmV0");
			then.status(200).json_body(token_body("accessToken", ISSUED_AT, EXPIRES_AT));
		})
		.await;
	let manager = Cp4dTokenManager::new(
		Cp4dOptions::default()
			.with_username("admin")
			.with_password("secret")
			.with_manager(harness.options.with_url(server.url(CP4D_VALIDATE_AUTH_PATH))),
	)
	.expect("CP4D manager should build.");

	assert_eq!(
		manager.get_token().await.expect("validateAuth exchange should succeed."),
		jwt(ISSUED_AT, EXPIRES_AT)
	);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn cp4d_authorize_posts_the_apikey() {
	let server = MockServer::start_async().await;
	let harness = Harness::new(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(CP4D_AUTHORIZE_PATH)
				.header("content-type", "application/json")
				.json_body(json!({ "username": "admin", "api_key": "key" }));
			then.status(200).json_body(token_body("token", ISSUED_AT, EXPIRES_AT));
		})
		.await;
	let manager = Cp4dTokenManager::new(
		Cp4dOptions::default()
			.with_username("admin")
			.with_apikey("key")
			.with_endpoint(Cp4dEndpoint::Authorize)
			.with_manager(harness.options),
	)
	.expect("CP4D manager should build.");

	manager.get_token().await.expect("authorize exchange should succeed.");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn mcsp_v2_sends_scope_path_and_flags() {
	let server = MockServer::start_async().await;
	let harness = Harness::new(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/2.0/accounts/acct-1/apikeys/token")
				.query_param("includeBuiltinActions", "true")
				.query_param("includeCustomActions", "false")
				.query_param("includeRoles", "true")
				.query_param("prefixRolesWithDefinitionScope", "false")
				.json_body(json!({
					"apikey": "key",
					"callerExtClaim": { "productID": "prod-123" },
				}));
			then.status(200).json_body(token_body("token", ISSUED_AT, EXPIRES_AT));
		})
		.await;
	let manager = McspV2TokenManager::new(
		McspV2Options::default()
			.with_apikey("key")
			.with_scope("accounts", "acct-1")
			.with_include_builtin_actions(true)
			.with_caller_ext_claim(json!({ "productID": "prod-123" }))
			.with_manager(harness.options),
	)
	.expect("MCSP v2 manager should build.");

	assert_eq!(
		manager.get_token().await.expect("MCSP v2 exchange should succeed."),
		jwt(ISSUED_AT, EXPIRES_AT)
	);

	mock.assert_calls_async(1).await;
}

//! Demonstrates an IAM authenticator stamping request headers, with the token endpoint served
//! by a local mock so the demo runs offline.

// std
use std::time::{SystemTime, UNIX_EPOCH};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use ibm_cloud_auth::{
	authenticator::{Authenticator, IamAuthenticator},
	http_types::{HeaderMap, header::AUTHORIZATION},
	manager::ManagerOptions,
	scheme::{IAM_TOKEN_PATH, IamOptions},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
	let claims = json!({ "iat": now, "exp": now + 3_600 });
	let access_token = format!(
		"{}.{}.demo",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
		URL_SAFE_NO_PAD.encode(claims.to_string())
	);
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(IAM_TOKEN_PATH).form_urlencoded_tuple("apikey", "demo-apikey");
			then.status(200).json_body(json!({
				"access_token": access_token,
				"refresh_token": "demo-refresh",
				"token_type": "Bearer",
				"expires_in": 3_600,
			}));
		})
		.await;
	let authenticator = IamAuthenticator::new(
		IamOptions::default()
			.with_apikey("demo-apikey")
			.with_manager(ManagerOptions::default().with_url(server.base_url())),
	)?;
	let mut headers = HeaderMap::new();

	for _ in 0..3 {
		authenticator.authenticate(&mut headers).await?;
	}

	println!("Authorization: {}", headers[AUTHORIZATION].to_str()?);
	println!("Refresh token: {:?}.", authenticator.token_manager().refresh_token());

	token_mock.assert_calls_async(1).await;

	Ok(())
}

mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
// self
use smart_launch::{
	error::DiscoveryError,
	http::SmartHttpClient,
	smart::{self, Issuer},
};

fn http() -> SmartHttpClient {
	SmartHttpClient::new(&common::config(false)).expect("HTTP client should build.")
}

#[tokio::test]
async fn discover_decodes_document_and_stamps_issuer() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/fhir/.well-known/smart-configuration")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body(
				common::discovery_document(
					"https://ehr.example/authorize",
					"https://ehr.example/token",
				)
				.to_string(),
			);
		})
		.await;
	let issuer = Issuer::parse(&server.url("/fhir/")).expect("Mock issuer should parse.");
	let configuration =
		smart::discover(&http(), &issuer).await.expect("Discovery should succeed.");

	mock.assert_async().await;

	assert_eq!(configuration.issuer, issuer);
	assert_eq!(configuration.authorization_endpoint.as_str(), "https://ehr.example/authorize");
	assert_eq!(configuration.token_endpoint.as_str(), "https://ehr.example/token");
	assert_eq!(configuration.scopes_supported, ["openid", "launch", "launch/encounter"]);
	assert_eq!(configuration.capabilities, ["launch-ehr", "client-public"]);
	assert!(configuration.supports_pkce_s256());
}

#[tokio::test]
async fn discover_reports_non_success_status() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/fhir/.well-known/smart-configuration");
			then.status(404).body("not here");
		})
		.await;

	let issuer = Issuer::parse(&server.url("/fhir")).expect("Mock issuer should parse.");
	let err = smart::discover(&http(), &issuer).await.expect_err("404 should fail discovery.");

	assert!(matches!(err, DiscoveryError::Status { status: 404, .. }));
}

#[tokio::test]
async fn discover_reports_malformed_document() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/fhir/.well-known/smart-configuration");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"authorization_endpoint\":\"https://ehr.example/authorize\"}");
		})
		.await;

	let issuer = Issuer::parse(&server.url("/fhir")).expect("Mock issuer should parse.");
	let err =
		smart::discover(&http(), &issuer).await.expect_err("Incomplete document should fail.");

	assert!(matches!(err, DiscoveryError::Parse { .. }));
	assert!(err.to_string().contains("malformed"));
}

#[tokio::test]
async fn discover_reports_unreachable_issuer() {
	let issuer = Issuer::parse("http://127.0.0.1:1/fhir").expect("Issuer should parse.");
	let err = smart::discover(&http(), &issuer)
		.await
		.expect_err("Closed port should fail discovery.");

	match err {
		DiscoveryError::Transport { url, .. } =>
			assert_eq!(url, "http://127.0.0.1:1/fhir/.well-known/smart-configuration"),
		other => panic!("Unexpected discovery error: {other:?}."),
	}
}

#[tokio::test]
async fn discover_gives_up_after_the_request_timeout() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/fhir/.well-known/smart-configuration");
			then.status(200)
				.delay(Duration::from_secs(3))
				.header("content-type", "application/json")
				.body(
					common::discovery_document(
						"https://ehr.example/authorize",
						"https://ehr.example/token",
					)
					.to_string(),
				);
		})
		.await;

	let config =
		common::config(false).with_timeouts(Duration::from_secs(1), Duration::from_secs(1));
	let http = SmartHttpClient::new(&config).expect("HTTP client should build.");
	let issuer = Issuer::parse(&server.url("/fhir")).expect("Mock issuer should parse.");
	let err = smart::discover(&http, &issuer)
		.await
		.expect_err("A reply slower than the timeout should fail discovery.");

	match err {
		DiscoveryError::Transport { source, .. } => assert!(source.is_timeout()),
		other => panic!("Unexpected discovery error: {other:?}."),
	}
}

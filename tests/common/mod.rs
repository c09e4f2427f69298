//! Shared fixtures for the integration suites.

#![allow(dead_code)]

// std
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
// crates.io
use axum::{
	Form, Json, Router,
	body::{Body, to_bytes},
	extract::State,
	http::{HeaderMap, Request, StatusCode},
	routing::post,
};
use httpmock::prelude::*;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower::ServiceExt;
use url::{Url, form_urlencoded};
// self
use smart_launch::{
	config::{Config, DEFAULT_CLIENT_ID, DEFAULT_REDIRECT_URI, StateStrategy},
	flows::Launcher,
};

pub const FIXED_STATE: &str = "state";

/// Config with a fixed `state` so redirects are predictable.
pub fn config(pkce: bool) -> Config {
	Config::new(
		DEFAULT_CLIENT_ID,
		Url::parse(DEFAULT_REDIRECT_URI).expect("Default redirect URI should parse."),
	)
	.with_state_strategy(
		format!("fixed:{FIXED_STATE}").parse::<StateStrategy>().expect("Fixed strategy should parse."),
	)
	.with_pkce(pkce)
}

pub fn launcher(config: &Config) -> Launcher {
	Launcher::new(config).expect("Launcher should build from the test config.")
}

pub fn discovery_document(authorization_endpoint: &str, token_endpoint: &str) -> Value {
	json!({
		"authorization_endpoint": authorization_endpoint,
		"token_endpoint": token_endpoint,
		"scopes_supported": ["openid", "launch", "launch/encounter"],
		"capabilities": ["launch-ehr", "client-public"],
		"code_challenge_methods_supported": ["S256"]
	})
}

/// Serves `document` at `<issuer_path>/.well-known/smart-configuration`.
pub async fn mock_discovery<'a>(
	server: &'a MockServer,
	issuer_path: &str,
	document: &Value,
) -> httpmock::Mock<'a> {
	let path = format!("{issuer_path}/.well-known/smart-configuration");
	let body = document.to_string();

	server
		.mock_async(|when, then| {
			when.method(GET).path(path);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

pub fn launch_uri(issuer: &str, launch: &str) -> String {
	let query = form_urlencoded::Serializer::new(String::new())
		.append_pair("iss", issuer)
		.append_pair("launch", launch)
		.finish();

	format!("/launch?{query}")
}

pub fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("GET request should build.")
}

pub fn post_form(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
	let body = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/x-www-form-urlencoded")
		.body(Body::from(body))
		.expect("POST request should build.")
}

/// Drives `router` in-process and returns status, headers, and body text.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
	let response = router.oneshot(request).await.expect("Router should produce a response.");
	let status = response.status();
	let headers = response.headers().clone();
	let body = to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	(status, headers, String::from_utf8_lossy(&body).into_owned())
}

pub fn location(headers: &HeaderMap) -> Url {
	let value = headers
		.get("location")
		.expect("Redirect should carry a Location header.")
		.to_str()
		.expect("Location header should be ASCII.");

	Url::parse(value).expect("Location header should be an absolute URL.")
}

pub fn query_pairs(url: &Url) -> Vec<(String, String)> {
	url.query_pairs().into_owned().collect()
}

/// In-process HTTP server bound to an ephemeral port.
pub struct LocalServer {
	pub addr: SocketAddr,
	stop: Option<oneshot::Sender<()>>,
	task: JoinHandle<()>,
}
impl LocalServer {
	pub async fn spawn(router: Router) -> Self {
		let listener =
			TcpListener::bind("127.0.0.1:0").await.expect("Ephemeral port should be bindable.");
		let addr = listener.local_addr().expect("Bound listener should expose its address.");
		let (stop, stopped) = oneshot::channel::<()>();
		let task = tokio::spawn(async move {
			axum::serve(listener, router)
				.with_graceful_shutdown(async move {
					let _ = stopped.await;
				})
				.await
				.expect("Local server should run.");
		});

		Self { addr, stop: Some(stop), task }
	}

	pub fn url(&self, path: &str) -> String {
		format!("http://{}{path}", self.addr)
	}

	/// Stops accepting connections and waits for the server task to finish.
	pub async fn shutdown(mut self) {
		if let Some(stop) = self.stop.take() {
			let _ = stop.send(());
		}

		let _ = (&mut self.task).await;
	}
}

/// Token endpoint that records every submitted form and answers with `response`.
pub struct CapturingTokenEndpoint {
	pub server: LocalServer,
	forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}
impl CapturingTokenEndpoint {
	pub async fn spawn(response: Value) -> Self {
		let forms = Arc::new(Mutex::new(Vec::new()));
		let router = Router::new()
			.route("/token", post(capture))
			.with_state((forms.clone(), Arc::new(response)));

		Self { server: LocalServer::spawn(router).await, forms }
	}

	pub fn url(&self) -> String {
		self.server.url("/token")
	}

	pub fn forms(&self) -> Vec<HashMap<String, String>> {
		self.forms.lock().clone()
	}
}

type CaptureState = (Arc<Mutex<Vec<HashMap<String, String>>>>, Arc<Value>);

async fn capture(
	State((forms, response)): State<CaptureState>,
	Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
	forms.lock().push(form);

	Json(response.as_ref().clone())
}

pub fn token_response(encounter: &str) -> Value {
	json!({
		"access_token": "tok1",
		"token_type": "Bearer",
		"expires_in": 3600,
		"scope": "openid fhirUser profile launch launch/patient launch/encounter",
		"intent": "",
		"encounter": encounter
	})
}

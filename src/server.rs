//! HTTP front: `/launch`, `/authenticate`, and `/healthz`.
//!
//! Handlers only translate request parameters into typed values and render results; every
//! failure is an [`Error`] whose variant alone decides the status code.

// std
use std::{io, net::SocketAddr, time::Duration as StdDuration};
// crates.io
use axum::{
	Form, Router,
	extract::{
		Query, State,
		rejection::{FormRejection, QueryRejection},
	},
	http::{StatusCode, header::LOCATION},
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	auth::{LaunchId, StateToken},
	flows::Launcher,
	smart::Issuer,
};

const PURGE_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Query parameters the EHR sends to `/launch`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LaunchParams {
	/// FHIR base URL of the launching EHR.
	pub iss: Option<String>,
	/// Opaque launch context.
	pub launch: Option<String>,
}

/// Parameters the authorization server sends back to `/authenticate`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
	/// Authorization code.
	pub code: Option<String>,
	/// `state` issued by `/launch`.
	pub state: Option<String>,
	/// OAuth error code when authorization did not succeed.
	pub error: Option<String>,
	/// Human-readable companion to `error`.
	pub error_description: Option<String>,
}

/// Builds the router with all endpoints and request tracing.
pub fn router(launcher: Launcher) -> Router {
	Router::new()
		.route("/launch", get(launch))
		.route("/authenticate", get(authenticate).post(authenticate))
		.route("/healthz", get(healthz))
		.layer(TraceLayer::new_for_http())
		.with_state(launcher)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(launcher: Launcher, addr: SocketAddr) -> io::Result<()> {
	let listener = TcpListener::bind(addr).await?;

	serve_with_shutdown(launcher, listener, shutdown_signal()).await
}

/// Serves on an already bound listener until `shutdown` resolves.
///
/// Expired launches are purged in the background while the server runs.
pub async fn serve_with_shutdown<F>(
	launcher: Launcher,
	listener: TcpListener,
	shutdown: F,
) -> io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	tracing::info!(address = %listener.local_addr()?, "listening");

	let sweeper = spawn_sweeper(launcher.clone());
	let result = axum::serve(listener, router(launcher)).with_graceful_shutdown(shutdown).await;

	sweeper.abort();
	tracing::info!("server stopped");

	result
}

async fn launch(
	State(launcher): State<Launcher>,
	params: Result<Query<LaunchParams>, QueryRejection>,
) -> Result<Response> {
	let Query(params) = params.map_err(|e| Error::invalid_parameter("query", e.body_text()))?;
	let issuer = required(params.iss, "iss")?;
	let issuer = Issuer::parse(&issuer).map_err(|e| Error::invalid_parameter("iss", e))?;
	let launch_id = LaunchId::new(required(params.launch, "launch")?)
		.map_err(|e| Error::invalid_parameter("launch", e))?;
	let redirect = launcher.launch(issuer, launch_id).await?;

	Ok((StatusCode::FOUND, [(LOCATION, redirect.authorize_url.to_string())]).into_response())
}

async fn authenticate(
	State(launcher): State<Launcher>,
	params: Result<Form<CallbackParams>, FormRejection>,
) -> Result<String> {
	let Form(params) = params.map_err(|e| Error::invalid_parameter("form", e.body_text()))?;

	if let Some(error) = params.error.filter(|error| !error.is_empty()) {
		return Err(Error::AuthorizationDenied {
			error,
			description: params.error_description.filter(|d| !d.is_empty()),
		});
	}

	let code = required(params.code, "code")?;
	let state = StateToken::new(required(params.state, "state")?)
		.map_err(|e| Error::invalid_parameter("state", e))?;
	let authenticated = launcher.authenticate(&state, &code).await?;

	Ok(authenticated.render())
}

async fn healthz() -> &'static str {
	"ok"
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = status_for(&self);

		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %self, "request failed");
		} else {
			tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
		}

		(status, self.to_string()).into_response()
	}
}

/// Status code the HTTP front answers with for `error`.
pub fn status_for(error: &Error) -> StatusCode {
	match error {
		Error::MissingParameter { .. }
		| Error::InvalidParameter { .. }
		| Error::UnknownLaunch
		| Error::AuthorizationDenied { .. }
		| Error::TokenExchange(_) => StatusCode::BAD_REQUEST,
		Error::Discovery(_) | Error::ResourceFetch(_) => StatusCode::BAD_GATEWAY,
		Error::Config(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
	value.filter(|value| !value.is_empty()).ok_or(Error::MissingParameter { name })
}

fn spawn_sweeper(launcher: Launcher) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(PURGE_INTERVAL);

		loop {
			ticker.tick().await;

			if let Err(e) = launcher.purge_expired().await {
				tracing::warn!(error = %e, "failed to purge expired launches");
			}
		}
	})
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for the shutdown signal");

		std::future::pending::<()>().await;
	}

	tracing::info!("shutdown signal received");
}

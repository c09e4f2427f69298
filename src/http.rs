//! Outbound HTTP plumbing shared by discovery, the token exchange, and resource reads.
//!
//! [`SmartHttpClient`] wraps a single [`ReqwestClient`] with explicit timeouts and no redirect
//! following. Token requests go through [`InstrumentedHandle`], which implements the `oauth2`
//! crate's [`AsyncHttpClient`] and records the response status in a [`ResponseMetadataSlot`] so
//! failed exchanges can still report what the token endpoint answered. Token bodies are decoded
//! as JSON whatever `Content-Type` the endpoint labels them with.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	header::{CONTENT_TYPE, HeaderMap, HeaderValue},
	redirect::Policy,
};
// self
use crate::{_prelude::*, config::Config, error::ConfigError};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// A fresh slot is created for each token request and read immediately after `oauth2`
/// resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Shared reqwest client used for every call to the EHR.
///
/// Redirects are never followed: discovery, token, and resource endpoints must answer
/// directly.
#[derive(Clone, Debug)]
pub struct SmartHttpClient(pub ReqwestClient);
impl SmartHttpClient {
	/// Builds a client honoring the configured request and connect timeouts.
	pub fn new(config: &Config) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(config.http_timeout)
			.connect_timeout(config.connect_timeout)
			.redirect(Policy::none())
			.user_agent(USER_AGENT)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an `oauth2` transport handle that records response metadata in `slot`.
	pub fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}
}
impl AsRef<ReqwestClient> for SmartHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for SmartHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// [`AsyncHttpClient`] handle returned by [`SmartHttpClient::instrumented`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let mut headers = response.headers().to_owned();

			relabel_as_json(&mut headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

// `oauth2` refuses token bodies not labelled `application/json`.
fn relabel_as_json(headers: &mut HeaderMap) {
	headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn metadata_slot_take_clears_previous_value() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(400) });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(400));
		assert!(slot.take().is_none());
	}

	#[test]
	fn token_bodies_are_relabelled_as_json() {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
		relabel_as_json(&mut headers);

		assert_eq!(headers.get(CONTENT_TYPE), Some(&HeaderValue::from_static("application/json")));

		let mut unlabelled = HeaderMap::new();

		relabel_as_json(&mut unlabelled);

		assert_eq!(unlabelled.len(), 1);
	}

	#[test]
	fn client_builds_from_default_config() {
		let config = Config::new(
			"test_client",
			Url::parse("http://localhost:8080/authenticate").expect("Redirect URI should parse."),
		);

		assert!(SmartHttpClient::new(&config).is_ok());
	}
}

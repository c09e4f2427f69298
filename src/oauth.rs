//! `oauth2` crate facade specialised for SMART launch token responses.
//!
//! SMART token responses carry launch context (`encounter`, `patient`, `intent`) next to the
//! standard fields, and every value must reach the session exactly as the EHR sent it. The
//! crate's `StandardTokenResponse` lower-cases `token_type` and splits `scope`, so the facade
//! plugs in its own [`TokenResponse`] that keeps the raw strings.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AccessToken, AuthType, AuthorizationCode, Client, ClientId, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
	StandardRevocableToken, TokenResponse, TokenType, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse,
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::TokenExchangeError,
	http::{ResponseMetadata, ResponseMetadataSlot, SmartHttpClient},
};

pub use oauth2;

type SmartOAuthClient = Client<
	BasicErrorResponse,
	SmartTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// `token_type` preserved exactly as the token endpoint spelled it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SmartTokenType(pub String);
impl TokenType for SmartTokenType {}

/// Launch context returned alongside the access token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartLaunchFields {
	/// Launch intent requested by the EHR.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub intent: Option<String>,
	/// Encounter in context for this launch.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub encounter: Option<String>,
	/// Patient in context for this launch.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub patient: Option<String>,
}

/// Token response returned by SMART token endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RawTokenResponse", into = "RawTokenResponse")]
pub struct SmartTokenResponse {
	raw: RawTokenResponse,
	scopes: Option<Vec<Scope>>,
}
impl SmartTokenResponse {
	/// `expires_in` in seconds, as sent.
	pub fn expires_in_secs(&self) -> Option<u64> {
		self.raw.expires_in
	}

	/// Granted scope string, as sent.
	pub fn scope(&self) -> Option<&str> {
		self.raw.scope.as_deref()
	}

	/// SMART launch context fields.
	pub fn launch_fields(&self) -> &SmartLaunchFields {
		&self.raw.launch
	}
}
impl TokenResponse for SmartTokenResponse {
	type TokenType = SmartTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.raw.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.raw.token_type
	}

	fn expires_in(&self) -> Option<StdDuration> {
		self.raw.expires_in.map(StdDuration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.raw.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		self.scopes.as_ref()
	}
}
impl From<RawTokenResponse> for SmartTokenResponse {
	fn from(raw: RawTokenResponse) -> Self {
		let scopes = raw.scope.as_deref().map(|scope| {
			scope.split_whitespace().map(|value| Scope::new(value.to_owned())).collect()
		});

		Self { raw, scopes }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawTokenResponse {
	access_token: AccessToken,
	token_type: SmartTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	scope: Option<String>,
	#[serde(flatten)]
	launch: SmartLaunchFields,
}
impl From<SmartTokenResponse> for RawTokenResponse {
	fn from(response: SmartTokenResponse) -> Self {
		response.raw
	}
}

/// Inputs for one authorization-code exchange.
#[derive(Clone, Copy, Debug)]
pub struct CodeExchange<'a> {
	/// OAuth client identifier, sent in the request body.
	pub client_id: &'a str,
	/// Redirect URI used for the authorization request.
	pub redirect_uri: &'a Url,
	/// Token endpoint discovered for the issuer.
	pub token_endpoint: &'a Url,
	/// Authorization code returned to `/authenticate`.
	pub code: &'a str,
	/// PKCE verifier, when the authorization request carried a challenge.
	pub pkce_verifier: Option<&'a TokenSecret>,
}

/// Posts `grant_type=authorization_code` to the token endpoint and decodes the response.
pub async fn exchange_authorization_code(
	http: &SmartHttpClient,
	exchange: CodeExchange<'_>,
) -> Result<SmartTokenResponse, TokenExchangeError> {
	let meta = ResponseMetadataSlot::default();
	let handle = http.instrumented(meta.clone());
	let client: SmartOAuthClient = Client::new(ClientId::new(exchange.client_id.to_owned()))
		.set_token_uri(TokenUrl::from_url(exchange.token_endpoint.clone()))
		.set_redirect_uri(RedirectUrl::from_url(exchange.redirect_uri.clone()))
		.set_auth_type(AuthType::RequestBody);
	let mut request = client.exchange_code(AuthorizationCode::new(exchange.code.to_owned()));

	if let Some(verifier) = exchange.pkce_verifier {
		request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.expose().to_owned()));
	}

	request.request_async(&handle).await.map_err(|err| map_request_error(meta.take(), err))
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> TokenExchangeError {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{} ({description})", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			TokenExchangeError::Rejected { message, status }
		},
		RequestTokenError::Request(error) =>
			TokenExchangeError::Transport { source: Box::new(error), status },
		RequestTokenError::Parse(source, _body) => TokenExchangeError::Parse { source, status },
		RequestTokenError::Other(message) => TokenExchangeError::Unexpected { message, status },
	}
}

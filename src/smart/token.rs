//! Authorization-code exchange at the EHR token endpoint.

// self
use crate::{
	auth::TokenSecret,
	error::TokenExchangeError,
	http::SmartHttpClient,
	oauth::{self, CodeExchange},
	smart::{ClientRegistration, ClientSession, SmartConfiguration},
};

/// Exchanges `code` for a [`ClientSession`] bound to the configuration's issuer.
///
/// The client authenticates in the request body (`client_id` form field). `pkce_verifier` must be
/// the verifier whose challenge accompanied the authorization request, if any.
pub async fn exchange_code(
	http: &SmartHttpClient,
	client: &ClientRegistration,
	configuration: &SmartConfiguration,
	code: &str,
	pkce_verifier: Option<&TokenSecret>,
) -> Result<ClientSession, TokenExchangeError> {
	let response = oauth::exchange_authorization_code(http, CodeExchange {
		client_id: &client.client_id,
		redirect_uri: &client.redirect_uri,
		token_endpoint: &configuration.token_endpoint,
		code,
		pkce_verifier,
	})
	.await?;

	Ok(ClientSession::from_token_response(response, configuration.issuer.clone()))
}

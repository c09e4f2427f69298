//! Authorization URL composition and PKCE material.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{LaunchId, StateToken, TokenSecret},
	smart::{ClientRegistration, SmartConfiguration},
};

const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// PKCE verifier plus the challenge derived from it.
#[derive(Clone, Debug)]
pub struct PkcePair {
	verifier: TokenSecret,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh 64-character verifier.
	pub fn generate() -> Self {
		Self::from_verifier(
			rand::rng()
				.sample_iter(Alphanumeric)
				.take(PKCE_VERIFIER_LEN)
				.map(char::from)
				.collect::<String>(),
		)
	}

	/// Derives the S256 challenge for an existing verifier.
	pub fn from_verifier(verifier: impl Into<String>) -> Self {
		let verifier = TokenSecret::new(verifier);
		let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.expose().as_bytes()));

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}

	/// Secret verifier sent with the code exchange.
	pub fn verifier(&self) -> &TokenSecret {
		&self.verifier
	}

	/// Challenge sent with the authorization request.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method (currently always `S256`).
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}

	/// Drops the challenge, keeping only the verifier for the later exchange.
	pub fn into_verifier(self) -> TokenSecret {
		self.verifier
	}
}

/// Builds the EHR authorization URL for one launch.
///
/// Parameters are appended in a fixed order (`response_type`, `client_id`, `redirect_uri`,
/// `launch`, `scope`, `state`, `aud`, then the PKCE pair) after any query the authorization
/// endpoint already carries. Values are form-urlencoded.
pub fn build_authorization_url(
	configuration: &SmartConfiguration,
	client: &ClientRegistration,
	launch: &LaunchId,
	state: &StateToken,
	pkce: Option<&PkcePair>,
) -> Url {
	let mut url = configuration.authorization_endpoint.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", &client.client_id);
	pairs.append_pair("redirect_uri", client.redirect_uri.as_str());
	pairs.append_pair("launch", launch.as_str());
	pairs.append_pair("scope", &client.scope);
	pairs.append_pair("state", state.as_str());
	pairs.append_pair("aud", configuration.issuer.as_str());

	if let Some(pkce) = pkce {
		pairs.append_pair("code_challenge", pkce.challenge());
		pairs.append_pair("code_challenge_method", pkce.method().as_str());
	}

	drop(pairs);

	url
}

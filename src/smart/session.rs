//! Authenticated client session produced by a successful code exchange.

// crates.io
use oauth2::TokenResponse;
// self
use crate::{_prelude::*, auth::TokenSecret, oauth::SmartTokenResponse, smart::Issuer};

/// Access token plus SMART launch context, bound to the EHR it was issued by.
///
/// Every field mirrors the token response verbatim; nothing is normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSession {
	/// Bearer token for FHIR reads.
	pub access_token: TokenSecret,
	/// `token_type` as returned (usually `Bearer`).
	pub token_type: String,
	/// Lifetime of the access token in seconds, when reported.
	pub expires_in: Option<u64>,
	/// Granted scope string, when reported.
	pub scope: Option<String>,
	/// SMART launch intent.
	pub intent: Option<String>,
	/// Encounter bound to the launch.
	pub encounter: Option<String>,
	/// Patient bound to the launch.
	pub patient: Option<String>,
	/// FHIR base URL resource reads are issued against.
	pub endpoint: Issuer,
}
impl ClientSession {
	/// Builds a session from a decoded token response.
	pub fn from_token_response(response: SmartTokenResponse, endpoint: Issuer) -> Self {
		let launch = response.launch_fields().clone();

		Self {
			access_token: TokenSecret::new(response.access_token().secret().as_str()),
			token_type: response.token_type().0.clone(),
			expires_in: response.expires_in_secs(),
			scope: response.scope().map(str::to_owned),
			intent: launch.intent,
			encounter: launch.encounter,
			patient: launch.patient,
			endpoint,
		}
	}
}

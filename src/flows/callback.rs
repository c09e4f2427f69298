//! Second half of the handshake: the authorization callback to the first FHIR read.

// self
use crate::{
	_prelude::*,
	auth::StateToken,
	flows::Launcher,
	obs::{self, FlowStage},
	smart::{self, ClientSession},
};

/// Heading of the plain-text success page.
pub const SUCCESS_HEADING: &str = "SmartOnFhir authentication flow finished successfully!";

/// Result of a completed handshake.
#[derive(Clone, Debug)]
pub struct AuthenticatedLaunch {
	/// Session obtained from the token endpoint.
	pub session: ClientSession,
	/// Raw Encounter response body.
	pub encounter: String,
}
impl AuthenticatedLaunch {
	/// Plain-text page shown to the user.
	pub fn render(&self) -> String {
		format!("{SUCCESS_HEADING}\nEncounter: {}", self.encounter)
	}
}

impl Launcher {
	/// Consumes the launch stored under `state`, exchanges `code`, and reads the Encounter.
	///
	/// Unknown, already consumed, and expired states all yield [`Error::UnknownLaunch`].
	pub async fn authenticate(&self, state: &StateToken, code: &str) -> Result<AuthenticatedLaunch> {
		let pending = self
			.store
			.take(state, OffsetDateTime::now_utc())
			.await?
			.ok_or(Error::UnknownLaunch)?;
		let session = obs::observe(
			FlowStage::TokenExchange,
			smart::exchange_code(
				&self.http_client,
				&self.client,
				&pending.configuration,
				code,
				pending.pkce_verifier.as_ref(),
			),
		)
		.await?;
		let encounter = obs::observe(
			FlowStage::ResourceFetch,
			smart::fetch_encounter(&self.http_client, &session),
		)
		.await?;

		tracing::info!(issuer = %pending.issuer, "launch authenticated");

		Ok(AuthenticatedLaunch { session, encounter })
	}
}

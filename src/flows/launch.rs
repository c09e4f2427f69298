//! First half of the handshake: `/launch` to the authorization redirect.

// self
use crate::{
	_prelude::*,
	auth::{LaunchId, StateToken},
	flows::Launcher,
	obs::{self, FlowStage},
	smart::{self, Issuer, PkcePair, SmartConfiguration},
	store::PendingLaunch,
};

/// Redirect issued for an accepted launch.
#[derive(Clone, Debug)]
pub struct LaunchRedirect {
	/// `state` the pending launch is stored under.
	pub state: StateToken,
	/// EHR authorization URL the user agent is sent to.
	pub authorize_url: Url,
}

impl Launcher {
	/// Discovers `issuer`, stores a pending launch, and returns the authorization redirect.
	pub async fn launch(&self, issuer: Issuer, launch: LaunchId) -> Result<LaunchRedirect> {
		tracing::info!(issuer = %issuer, "launch received");

		let configuration =
			obs::observe(FlowStage::Discovery, smart::discover(&self.http_client, &issuer))
				.await?;

		obs::observe(FlowStage::Authorization, self.authorize(configuration, launch)).await
	}

	async fn authorize(
		&self,
		configuration: SmartConfiguration,
		launch: LaunchId,
	) -> Result<LaunchRedirect> {
		let state = self.state_strategy.generate();
		let pkce = self.pkce.then(PkcePair::generate);

		if pkce.is_some() && !configuration.supports_pkce_s256() {
			tracing::debug!(
				issuer = %configuration.issuer,
				"EHR does not advertise S256 PKCE; sending the challenge anyway"
			);
		}

		let authorize_url = smart::build_authorization_url(
			&configuration,
			&self.client,
			&launch,
			&state,
			pkce.as_ref(),
		);
		let mut pending = PendingLaunch::new(
			state.clone(),
			launch,
			configuration,
			OffsetDateTime::now_utc(),
			self.launch_ttl,
		);

		if let Some(pkce) = pkce {
			pending = pending.with_pkce_verifier(pkce.into_verifier());
		}

		self.store.save(pending).await?;

		Ok(LaunchRedirect { state, authorize_url })
	}
}

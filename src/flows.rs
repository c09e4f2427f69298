//! Launch flow orchestration across `/launch` and `/authenticate`.
//!
//! [`Launcher`] owns the outbound HTTP client, the pending-launch store, and the client
//! registration so the HTTP front only translates parameters and renders results. The first
//! half ([`Launcher::launch`]) discovers the EHR, stores a [`PendingLaunch`] under a fresh
//! `state`, and returns the authorization redirect. The second half
//! ([`Launcher::authenticate`]) consumes that launch exactly once, exchanges the code, and reads
//! the bound Encounter.
//!
//! [`PendingLaunch`]: crate::store::PendingLaunch

pub mod callback;
pub mod launch;

pub use callback::*;
pub use launch::*;

// self
use crate::{
	_prelude::*,
	config::{Config, StateStrategy},
	http::SmartHttpClient,
	smart::ClientRegistration,
	store::{LaunchStore, MemoryStore},
};

/// Coordinates the SMART launch handshake for a single client registration.
#[derive(Clone)]
pub struct Launcher {
	/// HTTP client used for every outbound EHR request.
	pub http_client: SmartHttpClient,
	/// Store holding launches until their authorization callback arrives.
	pub store: Arc<dyn LaunchStore>,
	/// Client registration sent to the EHR.
	pub client: ClientRegistration,
	/// How each launch's `state` is produced.
	pub state_strategy: StateStrategy,
	/// Whether authorization requests carry a PKCE challenge.
	pub pkce: bool,
	/// How long a launch waits for its callback.
	pub launch_ttl: Duration,
}
impl Launcher {
	/// Validates `config` and provisions a reqwest client plus an in-memory store.
	pub fn new(config: &Config) -> Result<Self> {
		config.validate()?;

		let http_client = SmartHttpClient::new(config)?;

		Ok(Self::with_parts(config, http_client, Arc::new(MemoryStore::default())))
	}

	/// Creates a launcher from caller-provided transport and store.
	pub fn with_parts(
		config: &Config,
		http_client: SmartHttpClient,
		store: Arc<dyn LaunchStore>,
	) -> Self {
		Self {
			http_client,
			store,
			client: ClientRegistration::from(config),
			state_strategy: config.state_strategy.clone(),
			pkce: config.pkce,
			launch_ttl: config.launch_lifetime(),
		}
	}

	/// Drops launches whose callback never arrived.
	pub async fn purge_expired(&self) -> Result<usize> {
		let removed = self.store.purge_expired(OffsetDateTime::now_utc()).await?;

		if removed > 0 {
			tracing::debug!(removed, "purged expired launches");
		}

		Ok(removed)
	}
}
impl Debug for Launcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Launcher")
			.field("client", &self.client)
			.field("state_strategy", &self.state_strategy)
			.field("pkce", &self.pkce)
			.field("launch_ttl", &self.launch_ttl)
			.finish()
	}
}

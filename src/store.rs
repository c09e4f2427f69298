//! Storage contract and the built-in store for launches awaiting their authorization callback.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{LaunchId, StateToken, TokenSecret},
	smart::{Issuer, SmartConfiguration},
};

/// Boxed future returned by [`LaunchStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Backend contract for pending-launch state keyed by the OAuth `state` value.
pub trait LaunchStore
where
	Self: Send + Sync,
{
	/// Persists a pending launch, replacing any launch stored under the same state.
	fn save(&self, launch: PendingLaunch) -> StoreFuture<'_, ()>;

	/// Removes and returns the launch stored under `state` unless it expired before `now`.
	///
	/// A launch can be taken at most once.
	fn take<'a>(
		&'a self,
		state: &'a StateToken,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<PendingLaunch>>;

	/// Drops every launch that expired before `now`, returning how many were removed.
	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Error type produced by [`LaunchStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// The store refuses new launches until older ones complete or expire.
	#[error("Too many pending launches (limit {limit}).")]
	CapacityExceeded {
		/// Configured limit.
		limit: usize,
	},
}

/// Everything `/authenticate` needs from the `/launch` that started the flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLaunch {
	/// OAuth `state` the launch is stored under.
	pub state: StateToken,
	/// EHR that initiated the launch.
	pub issuer: Issuer,
	/// Launch context handed over by the EHR.
	pub launch: LaunchId,
	/// Configuration discovered for `issuer`.
	pub configuration: SmartConfiguration,
	/// PKCE verifier, when the authorization request carried a challenge.
	pub pkce_verifier: Option<TokenSecret>,
	/// Instant the launch was stored.
	pub created_at: OffsetDateTime,
	/// Instant after which the launch is treated as unknown.
	pub expires_at: OffsetDateTime,
}
impl PendingLaunch {
	/// Creates a launch that stays valid for `ttl` from `now`.
	pub fn new(
		state: StateToken,
		launch: LaunchId,
		configuration: SmartConfiguration,
		now: OffsetDateTime,
		ttl: Duration,
	) -> Self {
		Self {
			state,
			issuer: configuration.issuer.clone(),
			launch,
			configuration,
			pkce_verifier: None,
			created_at: now,
			expires_at: now.saturating_add(ttl),
		}
	}

	/// Attaches the PKCE verifier for the later code exchange.
	pub fn with_pkce_verifier(mut self, verifier: TokenSecret) -> Self {
		self.pkce_verifier = Some(verifier);

		self
	}

	/// Whether the launch is no longer usable at `now`.
	pub fn is_expired(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}
}

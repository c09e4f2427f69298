//! Thread-safe in-memory [`LaunchStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::StateToken,
	store::{LaunchStore, PendingLaunch, StoreError, StoreFuture},
};

type LaunchMap = Arc<RwLock<HashMap<StateToken, PendingLaunch>>>;

/// Default upper bound on launches awaiting their callback.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Storage backend that keeps pending launches in-process.
///
/// Expired entries are pruned on every write and never returned from [`LaunchStore::take`].
#[derive(Clone, Debug)]
pub struct MemoryStore {
	launches: LaunchMap,
	max_pending: usize,
}
impl MemoryStore {
	/// Caps the number of launches stored at once.
	pub fn with_max_pending(mut self, max_pending: usize) -> Self {
		self.max_pending = max_pending;

		self
	}

	/// Number of launches currently stored, expired ones included.
	pub fn len(&self) -> usize {
		self.launches.read().len()
	}

	/// Whether no launches are stored.
	pub fn is_empty(&self) -> bool {
		self.launches.read().is_empty()
	}

	fn save_now(
		map: LaunchMap,
		max_pending: usize,
		launch: PendingLaunch,
	) -> Result<(), StoreError> {
		let mut guard = map.write();

		guard.retain(|_, pending| !pending.is_expired(launch.created_at));

		if !guard.contains_key(&launch.state) && guard.len() >= max_pending {
			return Err(StoreError::CapacityExceeded { limit: max_pending });
		}

		guard.insert(launch.state.clone(), launch);

		Ok(())
	}

	fn take_now(map: LaunchMap, state: &StateToken, now: OffsetDateTime) -> Option<PendingLaunch> {
		map.write().remove(state).filter(|launch| !launch.is_expired(now))
	}

	fn purge_now(map: LaunchMap, now: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, pending| !pending.is_expired(now));

		before - guard.len()
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self { launches: Default::default(), max_pending: DEFAULT_MAX_PENDING }
	}
}
impl LaunchStore for MemoryStore {
	fn save(&self, launch: PendingLaunch) -> StoreFuture<'_, ()> {
		let map = self.launches.clone();
		let max_pending = self.max_pending;

		Box::pin(async move { Self::save_now(map, max_pending, launch) })
	}

	fn take<'a>(
		&'a self,
		state: &'a StateToken,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<PendingLaunch>> {
		let map = self.launches.clone();

		Box::pin(async move { Ok(Self::take_now(map, state, now)) })
	}

	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		let map = self.launches.clone();

		Box::pin(async move { Ok(Self::purge_now(map, now)) })
	}
}

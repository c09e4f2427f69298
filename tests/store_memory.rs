// crates.io
use time::{Duration, OffsetDateTime, macros};
use url::Url;
// self
use smart_launch::{
	auth::{LaunchId, StateToken, TokenSecret},
	smart::{Issuer, SmartConfiguration},
	store::{LaunchStore, MemoryStore, PendingLaunch, StoreError},
};

const T0: OffsetDateTime = macros::datetime!(2025-11-10 12:00 UTC);

fn state(value: &str) -> StateToken {
	StateToken::new(value).expect("State fixture should be valid.")
}

fn pending(value: &str, now: OffsetDateTime) -> PendingLaunch {
	let configuration = SmartConfiguration {
		issuer: Issuer::parse("https://ehr.example/fhir").expect("Issuer should parse."),
		authorization_endpoint: Url::parse("https://ehr.example/authorize")
			.expect("Authorization endpoint should parse."),
		token_endpoint: Url::parse("https://ehr.example/token")
			.expect("Token endpoint should parse."),
		scopes_supported: Vec::new(),
		capabilities: Vec::new(),
		code_challenge_methods_supported: Vec::new(),
	};

	PendingLaunch::new(
		state(value),
		LaunchId::new("abc123").expect("Launch fixture should be valid."),
		configuration,
		now,
		Duration::minutes(10),
	)
}

#[tokio::test]
async fn take_is_one_shot() {
	let store = MemoryStore::default();
	let launch = pending("s1", T0).with_pkce_verifier(TokenSecret::new("verifier"));

	store.save(launch.clone()).await.expect("Saving a launch should succeed.");

	let taken = store
		.take(&state("s1"), T0 + Duration::minutes(1))
		.await
		.expect("Taking a launch should succeed.")
		.expect("Stored launch should be returned.");

	assert_eq!(taken, launch);
	assert!(
		store
			.take(&state("s1"), T0 + Duration::minutes(1))
			.await
			.expect("Second take should succeed.")
			.is_none()
	);
	assert!(store.is_empty());
}

#[tokio::test]
async fn take_hides_expired_launches() {
	let store = MemoryStore::default();

	store.save(pending("s1", T0)).await.expect("Saving a launch should succeed.");

	let taken = store
		.take(&state("s1"), T0 + Duration::minutes(10))
		.await
		.expect("Taking an expired launch should succeed.");

	assert!(taken.is_none());
	assert!(store.is_empty());
}

#[tokio::test]
async fn save_replaces_launch_with_same_state() {
	let store = MemoryStore::default();
	let newer = pending("state", T0 + Duration::minutes(1));

	store.save(pending("state", T0)).await.expect("Saving the first launch should succeed.");
	store.save(newer.clone()).await.expect("Saving the second launch should succeed.");

	assert_eq!(store.len(), 1);

	let taken = store
		.take(&state("state"), T0 + Duration::minutes(2))
		.await
		.expect("Taking a launch should succeed.");

	assert_eq!(taken, Some(newer));
}

#[tokio::test]
async fn purge_removes_only_expired_launches() {
	let store = MemoryStore::default();

	store.save(pending("old", T0)).await.expect("Saving the old launch should succeed.");
	store
		.save(pending("new", T0 + Duration::minutes(5)))
		.await
		.expect("Saving the new launch should succeed.");

	let removed = store
		.purge_expired(T0 + Duration::minutes(12))
		.await
		.expect("Purging should succeed.");

	assert_eq!(removed, 1);
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn capacity_limit_applies_to_new_states_only() {
	let store = MemoryStore::default().with_max_pending(1);

	store.save(pending("s1", T0)).await.expect("First launch should fit.");

	let err = store
		.save(pending("s2", T0))
		.await
		.expect_err("Second distinct launch should exceed the limit.");

	assert_eq!(err, StoreError::CapacityExceeded { limit: 1 });

	store.save(pending("s1", T0)).await.expect("Replacing an existing state should succeed.");
	store
		.save(pending("s2", T0 + Duration::minutes(11)))
		.await
		.expect("Expired launches should free capacity.");
}

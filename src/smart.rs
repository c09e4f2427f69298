//! SMART-on-FHIR building blocks: discovery, the authorization redirect, the code exchange, and
//! the first authenticated Encounter read.
//!
//! Each step is a free function over explicit inputs; [`crate::flows::Launcher`] sequences them
//! and carries the per-launch state between `/launch` and `/authenticate`.

pub mod authorize;
pub mod discovery;
pub mod encounter;
pub mod session;
pub mod token;

pub use authorize::*;
pub use discovery::*;
pub use encounter::*;
pub use session::*;
pub use token::*;

// self
use crate::{_prelude::*, config::Config};

/// Client registration sent to the EHR on every launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientRegistration {
	/// OAuth client identifier.
	pub client_id: String,
	/// Redirect URI the EHR returns the user to.
	pub redirect_uri: Url,
	/// Space-delimited scope string requested during authorization.
	pub scope: String,
}
impl ClientRegistration {
	/// Creates a registration requesting `scope`.
	pub fn new(client_id: impl Into<String>, redirect_uri: Url, scope: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), redirect_uri, scope: scope.into() }
	}
}
impl From<&Config> for ClientRegistration {
	fn from(config: &Config) -> Self {
		Self::new(config.client_id.clone(), config.redirect_uri.clone(), config.scope.clone())
	}
}

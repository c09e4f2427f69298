//! Startup configuration for the launch service.
//!
//! [`Config`] doubles as the binary's `clap` parser (flags and `SMART_*` environment
//! variables) and as a plain struct for embedding the flow in other hosts.

// std
use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	time::Duration as StdDuration,
};
// crates.io
use clap::{ArgAction, Parser};
// self
use crate::{_prelude::*, auth::StateToken, error::ConfigError};

/// Client identifier registered with the sandbox EHR.
pub const DEFAULT_CLIENT_ID: &str = "test_client";
/// Redirect URI the EHR sends the user back to.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/authenticate";
/// Scope requested on every launch.
pub const DEFAULT_SCOPE: &str = "openid fhirUser profile launch launch/patient launch/encounter";

const RANDOM_STATE_LEN: usize = 32;

/// How the OAuth `state` value is produced for each launch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StateStrategy {
	#[default]
	/// Fresh 32-character alphanumeric value per launch.
	Random,
	/// The same value for every launch; concurrent launches overwrite each other.
	Fixed(StateToken),
}
impl StateStrategy {
	/// Produces the `state` for a new launch.
	pub fn generate(&self) -> StateToken {
		match self {
			Self::Random => StateToken::random(RANDOM_STATE_LEN),
			Self::Fixed(token) => token.clone(),
		}
	}
}
impl FromStr for StateStrategy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || ConfigError::InvalidStateStrategy { value: s.to_owned() };

		if s.eq_ignore_ascii_case("random") {
			return Ok(Self::Random);
		}

		let fixed = s.strip_prefix("fixed:").ok_or_else(invalid)?;

		StateToken::new(fixed).map(Self::Fixed).map_err(|_| invalid())
	}
}
impl Display for StateStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Random => f.write_str("random"),
			Self::Fixed(token) => write!(f, "fixed:{token}"),
		}
	}
}

/// Runtime options for the launch service.
#[derive(Clone, Debug, Parser)]
#[command(name = "smart-launch", version, about = "SMART-on-FHIR EHR launch endpoint.")]
pub struct Config {
	/// OAuth client identifier registered with the EHR.
	#[arg(long, env = "SMART_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
	pub client_id: String,
	/// Redirect URI registered with the EHR; must route to `/authenticate`.
	#[arg(long, env = "SMART_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
	pub redirect_uri: Url,
	/// Address the HTTP front binds to.
	#[arg(long, env = "SMART_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub host: IpAddr,
	/// Port the HTTP front listens on.
	#[arg(long, env = "SMART_PORT", default_value_t = 8080)]
	pub port: u16,
	/// Space-delimited scope string requested on every launch.
	#[arg(long, env = "SMART_SCOPE", default_value = DEFAULT_SCOPE)]
	pub scope: String,
	/// `random` or `fixed:<value>`.
	#[arg(long, env = "SMART_STATE_STRATEGY", default_value = "random")]
	pub state_strategy: StateStrategy,
	/// Send an S256 PKCE challenge with every authorization request.
	#[arg(long, env = "SMART_PKCE", default_value_t = true, action = ArgAction::Set)]
	pub pkce: bool,
	/// Total timeout for each outbound request, in seconds.
	#[arg(long, env = "SMART_HTTP_TIMEOUT", default_value = "10", value_parser = parse_seconds)]
	pub http_timeout: StdDuration,
	/// Connect timeout for each outbound request, in seconds.
	#[arg(long, env = "SMART_CONNECT_TIMEOUT", default_value = "5", value_parser = parse_seconds)]
	pub connect_timeout: StdDuration,
	/// How long a launch may wait for its authorization callback, in seconds.
	#[arg(long, env = "SMART_LAUNCH_TTL", default_value = "600", value_parser = parse_seconds)]
	pub launch_ttl: StdDuration,
}
impl Config {
	/// Creates a configuration for the given client registration with default options.
	pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
		Self {
			client_id: client_id.into(),
			redirect_uri,
			host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
			port: 8080,
			scope: DEFAULT_SCOPE.into(),
			state_strategy: StateStrategy::Random,
			pkce: true,
			http_timeout: StdDuration::from_secs(10),
			connect_timeout: StdDuration::from_secs(5),
			launch_ttl: StdDuration::from_secs(600),
		}
	}

	/// Overrides the listen address.
	pub fn with_listen(mut self, host: IpAddr, port: u16) -> Self {
		self.host = host;
		self.port = port;

		self
	}

	/// Overrides the requested scope string.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the state strategy.
	pub fn with_state_strategy(mut self, strategy: StateStrategy) -> Self {
		self.state_strategy = strategy;

		self
	}

	/// Enables or disables PKCE.
	pub fn with_pkce(mut self, pkce: bool) -> Self {
		self.pkce = pkce;

		self
	}

	/// Overrides the outbound request and connect timeouts.
	pub fn with_timeouts(mut self, request: StdDuration, connect: StdDuration) -> Self {
		self.http_timeout = request;
		self.connect_timeout = connect;

		self
	}

	/// Overrides how long pending launches stay valid.
	pub fn with_launch_ttl(mut self, ttl: StdDuration) -> Self {
		self.launch_ttl = ttl;

		self
	}

	/// Socket address the HTTP front binds to.
	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	/// Pending-launch lifetime expressed for timestamp arithmetic.
	pub fn launch_lifetime(&self) -> Duration {
		Duration::try_from(self.launch_ttl).unwrap_or(Duration::MAX)
	}

	/// Checks the invariants the flow relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyClientId);
		}
		if self.scope.split_whitespace().next().is_none() {
			return Err(ConfigError::EmptyScope);
		}
		if let Some(scope) = self.scope.split(' ').find(|scope| scope.chars().any(char::is_control))
		{
			return Err(ConfigError::InvalidScope { scope: scope.to_owned() });
		}

		for (name, value) in [
			("http-timeout", self.http_timeout),
			("connect-timeout", self.connect_timeout),
			("launch-ttl", self.launch_ttl),
		] {
			if value.is_zero() {
				return Err(ConfigError::ZeroDuration { name });
			}
		}

		Ok(())
	}
}

fn parse_seconds(raw: &str) -> Result<StdDuration, String> {
	raw.trim()
		.parse::<u64>()
		.map(StdDuration::from_secs)
		.map_err(|e| format!("expected a whole number of seconds: {e}"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> Config {
		Config::new(
			DEFAULT_CLIENT_ID,
			Url::parse(DEFAULT_REDIRECT_URI).expect("Default redirect URI should parse."),
		)
	}

	#[test]
	fn state_strategy_parses_random_and_fixed() {
		assert_eq!("random".parse::<StateStrategy>().ok(), Some(StateStrategy::Random));

		let fixed = "fixed:state".parse::<StateStrategy>().expect("Fixed strategy should parse.");

		assert_eq!(fixed.generate().as_str(), "state");
		assert_eq!(fixed.to_string(), "fixed:state");
		assert!("fixed:".parse::<StateStrategy>().is_err());
		assert!("sequential".parse::<StateStrategy>().is_err());
	}

	#[test]
	fn random_state_is_alphanumeric_and_fresh() {
		let first = StateStrategy::Random.generate();
		let second = StateStrategy::Random.generate();

		assert_eq!(first.len(), RANDOM_STATE_LEN);
		assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(first, second);
	}

	#[test]
	fn validate_rejects_empty_and_zero_values() {
		assert!(config().validate().is_ok());

		let mut empty_client = config();

		empty_client.client_id = " ".into();

		assert!(matches!(empty_client.validate(), Err(ConfigError::EmptyClientId)));
		assert!(matches!(config().with_scope("  ").validate(), Err(ConfigError::EmptyScope)));
		assert!(matches!(
			config().with_scope("openid \u{0007}x").validate(),
			Err(ConfigError::InvalidScope { .. })
		));
		assert!(matches!(
			config().with_launch_ttl(StdDuration::ZERO).validate(),
			Err(ConfigError::ZeroDuration { name: "launch-ttl" })
		));
	}

	#[test]
	fn cli_defaults_match_programmatic_defaults() {
		let parsed = Config::try_parse_from(["smart-launch"]).expect("Defaults should parse.");
		let built = config();

		assert_eq!(parsed.client_id, built.client_id);
		assert_eq!(parsed.redirect_uri, built.redirect_uri);
		assert_eq!(parsed.listen_addr(), built.listen_addr());
		assert_eq!(parsed.scope, built.scope);
		assert_eq!(parsed.state_strategy, built.state_strategy);
		assert_eq!(parsed.pkce, built.pkce);
		assert_eq!(parsed.http_timeout, built.http_timeout);
		assert_eq!(parsed.launch_ttl, built.launch_ttl);
	}

	#[test]
	fn cli_flags_override_defaults() {
		let parsed = Config::try_parse_from([
			"smart-launch",
			"--client-id",
			"my_app",
			"--port",
			"9090",
			"--state-strategy",
			"fixed:state",
			"--pkce",
			"false",
			"--http-timeout",
			"3",
		])
		.expect("Flags should parse.");

		assert_eq!(parsed.client_id, "my_app");
		assert_eq!(parsed.port, 9090);
		assert!(!parsed.pkce);
		assert_eq!(parsed.http_timeout, StdDuration::from_secs(3));
		assert!(matches!(parsed.state_strategy, StateStrategy::Fixed(_)));
	}
}

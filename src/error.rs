//! Crate-level error types shared by discovery, the token exchange, resource reads, and the
//! HTTP front.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by the launch flow.
///
/// Every variant maps onto exactly one HTTP status at the server boundary, so callers never
/// have to inspect messages to decide how to respond.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Pending-launch store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// The EHR discovery document could not be fetched or decoded.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
	/// The authorization code could not be exchanged for a session.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// The encounter read failed after a successful exchange.
	#[error(transparent)]
	ResourceFetch(#[from] ResourceFetchError),

	/// A required request parameter was absent or empty.
	#[error("Missing required parameter `{name}`.")]
	MissingParameter {
		/// Parameter name.
		name: &'static str,
	},
	/// A request parameter was present but malformed.
	#[error("Parameter `{name}` is invalid: {reason}")]
	InvalidParameter {
		/// Parameter name.
		name: &'static str,
		/// Human-readable validation failure.
		reason: String,
	},
	/// No pending launch matches the returned `state`.
	#[error("No pending launch matches the returned state; start again from the EHR.")]
	UnknownLaunch,
	/// The authorization server redirected back with an OAuth error instead of a code.
	#[error("Authorization was denied by the EHR: {error}{}.", describe(.description))]
	AuthorizationDenied {
		/// OAuth `error` parameter.
		error: String,
		/// OAuth `error_description` parameter, when supplied.
		description: Option<String>,
	},
}
impl Error {
	/// Builds an [`Error::InvalidParameter`] from any displayable reason.
	pub fn invalid_parameter(name: &'static str, reason: impl Display) -> Self {
		Self::InvalidParameter { name, reason: reason.to_string() }
	}
}

fn describe(description: &Option<String>) -> String {
	description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The OAuth client id is empty.
	#[error("Client id cannot be empty.")]
	EmptyClientId,
	/// The requested scope string is empty.
	#[error("Scope string cannot be empty.")]
	EmptyScope,
	/// A scope token contains control characters.
	#[error("Scope `{scope}` contains control characters.")]
	InvalidScope {
		/// Offending scope token.
		scope: String,
	},
	/// A duration option is zero.
	#[error("The {name} option must be greater than zero.")]
	ZeroDuration {
		/// Option name.
		name: &'static str,
	},
	/// The state strategy could not be parsed.
	#[error("Unknown state strategy `{value}`; expected `random` or `fixed:<value>`.")]
	InvalidStateStrategy {
		/// Raw option value.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures while fetching `<iss>/.well-known/smart-configuration`.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// The discovery URL could not be derived from the issuer.
	#[error("Cannot derive the discovery URL from the issuer.")]
	InvalidIssuer {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Network failure reaching the discovery document.
	#[error("Failed to reach the SMART discovery document at {url}.")]
	Transport {
		/// Discovery URL.
		url: String,
		/// Transport failure.
		#[source]
		source: ReqwestError,
	},
	/// The discovery endpoint answered with a non-success status.
	#[error("SMART discovery document at {url} returned HTTP {status}.")]
	Status {
		/// Discovery URL.
		url: String,
		/// HTTP status code.
		status: u16,
	},
	/// The discovery document is not the expected JSON shape.
	#[error("SMART discovery document is malformed at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Failures while exchanging an authorization code at the token endpoint.
#[derive(Debug, ThisError)]
pub enum TokenExchangeError {
	/// The token endpoint answered with an OAuth error response.
	#[error("Token endpoint rejected the authorization code: {message}.")]
	Rejected {
		/// OAuth `error` code or description.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Network failure reaching the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport failure.
		#[source]
		source: BoxError,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The token endpoint answered with JSON that does not match a token response.
	#[error("Token endpoint returned malformed JSON at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Any other unexpected token endpoint response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TokenExchangeError {
	/// HTTP status reported by the token endpoint, if any response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::Transport { status, .. }
			| Self::Parse { status, .. }
			| Self::Unexpected { status, .. } => *status,
		}
	}
}

/// Failures while reading the bound Encounter resource.
#[derive(Debug, ThisError)]
pub enum ResourceFetchError {
	/// The token response carried no encounter context.
	#[error("Token response did not include an encounter context.")]
	MissingEncounter,
	/// The resource URL could not be derived from the EHR base endpoint.
	#[error("Cannot derive the Encounter URL from the EHR endpoint.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Network failure reaching the FHIR server.
	#[error("Network error occurred while reading the Encounter resource.")]
	Transport {
		/// Transport failure.
		#[source]
		source: ReqwestError,
	},
	/// The FHIR server answered with a non-success status.
	#[error("Encounter read returned HTTP {status}: {body_preview}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
	},
}

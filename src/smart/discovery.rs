//! `.well-known/smart-configuration` discovery.

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{_prelude::*, error::DiscoveryError, http::SmartHttpClient};

/// Path of the SMART discovery document relative to the issuer.
pub const WELL_KNOWN_PATH: &str = ".well-known/smart-configuration";

/// Error returned when the `iss` launch parameter is not a usable FHIR base URL.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IssuerError {
	/// The value is not an absolute URL.
	#[error("Issuer is not an absolute URL: {source}.")]
	Parse {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Only `http` and `https` issuers are supported.
	#[error("Issuer scheme `{scheme}` is not supported.")]
	UnsupportedScheme {
		/// Scheme that was supplied.
		scheme: String,
	},
	/// The URL has no host component.
	#[error("Issuer must include a host.")]
	MissingHost,
	/// Query strings and fragments cannot be part of a FHIR base URL.
	#[error("Issuer must not carry a query string or fragment.")]
	UnexpectedQuery,
}

/// FHIR base URL of the launching EHR, kept exactly as passed in the `iss` parameter.
///
/// Derived URLs (`<iss>/.well-known/...`, `<iss>/Encounter`) are joined without a doubled `/`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Issuer(String);
impl Issuer {
	/// Validates an issuer URL without rewriting it.
	pub fn parse(raw: &str) -> Result<Self, IssuerError> {
		let raw = raw.trim();
		let url = Url::parse(raw).map_err(|source| IssuerError::Parse { source })?;

		if !matches!(url.scheme(), "http" | "https") {
			return Err(IssuerError::UnsupportedScheme { scheme: url.scheme().to_owned() });
		}
		if url.host_str().is_none_or(str::is_empty) {
			return Err(IssuerError::MissingHost);
		}
		if url.query().is_some() || url.fragment().is_some() {
			return Err(IssuerError::UnexpectedQuery);
		}

		Ok(Self(raw.to_owned()))
	}

	/// Issuer as sent in the `aud` parameter.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Resolves `path` below the issuer without dropping its last path segment.
	pub fn join_path(&self, path: &str) -> Result<Url, url::ParseError> {
		Url::parse(&format!(
			"{}/{}",
			self.0.trim_end_matches('/'),
			path.trim_start_matches('/')
		))
	}
}
impl Debug for Issuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Issuer({})", self.0)
	}
}
impl Display for Issuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for Issuer {
	type Err = IssuerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl TryFrom<String> for Issuer {
	type Error = IssuerError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}
impl From<Issuer> for String {
	fn from(value: Issuer) -> Self {
		value.0
	}
}

/// OAuth endpoints and capabilities advertised by an EHR.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmartConfiguration {
	/// Issuer the document was discovered from; also the FHIR base for resource reads.
	pub issuer: Issuer,
	/// Authorization endpoint users are redirected to.
	pub authorization_endpoint: Url,
	/// Token endpoint used for the code exchange.
	pub token_endpoint: Url,
	/// Scopes the EHR advertises, in document order.
	pub scopes_supported: Vec<String>,
	/// SMART capabilities the EHR advertises, in document order.
	pub capabilities: Vec<String>,
	/// PKCE methods the EHR advertises, in document order.
	pub code_challenge_methods_supported: Vec<String>,
}
impl SmartConfiguration {
	/// Stamps `issuer` onto a decoded discovery document.
	pub fn from_document(issuer: Issuer, document: DiscoveryDocument) -> Self {
		Self {
			issuer,
			authorization_endpoint: document.authorization_endpoint,
			token_endpoint: document.token_endpoint,
			scopes_supported: document.scopes_supported,
			capabilities: document.capabilities,
			code_challenge_methods_supported: document.code_challenge_methods_supported,
		}
	}

	/// Whether the EHR advertises the S256 PKCE method.
	pub fn supports_pkce_s256(&self) -> bool {
		self.code_challenge_methods_supported.iter().any(|method| method == "S256")
	}
}

/// Wire shape of `.well-known/smart-configuration`; unknown members are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct DiscoveryDocument {
	/// Authorization endpoint URL.
	pub authorization_endpoint: Url,
	/// Token endpoint URL.
	pub token_endpoint: Url,
	/// Advertised scopes.
	#[serde(default)]
	pub scopes_supported: Vec<String>,
	/// Advertised SMART capabilities.
	#[serde(default)]
	pub capabilities: Vec<String>,
	/// Advertised PKCE methods.
	#[serde(default)]
	pub code_challenge_methods_supported: Vec<String>,
}

/// Fetches and decodes `<issuer>/.well-known/smart-configuration`.
pub async fn discover(
	http: &SmartHttpClient,
	issuer: &Issuer,
) -> Result<SmartConfiguration, DiscoveryError> {
	let url = issuer
		.join_path(WELL_KNOWN_PATH)
		.map_err(|source| DiscoveryError::InvalidIssuer { source })?;
	let transport = |source| DiscoveryError::Transport { url: url.to_string(), source };
	let response = http
		.get(url.clone())
		.header(ACCEPT, "application/json")
		.send()
		.await
		.map_err(transport)?;
	let status = response.status();

	if !status.is_success() {
		return Err(DiscoveryError::Status { url: url.to_string(), status: status.as_u16() });
	}

	let body = response.bytes().await.map_err(transport)?;
	let document = decode_document(&body)?;

	Ok(SmartConfiguration::from_document(issuer.clone(), document))
}

fn decode_document(body: &[u8]) -> Result<DiscoveryDocument, DiscoveryError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DiscoveryError::Parse { source })
}

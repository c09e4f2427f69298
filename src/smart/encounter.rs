//! First authenticated FHIR read: the Encounter bound to the launch.

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{error::ResourceFetchError, http::SmartHttpClient, smart::ClientSession};

/// Media type requested for FHIR resources.
pub const FHIR_JSON: &str = "application/fhir+json";

const BODY_PREVIEW_LIMIT: usize = 256;

/// Reads `<endpoint>/Encounter?_id=<encounter>` and returns the body unparsed.
pub async fn fetch_encounter(
	http: &SmartHttpClient,
	session: &ClientSession,
) -> Result<String, ResourceFetchError> {
	let encounter = session
		.encounter
		.as_deref()
		.filter(|id| !id.is_empty())
		.ok_or(ResourceFetchError::MissingEncounter)?;
	let mut url = session
		.endpoint
		.join_path("Encounter")
		.map_err(|source| ResourceFetchError::InvalidUrl { source })?;

	url.query_pairs_mut().append_pair("_id", encounter);

	let response = http
		.get(url)
		.bearer_auth(session.access_token.expose())
		.header(ACCEPT, FHIR_JSON)
		.send()
		.await
		.map_err(|source| ResourceFetchError::Transport { source })?;
	let status = response.status();
	let body = response.text().await.map_err(|source| ResourceFetchError::Transport { source })?;

	if !status.is_success() {
		return Err(ResourceFetchError::Status {
			status: status.as_u16(),
			body_preview: truncate_preview(body),
		});
	}

	Ok(body)
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn previews_are_bounded() {
		assert_eq!(truncate_preview("short".into()), "short");

		let preview = truncate_preview("x".repeat(BODY_PREVIEW_LIMIT + 10));

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}

//! MusicBrainz HTTP client
//!
//! Handles communication with the MusicBrainz web service.
//! See: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! Rate limiting and retries are the caller's responsibility (the metadata
//! facade in `service.rs` owns the shared rate gate) — this client only
//! knows how to shape requests and parse responses.

use super::dto;
use crate::enrichment::domain::EnrichmentError;

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl MusicBrainzClient {
    /// Create a new client. `user_agent` should identify the application and
    /// a contact per MusicBrainz's usage policy (config's `musicbrainz.userAgent`).
    pub fn new(user_agent: impl AsRef<str>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent.as_ref())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: "https://musicbrainz.org/ws/2".to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(user_agent: impl AsRef<str>, base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent.as_ref())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// `GET /recording/{id}?inc=artists+releases+release-groups+media+recordings`
    pub async fn fetch_recording(&self, recording_id: &str) -> Result<dto::RecordingResponse, EnrichmentError> {
        let url = format!(
            "{}/recording/{}?fmt=json&inc=artists+releases+release-groups+media+recordings",
            self.base_url, recording_id
        );
        self.get_json(&url).await
    }

    /// `GET /release/{id}?inc=recordings+media+release-groups`, used by
    /// `forceTrackFromLockedAlbum`'s release variant.
    pub async fn fetch_release(&self, release_id: &str) -> Result<dto::Release, EnrichmentError> {
        let url = format!(
            "{}/release/{}?fmt=json&inc=recordings+media+release-groups",
            self.base_url, release_id
        );
        self.get_json(&url).await
    }

    /// `GET /release/?release-group={id}&inc=recordings+media` — every
    /// edition of a release group, used by `getAllReleaseDurationSequences`
    /// and the release-group variant of `forceTrackFromLockedAlbum`.
    pub async fn browse_releases_by_release_group(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<dto::Release>, EnrichmentError> {
        let url = format!(
            "{}/release/?release-group={}&fmt=json&inc=recordings+media+release-groups&limit=100",
            self.base_url, release_group_id
        );
        let response: dto::ReleaseBrowseResponse = self.get_json(&url).await?;
        Ok(response.releases)
    }

    /// `GET /release-group/?query=...`, used by `searchAlbum`.
    pub async fn search_release_groups(
        &self,
        album_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<dto::ReleaseGroupSearchResult>, EnrichmentError> {
        let mut query = format!("releasegroup:\"{}\"", escape_lucene(album_name));
        if let Some(artist) = artist_name {
            query.push_str(&format!(" AND artist:\"{}\"", escape_lucene(artist)));
        }
        let url = format!(
            "{}/release-group/?query={}&fmt=json&limit=10",
            self.base_url,
            urlencoding::encode(&query)
        );
        let response: dto::ReleaseGroupSearchResponse = self.get_json(&url).await?;
        Ok(response.release_groups)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, EnrichmentError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EnrichmentError::NoMatches);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EnrichmentError::RateLimited);
        }

        if !status.is_success() {
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(EnrichmentError::ApiError(error.error));
            }
            return Err(EnrichmentError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))
    }
}

/// Lucene's query syntax treats quotes and backslashes specially; MusicBrainz
/// search runs queries through Lucene.
fn escape_lucene(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = MusicBrainzClient::new("music-curator/0.1.0 (test@example.com)");
        assert_eq!(client.base_url, "https://musicbrainz.org/ws/2");
    }

    #[test]
    fn test_client_with_custom_url() {
        let client = MusicBrainzClient::with_base_url("test-agent", "http://localhost:8080");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_escape_lucene_quotes() {
        assert_eq!(escape_lucene(r#"Let's "Rock""#), r#"Let's \"Rock\""#);
    }
}

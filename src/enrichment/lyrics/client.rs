//! lrclib.net HTTP client
//!
//! Looks up lyrics by exact track/artist/album/duration match. lrclib prefers
//! LRC-synced lyrics over plain text when both exist for the same recording.
//!
//! API: https://lrclib.net

use super::dto;
use crate::enrichment::domain::EnrichmentError;

pub struct LyricsClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LyricsClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: "https://lrclib.net/api".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// `GET /api/get?track_name=&artist_name=&album_name=&duration=`. Returns
    /// `None` on a clean 404 miss. Prefers `syncedLyrics` over `plainLyrics`.
    pub async fn get(
        &self,
        track_name: &str,
        artist_name: &str,
        album_name: Option<&str>,
        duration_secs: Option<u32>,
    ) -> Result<Option<String>, EnrichmentError> {
        let mut url = format!(
            "{}/get?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name),
        );
        if let Some(album) = album_name {
            url.push_str(&format!("&album_name={}", urlencoding::encode(album)));
        }
        if let Some(duration) = duration_secs {
            url.push_str(&format!("&duration={duration}"));
        }

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(EnrichmentError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let parsed: dto::GetResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        if parsed.instrumental {
            return Ok(None);
        }
        Ok(parsed.synced_lyrics.or(parsed.plain_lyrics))
    }
}

impl Default for LyricsClient {
    fn default() -> Self {
        Self::new()
    }
}

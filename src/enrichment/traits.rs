//! Trait definitions for external API clients.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real client implementations, while tests
//! can substitute mock implementations.

use async_trait::async_trait;

use super::coverart::{CoverArt, CoverSize};
use super::domain::{AudioFingerprint, EnrichmentError, FingerprintLookup};
use super::musicbrainz::dto as mb_dto;

/// Trait for AcoustID fingerprint lookup.
#[async_trait]
pub trait AcoustIdApi: Send + Sync {
    async fn lookup(&self, fingerprint: &AudioFingerprint) -> Result<FingerprintLookup, EnrichmentError>;
}

/// Trait for MusicBrainz lookups. Mirrors `MusicBrainzClient`'s raw
/// operations; selection/conversion happens one layer up in `service.rs`.
#[async_trait]
pub trait MusicBrainzApi: Send + Sync {
    async fn fetch_recording(&self, recording_id: &str) -> Result<mb_dto::RecordingResponse, EnrichmentError>;
    async fn fetch_release(&self, release_id: &str) -> Result<mb_dto::Release, EnrichmentError>;
    async fn browse_releases_by_release_group(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<mb_dto::Release>, EnrichmentError>;
    async fn search_release_groups(
        &self,
        album_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<mb_dto::ReleaseGroupSearchResult>, EnrichmentError>;
}

/// Trait for Cover Art Archive lookup.
#[async_trait]
pub trait CoverArtApi: Send + Sync {
    async fn get_front_cover(&self, release_id: &str, size: CoverSize) -> Result<CoverArt, EnrichmentError>;
    async fn front_cover_url_for_release_group(&self, release_group_id: &str) -> Result<Option<String>, EnrichmentError>;
}

/// Trait for lyrics lookup.
#[async_trait]
pub trait LyricsApi: Send + Sync {
    async fn get(
        &self,
        track_name: &str,
        artist_name: &str,
        album_name: Option<&str>,
        duration_secs: Option<u32>,
    ) -> Result<Option<String>, EnrichmentError>;
}

// Implement traits for real clients

#[async_trait]
impl AcoustIdApi for super::acoustid::AcoustIdClient {
    async fn lookup(&self, fingerprint: &AudioFingerprint) -> Result<FingerprintLookup, EnrichmentError> {
        self.lookup(fingerprint).await
    }
}

#[async_trait]
impl MusicBrainzApi for super::musicbrainz::MusicBrainzClient {
    async fn fetch_recording(&self, recording_id: &str) -> Result<mb_dto::RecordingResponse, EnrichmentError> {
        self.fetch_recording(recording_id).await
    }

    async fn fetch_release(&self, release_id: &str) -> Result<mb_dto::Release, EnrichmentError> {
        self.fetch_release(release_id).await
    }

    async fn browse_releases_by_release_group(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<mb_dto::Release>, EnrichmentError> {
        self.browse_releases_by_release_group(release_group_id).await
    }

    async fn search_release_groups(
        &self,
        album_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<mb_dto::ReleaseGroupSearchResult>, EnrichmentError> {
        self.search_release_groups(album_name, artist_name).await
    }
}

#[async_trait]
impl CoverArtApi for super::coverart::CoverArtClient {
    async fn get_front_cover(&self, release_id: &str, size: CoverSize) -> Result<CoverArt, EnrichmentError> {
        self.get_front_cover(release_id, size).await
    }

    async fn front_cover_url_for_release_group(&self, release_group_id: &str) -> Result<Option<String>, EnrichmentError> {
        self.front_cover_url_for_release_group(release_group_id).await
    }
}

#[async_trait]
impl LyricsApi for super::lyrics::LyricsClient {
    async fn get(
        &self,
        track_name: &str,
        artist_name: &str,
        album_name: Option<&str>,
        duration_secs: Option<u32>,
    ) -> Result<Option<String>, EnrichmentError> {
        self.get(track_name, artist_name, album_name, duration_secs).await
    }
}

//! MetadataAdapter (C3): the single facade the rest of the pipeline talks to
//! for fingerprint lookup, recording/release resolution, cover art URLs, and
//! album search — wiring together AcoustID, MusicBrainz, Cover Art Archive,
//! and lrclib behind one rate gate and retry policy.
//!
//! A single-flight [`RateGate`] spaces every outbound call to AcoustID and
//! MusicBrainz by at least one second; the Cover Art Archive and lrclib are
//! not rate-gated (§4.4: "not the cover art host").

use crate::enrichment::acoustid::AcoustIdClient;
use crate::enrichment::coverart::{CoverArt, CoverArtClient, CoverSize};
use crate::enrichment::domain::{AudioFingerprint, EnrichmentError, FingerprintLookup};
use crate::enrichment::lyrics::LyricsClient;
use crate::enrichment::musicbrainz::{adapter as mb_adapter, MusicBrainzClient};
use crate::enrichment::quick_scanner::AlbumSearchSource;
use crate::enrichment::release_selection::{self, ReleaseCandidate};
use crate::enrichment::traits::{AcoustIdApi, CoverArtApi, LyricsApi, MusicBrainzApi};
use crate::model::{CandidateRelease, CandidateReleaseGroup, TrackMetadata};
use crate::rate_limit::{RateGate, RetryPolicy};

/// Configuration the facade needs beyond what's baked into the client
/// constructors.
pub struct EnrichmentConfig {
    pub acoustid_api_key: String,
    pub musicbrainz_user_agent: String,
}

pub struct MetadataAdapter<A = AcoustIdClient, M = MusicBrainzClient, C = CoverArtClient, L = LyricsClient>
where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    acoustid: A,
    musicbrainz: M,
    coverart: C,
    lyrics: L,
    rate_gate: RateGate,
    retry: RetryPolicy,
}

impl MetadataAdapter<AcoustIdClient, MusicBrainzClient, CoverArtClient, LyricsClient> {
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            acoustid: AcoustIdClient::new(config.acoustid_api_key.clone()),
            musicbrainz: MusicBrainzClient::new(&config.musicbrainz_user_agent),
            coverart: CoverArtClient::new(),
            lyrics: LyricsClient::new(),
            rate_gate: RateGate::metadata_service(),
            retry: RetryPolicy::metadata_service(),
        }
    }
}

impl<A, M, C, L> MetadataAdapter<A, M, C, L>
where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    #[cfg(test)]
    pub fn with_clients(acoustid: A, musicbrainz: M, coverart: C, lyrics: L) -> Self {
        Self {
            acoustid,
            musicbrainz,
            coverart,
            lyrics,
            rate_gate: RateGate::metadata_service(),
            retry: RetryPolicy::metadata_service(),
        }
    }

    async fn gated<T, Fut>(&self, op: impl Fn() -> Fut) -> Result<T, EnrichmentError>
    where
        Fut: std::future::Future<Output = Result<T, EnrichmentError>>,
    {
        self.rate_gate.acquire().await;
        self.retry
            .run(|e: &EnrichmentError| e.is_retryable_transport_error(), op)
            .await
    }

    /// `lookupByFingerprint(duration, fp) → {status, results[]}`.
    pub async fn lookup_by_fingerprint(&self, fingerprint: &AudioFingerprint) -> Result<FingerprintLookup, EnrichmentError> {
        self.gated(|| self.acoustid.lookup(fingerprint)).await
    }

    /// `getRecordingById` (§4.4): fetch the recording, select a release per
    /// §4.5, and resolve disc/track numbers (falling back to a duration
    /// match within ±2 s).
    pub async fn get_recording_by_id(
        &self,
        recording_id: &str,
        music_files_in_folder: u32,
        preferred_release_group_id: Option<&str>,
        preferred_release_id: Option<&str>,
        file_duration_sec: Option<u32>,
    ) -> Result<TrackMetadata, EnrichmentError> {
        let response = self.gated(|| self.musicbrainz.fetch_recording(recording_id)).await?;
        let candidates: Vec<ReleaseCandidate> = mb_adapter::to_release_candidates(&response);
        let chosen = release_selection::select_release(
            &candidates,
            music_files_in_folder,
            preferred_release_id,
            preferred_release_group_id,
        )
        .ok_or(EnrichmentError::NoMatches)?;

        let release = response
            .releases
            .iter()
            .find(|r| r.id == chosen.release_id)
            .ok_or(EnrichmentError::NoMatches)?;

        Ok(mb_adapter::to_track_metadata(&response, release, file_duration_sec))
    }

    /// `getAllReleaseDurationSequences(releaseGroupId)`: every edition's
    /// ordered track durations, video media skipped.
    pub async fn get_all_release_duration_sequences(
        &self,
        release_group_id: &str,
    ) -> Result<Vec<CandidateRelease>, EnrichmentError> {
        let releases = self
            .gated(|| self.musicbrainz.browse_releases_by_release_group(release_group_id))
            .await?;
        Ok(releases.iter().filter_map(mb_adapter::to_candidate_release).collect())
    }

    /// `getCoverArtUrl(releaseGroupId) → url|null`. Not rate-gated: the
    /// Cover Art Archive is a different host from the metadata service.
    pub async fn get_cover_art_url(&self, release_group_id: &str) -> Result<Option<String>, EnrichmentError> {
        self.coverart.front_cover_url_for_release_group(release_group_id).await
    }

    /// Download the embedded-quality front cover image for a release.
    pub async fn download_front_cover(&self, release_id: &str, size: CoverSize) -> Result<CoverArt, EnrichmentError> {
        self.coverart.get_front_cover(release_id, size).await
    }

    /// `searchAlbum(albumName, artistName?)` for QuickScanner.
    pub async fn search_album(
        &self,
        album_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<CandidateReleaseGroup>, EnrichmentError> {
        let results = self
            .gated(|| self.musicbrainz.search_release_groups(album_name, artist_name))
            .await?;
        Ok(results.iter().map(mb_adapter::to_candidate_release_group).collect())
    }

    /// `forceTrackFromLockedAlbum(releaseId, durationSec, ±3s)`.
    pub async fn force_track_from_locked_album(
        &self,
        release_id: &str,
        duration_sec: u32,
    ) -> Result<Option<TrackMetadata>, EnrichmentError> {
        let release = self.gated(|| self.musicbrainz.fetch_release(release_id)).await?;
        Ok(mb_adapter::force_track_metadata(&release, duration_sec, 3))
    }

    /// Release-group variant: pick the edition whose track count is closest
    /// to `music_files_in_folder`, then match within ±3 s as above.
    pub async fn force_track_from_locked_album_release_group(
        &self,
        release_group_id: &str,
        duration_sec: u32,
        music_files_in_folder: u32,
    ) -> Result<Option<TrackMetadata>, EnrichmentError> {
        let releases = self
            .gated(|| self.musicbrainz.browse_releases_by_release_group(release_group_id))
            .await?;
        let closest = releases.iter().min_by_key(|r| {
            let track_count = r.media.first().and_then(|m| m.track_count).unwrap_or(0);
            track_count.abs_diff(music_files_in_folder)
        });
        Ok(closest.and_then(|release| mb_adapter::force_track_metadata(release, duration_sec, 3)))
    }

    /// Lyrics lookup via lrclib, preferring LRC-synced text. Never fatal:
    /// callers treat `Ok(None)` and transport errors the same way (leave
    /// `TrackMetadata::lyrics` unset).
    pub async fn get_lyrics(
        &self,
        track_name: &str,
        artist_name: &str,
        album_name: Option<&str>,
        duration_secs: Option<u32>,
    ) -> Result<Option<String>, EnrichmentError> {
        self.lyrics.get(track_name, artist_name, album_name, duration_secs).await
    }
}

#[async_trait::async_trait]
impl<A, M, C, L> AlbumSearchSource for MetadataAdapter<A, M, C, L>
where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    async fn search_album(
        &self,
        album_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<CandidateReleaseGroup>, EnrichmentError> {
        MetadataAdapter::search_album(self, album_name, artist_name).await
    }

    async fn duration_sequence(&self, release_group_id: &str) -> Result<Vec<CandidateRelease>, EnrichmentError> {
        self.get_all_release_duration_sequences(release_group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::musicbrainz::dto as mb_dto;
    use crate::enrichment::traits::mocks::{MockAcoustId, MockCoverArt, MockLyricsApi, MockMusicBrainz};

    fn recording_with_release() -> mb_dto::RecordingResponse {
        mb_dto::RecordingResponse {
            id: "rec-1".to_string(),
            title: "Test Song".to_string(),
            length: Some(180_000),
            disambiguation: None,
            artist_credit: vec![],
            releases: vec![mb_dto::Release {
                id: "rel-1".to_string(),
                title: "Test Album".to_string(),
                status: Some("Official".to_string()),
                date: Some("1999-01-01".to_string()),
                country: None,
                release_group: Some(mb_dto::ReleaseGroup {
                    id: "rg-1".to_string(),
                    title: "Test Album".to_string(),
                    primary_type: Some("Album".to_string()),
                    secondary_types: vec![],
                    first_release_date: Some("1999-01-01".to_string()),
                    artist_credit: vec![],
                }),
                media: vec![mb_dto::Medium {
                    position: Some(1),
                    format: Some("CD".to_string()),
                    track_count: Some(1),
                    tracks: vec![mb_dto::Track {
                        position: Some(1),
                        number: Some("1".to_string()),
                        title: Some("Test Song".to_string()),
                        length: Some(180_000),
                        recording: Some(mb_dto::TrackRecordingRef { id: "rec-1".to_string(), video: Some(false) }),
                    }],
                }],
            }],
        }
    }

    fn adapter() -> MetadataAdapter<MockAcoustId, MockMusicBrainz, MockCoverArt, MockLyricsApi> {
        MetadataAdapter::with_clients(
            MockAcoustId::no_matches(),
            MockMusicBrainz { recording: Some(recording_with_release()), ..Default::default() },
            MockCoverArt::with_placeholder(),
            MockLyricsApi { lyrics: None },
        )
    }

    #[tokio::test]
    async fn get_recording_by_id_resolves_disc_and_track() {
        let adapter = adapter();
        let metadata = adapter.get_recording_by_id("rec-1", 1, None, None, None).await.unwrap();
        assert_eq!(metadata.album.as_deref(), Some("Test Album"));
        assert_eq!(metadata.track_no, Some(1));
    }

    #[tokio::test]
    async fn get_cover_art_url_delegates_to_coverart_client() {
        let adapter = adapter();
        let url = adapter.get_cover_art_url("rg-1").await.unwrap();
        assert!(url.unwrap().contains("rg-1"));
    }

    #[tokio::test]
    async fn lookup_by_fingerprint_returns_empty_on_no_matches() {
        let adapter = adapter();
        let fp = AudioFingerprint { fingerprint: "abc".to_string(), duration_secs: 180 };
        let lookup = adapter.lookup_by_fingerprint(&fp).await.unwrap();
        assert!(lookup.results.is_empty());
    }
}

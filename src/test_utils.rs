//! Shared test fixtures: a file-backed `ProcessedStore` plus a mock
//! `TrackMetadata` builder, so individual test modules don't each reinvent
//! them.

use tempfile::TempDir;

use crate::db::FileProcessedStore;
use crate::model::{ProcessedRecord, TrackMetadata};

/// A `FileProcessedStore` backed by a fresh temp directory. Keep the
/// `TempDir` alive for the duration of the test.
pub fn temp_store() -> (FileProcessedStore, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp directory");
    let store = FileProcessedStore::new(dir.path().join("processed.log"));
    (store, dir)
}

/// A `TrackMetadata` with sensible defaults, customizable via struct update
/// syntax.
pub fn mock_track_metadata() -> TrackMetadata {
    TrackMetadata {
        recording_id: Some("test-recording-id".to_string()),
        title: Some("Test Track".to_string()),
        artist: Some("Test Artist".to_string()),
        album_artist: Some("Test Artist".to_string()),
        album: Some("Test Album".to_string()),
        release_group_id: Some("test-release-group-id".to_string()),
        release_id: Some("test-release-id".to_string()),
        release_date: Some("2023-01-01".to_string()),
        track_count: Some(10),
        disc_no: Some(1),
        track_no: Some(1),
        genres: vec!["Rock".to_string()],
        composer: None,
        lyricist: None,
        lyrics: None,
        cover_art_url: None,
        score: 1.0,
    }
}

/// A `ProcessedRecord` for `path`, otherwise filled with sensible defaults.
pub fn mock_processed_record(path: &str) -> ProcessedRecord {
    ProcessedRecord {
        absolute_path: path.to_string(),
        file_hash: "0123456789abcdef0123456789abcdef".to_string(),
        file_name: std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: 1024,
        processed_time: "2026-01-01T00:00:00Z".to_string(),
        recording_id: Some("test-recording-id".to_string()),
        artist: Some("Test Artist".to_string()),
        title: Some("Test Track".to_string()),
        album: Some("Test Album".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProcessedStore;

    #[tokio::test]
    async fn temp_store_starts_empty() {
        let (store, _dir) = temp_store();
        assert!(!store.is_processed("/music/song.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn mock_processed_record_roundtrips_through_store() {
        let (store, _dir) = temp_store();
        let record = mock_processed_record("/music/song.mp3");
        store.mark_processed(record).await.unwrap();
        assert!(store.is_processed("/music/song.mp3").await.unwrap());
    }

    #[test]
    fn mock_track_metadata_has_expected_defaults() {
        let meta = mock_track_metadata();
        assert_eq!(meta.title.as_deref(), Some("Test Track"));
        assert_eq!(meta.artist.as_deref(), Some("Test Artist"));
        assert_eq!(meta.album.as_deref(), Some("Test Album"));
    }
}

//! BatchWriter (C11, §4.11/§4.12): drains a folder's pending-file queue once
//! an album lock is available, overlaying the locked album's fields and a
//! single shared cover onto every track before moving it to its output path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::config::Config;
use crate::cover::CoverArtResolver;
use crate::db::{hash_file, ProcessedStore, RECORDING_ID_WRITE_FAILED};
use crate::library::album_cache::FolderAlbumCache;
use crate::metadata::{self, WriteOptions};
use crate::model::{count_distinct_artists, CachedAlbumInfo, PendingFile, ProcessedRecord, TrackMetadata};

const SANITIZE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Strip filesystem-hostile characters and normalize the `<INST>` marker
/// (§4.12).
pub fn sanitize(name: &str) -> String {
    name.replace("<INST>", "[INST]").chars().filter(|c| !SANITIZE_CHARS.contains(c)).collect()
}

/// `"D.TT "` when both disc and track are known, `"TT. "` when only track is
/// known, empty otherwise.
fn filename_prefix(disc_no: Option<u32>, track_no: Option<u32>) -> String {
    match (disc_no, track_no) {
        (Some(d), Some(t)) => format!("{d}.{t:02} "),
        (None, Some(t)) => format!("{t}. "),
        _ => String::new(),
    }
}

/// `outputRoot/sanitize(albumArtist)/sanitize(album)/<prefix><artist> - <title>.<ext>`.
/// Missing album artist falls back to artist; missing artist flattens
/// straight into the output root.
pub fn output_path(output_root: &Path, metadata: &TrackMetadata, ext: &str) -> PathBuf {
    let title = metadata.title.as_deref().unwrap_or("Unknown Title");
    let artist = metadata.artist.as_deref().unwrap_or_default();

    if artist.is_empty() {
        return output_root.join(format!("{}.{ext}", sanitize(title)));
    }

    let album_artist = metadata.album_artist.as_deref().filter(|s| !s.is_empty()).unwrap_or(artist);
    let filename = format!("{}{artist} - {title}.{ext}", filename_prefix(metadata.disc_no, metadata.track_no));

    let mut path = output_root.join(sanitize(album_artist));
    if let Some(album) = metadata.album.as_deref().filter(|s| !s.is_empty()) {
        path = path.join(sanitize(album));
    }
    path.join(sanitize(&filename))
}

pub struct BatchWriter {
    config: Arc<Config>,
    store: Arc<dyn ProcessedStore>,
    cover_resolver: Arc<CoverArtResolver>,
    album_cache: Arc<FolderAlbumCache>,
}

impl BatchWriter {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn ProcessedStore>,
        cover_resolver: Arc<CoverArtResolver>,
        album_cache: Arc<FolderAlbumCache>,
    ) -> Self {
        Self { config, store, cover_resolver, album_cache }
    }

    /// `processPendingFilesWithAlbum(folder, lockedAlbum)`.
    pub async fn process_pending_files_with_album(&self, folder: &Path, locked_album: &CachedAlbumInfo) {
        let album_cover =
            self.cover_resolver.get_cover_art_by_release_group_id(&locked_album.release_group_id, folder).await;
        let files = self.album_cache.take_pending_files(folder);
        let contributor_count = count_distinct_artists(files.iter().filter_map(|f| f.track_metadata.artist.as_deref()));
        for file in files {
            let cover = album_cover.as_ref().map(|c| (c.data.as_slice(), c.mime_type.as_str()));
            self.write_one(&file, Some(locked_album), cover, contributor_count).await;
        }
    }

    /// `processAllPendingBeforeShutdown`: drain every given folder's pending
    /// queue, preferring a lock, then the first pending file's metadata as a
    /// low-confidence guess, then each file's own metadata.
    pub async fn process_all_pending_before_shutdown(&self, folders: &[PathBuf]) {
        for folder in folders {
            if let Some(lock) = self.album_cache.get_lock(folder) {
                self.process_pending_files_with_album(folder, &lock).await;
                continue;
            }

            let files = self.album_cache.take_pending_files(folder);
            let Some(guess) = files.first().map(|f| f.track_metadata.clone()) else {
                continue;
            };
            let contributor_count = count_distinct_artists(files.iter().filter_map(|f| f.track_metadata.artist.as_deref()));
            for file in &files {
                let merged = file.track_metadata.clone().merge(&guess);
                let cover = file.cover_art_bytes.as_deref().map(|d| (d, "image/jpeg"));
                let merged_file = PendingFile { track_metadata: merged, ..file.clone() };
                self.write_one(&merged_file, None, cover, contributor_count).await;
            }
        }
    }

    async fn write_one(
        &self,
        file: &PendingFile,
        locked_album: Option<&CachedAlbumInfo>,
        cover: Option<(&[u8], &str)>,
        contributor_count: usize,
    ) {
        let mut metadata = file.track_metadata.clone();
        if let Some(lock) = locked_album {
            metadata.album = Some(lock.album_title.clone());
            metadata.album_artist = Some(lock.album_artist.clone());
            metadata.release_group_id = Some(lock.release_group_id.clone());
            if metadata.release_date.is_none() {
                metadata.release_date = lock.release_date.clone();
            }
        }
        metadata.album_artist = Some(metadata.normalized_album_artist(contributor_count));

        let (cover_bytes, cover_mime) = match cover {
            Some((data, mime)) => (Some(data), mime),
            None => (file.cover_art_bytes.as_deref(), "image/jpeg"),
        };

        let options = WriteOptions { only_fill_empty: false, write_musicbrainz_ids: true };
        let written = metadata::write(&file.absolute_path, &metadata, cover_bytes, cover_mime, &options).is_ok();
        let moved = written.then(|| self.move_to_output(&file.absolute_path, &metadata)).flatten();

        let record = ProcessedRecord {
            absolute_path: file.absolute_path.to_string_lossy().into_owned(),
            file_hash: hash_file(&file.absolute_path).unwrap_or_default(),
            file_name: file.absolute_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            file_size: std::fs::metadata(&file.absolute_path).map(|m| m.len()).unwrap_or(0),
            processed_time: Utc::now().to_rfc3339(),
            recording_id: if moved.is_some() { metadata.recording_id.clone() } else { Some(RECORDING_ID_WRITE_FAILED.to_string()) },
            artist: metadata.artist.clone(),
            title: metadata.title.clone(),
            album: metadata.album.clone(),
        };
        let _ = self.store.mark_processed(record).await;
    }

    fn move_to_output(&self, source: &Path, metadata: &TrackMetadata) -> Option<PathBuf> {
        let output_root = self.config.monitor.output_directory.as_ref()?;
        let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("mp3");
        let dest = output_path(output_root, metadata, ext);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        std::fs::rename(source, &dest).ok()?;
        Some(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_hostile_characters_and_normalizes_inst_marker() {
        assert_eq!(sanitize("AC/DC: \"Back\" <INST>"), "ACDC Back [INST]");
    }

    #[test]
    fn output_path_uses_disc_track_prefix_when_both_known() {
        let metadata = TrackMetadata {
            artist: Some("The Beatles".to_string()),
            album_artist: Some("The Beatles".to_string()),
            album: Some("Abbey Road".to_string()),
            title: Some("Come Together".to_string()),
            disc_no: Some(1),
            track_no: Some(5),
            ..Default::default()
        };
        let path = output_path(Path::new("/library"), &metadata, "flac");
        assert_eq!(path, Path::new("/library/The Beatles/Abbey Road/1.05 The Beatles - Come Together.flac"));
    }

    #[test]
    fn output_path_uses_track_only_prefix_when_disc_unknown() {
        let metadata = TrackMetadata {
            artist: Some("Daft Punk".to_string()),
            title: Some("One More Time".to_string()),
            track_no: Some(3),
            ..Default::default()
        };
        let path = output_path(Path::new("/library"), &metadata, "mp3");
        assert_eq!(path, Path::new("/library/Daft Punk/3. Daft Punk - One More Time.mp3"));
    }

    #[test]
    fn output_path_falls_back_to_artist_when_album_artist_missing() {
        let metadata = TrackMetadata {
            artist: Some("Radiohead".to_string()),
            album: Some("OK Computer".to_string()),
            title: Some("Airbag".to_string()),
            ..Default::default()
        };
        let path = output_path(Path::new("/library"), &metadata, "mp3");
        assert_eq!(path, Path::new("/library/Radiohead/OK Computer/Radiohead - Airbag.mp3"));
    }

    #[test]
    fn output_path_flattens_when_artist_missing() {
        let metadata = TrackMetadata { title: Some("Untitled".to_string()), ..Default::default() };
        let path = output_path(Path::new("/library"), &metadata, "mp3");
        assert_eq!(path, Path::new("/library/Untitled.mp3"));
    }
}

//! AudioFileProcessor (C10, §4.10): the single-writer, 12-step pipeline that
//! turns one dispatched file into a `ProcessResult`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::config::Config;
use crate::cover::CoverArtResolver;
use crate::db::{hash_file, ProcessedStore, RECORDING_ID_WRITE_FAILED};
use crate::enrichment::acoustid::AcoustIdClient;
use crate::enrichment::coverart::CoverArtClient;
use crate::enrichment::duration_matcher;
use crate::enrichment::fingerprint;
use crate::enrichment::lyrics::LyricsClient;
use crate::enrichment::musicbrainz::MusicBrainzClient;
use crate::enrichment::quick_scanner;
use crate::enrichment::traits::{AcoustIdApi, CoverArtApi, LyricsApi, MusicBrainzApi};
use crate::enrichment::MetadataAdapter;
use crate::library::album_cache::FolderAlbumCache;
use crate::library::batch_writer::{self, BatchWriter};
use crate::library::failed_handler::FailedFileHandler;
use crate::metadata::{self, WriteOptions};
use crate::model::{
    AlbumIdentificationInfo, CacheSource, CachedAlbumInfo, PendingFile, ProcessResult, ProcessedRecord, TrackMetadata,
};

/// `QuickScanner`'s own acceptance threshold (§4.10 step 5).
const QUICK_SCAN_MIN_SIMILARITY: f64 = 0.90;

fn list_music_files(folder: &Path) -> Vec<PathBuf> {
    const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a"];
    let Ok(entries) = std::fs::read_dir(folder) else { return Vec::new() };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// The "album root" is the first path component under the monitor root.
fn album_root(monitor_root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(monitor_root).ok().and_then(|rel| rel.components().next()) {
        Some(first) => monitor_root.join(first.as_os_str()),
        None => monitor_root.to_path_buf(),
    }
}

pub struct AudioFileProcessor<A = AcoustIdClient, M = MusicBrainzClient, C = CoverArtClient, L = LyricsClient>
where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    config: Arc<Config>,
    store: Arc<dyn ProcessedStore>,
    metadata_adapter: Arc<MetadataAdapter<A, M, C, L>>,
    album_cache: Arc<FolderAlbumCache>,
    cover_resolver: Arc<CoverArtResolver>,
    batch_writer: Arc<BatchWriter>,
    failed_handler: Arc<FailedFileHandler>,
}

impl<A, M, C, L> AudioFileProcessor<A, M, C, L>
where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn ProcessedStore>,
        metadata_adapter: Arc<MetadataAdapter<A, M, C, L>>,
        album_cache: Arc<FolderAlbumCache>,
        cover_resolver: Arc<CoverArtResolver>,
        batch_writer: Arc<BatchWriter>,
        failed_handler: Arc<FailedFileHandler>,
    ) -> Self {
        Self { config, store, metadata_adapter, album_cache, cover_resolver, batch_writer, failed_handler }
    }

    /// The processed-file store, for callers (e.g. the backlog scanner) that
    /// need to skip already-handled files without going through `process`.
    pub fn store(&self) -> &Arc<dyn ProcessedStore> {
        &self.store
    }

    /// Run the full pipeline for one dispatched file.
    pub async fn process(&self, path: &Path) -> ProcessResult {
        let absolute_path = path.to_string_lossy().into_owned();

        // Step 1: already-processed short-circuit.
        match self.store.is_processed(&absolute_path).await {
            Ok(true) => return ProcessResult::Success,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(path = %absolute_path, error = %e, "processed-store unavailable");
                return ProcessResult::NetworkErrorRetry;
            }
        }

        let folder = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

        // Step 2: temp-file gate.
        if self.folder_has_temp_file(&folder) {
            return ProcessResult::DelayRetry;
        }

        let Some(monitor_root) = self.config.monitor.directory.clone() else {
            return ProcessResult::PermanentFail;
        };

        // Step 3: album root + loose detection.
        let is_loose_file = folder == monitor_root;
        let root = album_root(&monitor_root, path);
        let music_files_in_folder = list_music_files(&folder).len() as u32;

        // Step 4: lock lookup.
        let mut lock = if is_loose_file { None } else { self.album_cache.get_lock(&folder) };

        // Step 5: QuickScanner.
        if lock.is_none() && !is_loose_file {
            lock = self.try_quick_scan(&folder).await;
        }

        // Step 6: fingerprint identification (always runs).
        let fp_path = path.to_path_buf();
        let fp = tokio::task::spawn_blocking(move || fingerprint::generate(&fp_path)).await.ok().and_then(|r| r.ok());

        let lookup = match &fp {
            Some(fp) => match self.metadata_adapter.lookup_by_fingerprint(fp).await {
                Ok(lookup) => lookup,
                Err(e) if e.is_retryable_transport_error() => return ProcessResult::NetworkErrorRetry,
                Err(_) => Default::default(),
            },
            None => Default::default(),
        };
        let recordings: Vec<_> = lookup.results.iter().flat_map(|m| m.recordings.iter()).collect();

        if recordings.is_empty() && lock.is_none() {
            if self.has_partial_recognition_signal(path) {
                self.failed_handler.copy_partial_recognition(path, &monitor_root).await;
            } else if is_loose_file {
                self.failed_handler.quarantine_loose_file(path).await;
            } else {
                self.failed_handler.quarantine_album_root(&root).await;
            }
            return ProcessResult::PermanentFail;
        }

        // Step 7: first-file immediate lock attempt.
        if lock.is_none() {
            let mut candidate_rgs: Vec<String> = Vec::new();
            for recording in &recordings {
                for rg in &recording.release_groups {
                    if !candidate_rgs.contains(&rg.release_group_id) {
                        candidate_rgs.push(rg.release_group_id.clone());
                    }
                }
            }
            let mut candidate_releases = Vec::new();
            for rg in &candidate_rgs {
                if let Ok(releases) = self.metadata_adapter.get_all_release_duration_sequences(rg).await {
                    candidate_releases.extend(releases);
                }
            }
            let folder_durations = self.folder_durations(&folder).await;
            let folder_name = folder.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if let Some(best) = duration_matcher::select(&folder_durations, folder_name, &candidate_releases) {
                lock = Some(self.album_cache.determine_album_with_duration_sequence(
                    &folder,
                    best.candidate.clone(),
                    best.similarity,
                ));
            }
        }

        // Step 8: best-recording selection.
        let locked_rg = lock.as_ref().map(|l| l.release_group_id.clone());
        let best_recording = recordings
            .iter()
            .find(|r| locked_rg.as_deref().is_some_and(|rg| r.release_groups.iter().any(|c| c.release_group_id == rg)))
            .or_else(|| recordings.first())
            .copied();

        let file_duration_sec = fp.as_ref().map(|f| f.duration_secs);

        // Step 9: detailed metadata fetch.
        let mut track_metadata = match best_recording {
            Some(recording) => {
                match self
                    .metadata_adapter
                    .get_recording_by_id(
                        &recording.id,
                        music_files_in_folder,
                        locked_rg.as_deref(),
                        lock.as_ref().and_then(|l| l.release_id.as_deref()),
                        file_duration_sec,
                    )
                    .await
                {
                    Ok(metadata) => self.reconcile_with_lock(metadata, &lock, file_duration_sec, music_files_in_folder).await,
                    Err(e) if e.is_retryable_transport_error() => return ProcessResult::NetworkErrorRetry,
                    Err(_) => TrackMetadata::default(),
                }
            }
            None => TrackMetadata::default(),
        };

        // Step 10: merge with existing source tags.
        let source_tags_path = path.to_path_buf();
        if let Ok(Some(tags)) = tokio::task::spawn_blocking(move || metadata::read(&source_tags_path).ok()).await {
            let source_side = TrackMetadata {
                title: tags.title,
                artist: tags.artist,
                album_artist: tags.album_artist,
                album: tags.album,
                genres: tags.genre.into_iter().collect(),
                composer: tags.composer,
                lyricist: tags.lyricist,
                lyrics: tags.lyrics,
                ..Default::default()
            };
            track_metadata = track_metadata.merge(&source_side);
        }

        // Step 11: cover art + lyrics.
        let cover = self
            .cover_resolver
            .resolve(&folder, path, is_loose_file, locked_rg.as_deref(), track_metadata.cover_art_url.as_deref())
            .await;

        if let (Some(title), Some(artist)) = (track_metadata.title.clone(), track_metadata.artist.clone()) {
            if let Ok(Some(lyrics)) = self
                .metadata_adapter
                .get_lyrics(&title, &artist, track_metadata.album.as_deref(), file_duration_sec)
                .await
            {
                track_metadata.lyrics = Some(lyrics);
            }
        }

        // Step 12: write path.
        let cover_mime = cover.as_ref().map(|c| c.mime_type.clone()).unwrap_or_else(|| "image/jpeg".to_string());
        let cover_bytes = cover.map(|c| c.data);

        if is_loose_file {
            return self.write_directly(path, &track_metadata, cover_bytes.as_deref(), &cover_mime).await;
        }

        if let Some(locked) = &lock {
            if let Some(observed_rg) = &track_metadata.release_group_id {
                self.album_cache.record_mismatch(&folder, observed_rg);
            }
            let mut overlaid = track_metadata.clone();
            overlaid.album = Some(locked.album_title.clone());
            overlaid.album_artist = Some(locked.album_artist.clone());
            overlaid.release_group_id = Some(locked.release_group_id.clone());
            return self.write_directly(path, &overlaid, cover_bytes.as_deref(), &cover_mime).await;
        }

        let pending = PendingFile {
            absolute_path: path.to_path_buf(),
            track_metadata: track_metadata.clone(),
            cover_art_bytes: cover_bytes,
            enqueue_timestamp: Instant::now(),
        };
        self.album_cache.add_pending_file_if_absent(&folder, pending);

        let info = AlbumIdentificationInfo {
            release_group_id: track_metadata.release_group_id.clone(),
            title: track_metadata.album.clone(),
            album_artist: track_metadata.album_artist.clone(),
            track_count: track_metadata.track_count,
            release_date: track_metadata.release_date.clone(),
            alternatives: best_recording.map(|r| r.release_groups.clone()).unwrap_or_default(),
        };

        let folder_durations = self.folder_durations(&folder).await;
        let folder_name = folder.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let new_lock = self
            .album_cache
            .add_sample(
                &folder,
                path.to_path_buf(),
                info,
                music_files_in_folder,
                self.metadata_adapter.as_ref(),
                &folder_durations,
                folder_name,
            )
            .await;

        if let Some(locked) = new_lock {
            self.batch_writer.process_pending_files_with_album(&folder, &locked).await;
        } else if self.album_cache.pending_len(&folder) >= music_files_in_folder.max(1) as usize {
            self.batch_writer.process_all_pending_before_shutdown(&[folder.clone()]).await;
        }

        ProcessResult::Success
    }

    /// Called by the retry worker once a file has exhausted `maxRetries`
    /// (§4.1): quarantine it the same way an unidentifiable file would be.
    pub async fn quarantine_after_max_retries(&self, path: &Path) {
        let folder = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let is_loose_file = self.config.monitor.directory.as_deref() == Some(folder.as_path());
        if is_loose_file {
            self.failed_handler.quarantine_loose_file(path).await;
        } else if let Some(monitor_root) = &self.config.monitor.directory {
            self.failed_handler.quarantine_album_root(&album_root(monitor_root, path)).await;
        }
    }

    async fn try_quick_scan(&self, folder: &Path) -> Option<CachedAlbumInfo> {
        let folder_name = folder.file_name().and_then(|n| n.to_str())?;
        let durations = self.folder_durations(folder).await;
        let result = quick_scanner::scan(self.metadata_adapter.as_ref(), folder_name, &durations).await?;
        if result.similarity < QUICK_SCAN_MIN_SIMILARITY {
            return None;
        }
        let candidate = CachedAlbumInfo {
            release_group_id: result.release.release_group_id.clone(),
            release_id: Some(result.release.release_id.clone()),
            album_title: result.release.title.clone(),
            album_artist: result.release.album_artist.clone(),
            track_count: Some(result.release.durations.len() as u32),
            release_date: None,
            confidence: result.similarity,
            source: CacheSource::QuickScan,
            mismatch_count: 0,
        };
        Some(self.album_cache.set_folder_album(folder, candidate))
    }

    /// If `metadata` resolved to a different release-group than the lock,
    /// try to force a track from the locked album instead (§4.10 step 9).
    async fn reconcile_with_lock(
        &self,
        metadata: TrackMetadata,
        lock: &Option<CachedAlbumInfo>,
        file_duration_sec: Option<u32>,
        music_files_in_folder: u32,
    ) -> TrackMetadata {
        let Some(locked) = lock else { return metadata };
        if metadata.release_group_id.as_deref() == Some(locked.release_group_id.as_str()) {
            return metadata;
        }
        let duration = file_duration_sec.unwrap_or(0);
        let forced = match &locked.release_id {
            Some(release_id) => self.metadata_adapter.force_track_from_locked_album(release_id, duration).await,
            None => {
                self.metadata_adapter
                    .force_track_from_locked_album_release_group(&locked.release_group_id, duration, music_files_in_folder)
                    .await
            }
        };
        forced.ok().flatten().unwrap_or(metadata)
    }

    /// Fingerprinting failed, but the file isn't a total loss: useful source
    /// tags (title/artist) or a sidecar cover image are worth preserving in
    /// the partial-recognition tree rather than a blind quarantine copy.
    fn has_partial_recognition_signal(&self, path: &Path) -> bool {
        let has_useful_tags =
            metadata::read(path).map(|tags| tags.title.is_some() || tags.artist.is_some()).unwrap_or(false);
        has_useful_tags || crate::cover::find_sidecar_cover(path).is_some()
    }

    fn folder_has_temp_file(&self, folder: &Path) -> bool {
        let Ok(entries) = std::fs::read_dir(folder) else { return false };
        entries.filter_map(|e| e.ok()).any(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            self.config.monitor.temp_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
        })
    }

    async fn folder_durations(&self, folder: &Path) -> Vec<u32> {
        let folder = folder.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let paths = list_music_files(&folder);
            fingerprint::batch_durations(&paths).into_iter().flatten().collect()
        })
        .await
        .unwrap_or_default()
    }

    async fn write_directly(&self, path: &Path, metadata: &TrackMetadata, cover: Option<&[u8]>, cover_mime: &str) -> ProcessResult {
        // A single file has no siblings to compare against, so the only
        // contributor-count signal available is the raw string itself.
        let mut metadata = metadata.clone();
        metadata.album_artist = Some(metadata.normalized_album_artist(1));
        let metadata = &metadata;

        let options = WriteOptions { only_fill_empty: false, write_musicbrainz_ids: true };
        let path_buf = path.to_path_buf();
        let metadata_owned = metadata.clone();
        let cover_owned = cover.map(|c| c.to_vec());
        let cover_mime_owned = cover_mime.to_string();
        let written = tokio::task::spawn_blocking(move || {
            metadata::write(&path_buf, &metadata_owned, cover_owned.as_deref(), &cover_mime_owned, &options).is_ok()
        })
        .await
        .unwrap_or(false);

        let file_hash = hash_file(path).unwrap_or_default();
        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        let moved_path = if written {
            let output_root = self.config.monitor.output_directory.clone();
            match output_root {
                Some(root) => {
                    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("mp3");
                    let dest = batch_writer::output_path(&root, metadata, ext);
                    if let Some(parent) = dest.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    std::fs::rename(path, &dest).ok()
                }
                None => None,
            }
        } else {
            None
        };

        let record = ProcessedRecord {
            absolute_path: path.to_string_lossy().into_owned(),
            file_hash,
            file_name,
            file_size,
            processed_time: Utc::now().to_rfc3339(),
            recording_id: if moved_path.is_some() { metadata.recording_id.clone() } else { Some(RECORDING_ID_WRITE_FAILED.to_string()) },
            artist: metadata.artist.clone(),
            title: metadata.title.clone(),
            album: metadata.album.clone(),
        };

        match self.store.mark_processed(record).await {
            Ok(_) if moved_path.is_some() => ProcessResult::Success,
            Ok(_) => ProcessResult::PermanentFail,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not record processed file");
                ProcessResult::NetworkErrorRetry
            }
        }
    }
}

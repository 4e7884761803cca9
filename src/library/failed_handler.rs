//! FailedFileHandler (C12, §4.13): quarantine for files that could not be
//! identified, and best-effort copies for files that were only partially
//! recognized.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use walkdir::WalkDir;

use crate::config::Config;
use crate::cover::CoverArtResolver;
use crate::db::{hash_file, ProcessedStore, RECORDING_ID_UNKNOWN};
use crate::metadata::{self, WriteOptions};
use crate::model::{ProcessedRecord, TrackMetadata};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a"];

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub struct FailedFileHandler {
    config: Arc<Config>,
    store: Arc<dyn ProcessedStore>,
    cover_resolver: Arc<CoverArtResolver>,
}

impl FailedFileHandler {
    pub fn new(config: Arc<Config>, store: Arc<dyn ProcessedStore>, cover_resolver: Arc<CoverArtResolver>) -> Self {
        Self { config, store, cover_resolver }
    }

    /// A loose file (directly under the monitor root) that could not be
    /// identified: copy to `failedRoot/filename`, appending a timestamp on a
    /// name collision, and mark it processed as `UNKNOWN` so it is never
    /// retried.
    pub async fn quarantine_loose_file(&self, path: &Path) {
        let Some(failed_root) = self.config.file.failed_directory.clone() else {
            tracing::warn!(path = %path.display(), "no file.failedDirectory configured, leaving loose file in place");
            return;
        };

        if std::fs::create_dir_all(&failed_root).is_ok() {
            let dest = self.unique_destination(&failed_root, path);
            let _ = std::fs::copy(path, &dest);
        }

        self.mark_processed_unknown(path).await;
    }

    /// An album-root file that could not be identified: recursively copy the
    /// whole album root into `failedRoot/<albumRootName>/…`, then mark every
    /// audio file under that root as processed to stop retrying siblings.
    pub async fn quarantine_album_root(&self, album_root: &Path) {
        let Some(failed_root) = self.config.file.failed_directory.clone() else {
            tracing::warn!(root = %album_root.display(), "no file.failedDirectory configured, leaving album in place");
            return;
        };
        let Some(root_name) = album_root.file_name() else { return };
        let destination_root = failed_root.join(root_name);

        for entry in WalkDir::new(album_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(album_root) else { continue };
            let dest = destination_root.join(relative);
            if let Some(parent) = dest.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = std::fs::copy(entry.path(), &dest);
        }

        for entry in WalkDir::new(album_root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_audio_file(entry.path()) {
                self.mark_processed_unknown(entry.path()).await;
            }
        }
    }

    /// Fingerprint failed but the file carries useful tags or a sidecar
    /// cover exists: copy into `partialRoot/<relative-path>`, embedding the
    /// folder cover if the source itself lacks embedded artwork, then mark
    /// processed so it is never retried (it's a terminal diversion, same as
    /// quarantine).
    pub async fn copy_partial_recognition(&self, path: &Path, monitor_root: &Path) {
        let Some(partial_root) = self.config.file.partial_directory.clone() else {
            tracing::warn!(path = %path.display(), "no file.partialDirectory configured, skipping partial copy");
            self.mark_processed_unknown(path).await;
            return;
        };
        let relative = path.strip_prefix(monitor_root).unwrap_or(path);
        let dest = partial_root.join(relative);

        let copied = match dest.parent() {
            Some(parent) => std::fs::create_dir_all(parent).is_ok() && std::fs::copy(path, &dest).is_ok(),
            None => false,
        };

        if copied {
            let source_tags = metadata::read(path).ok();
            let already_has_cover = source_tags.is_some() && crate::cover::extract_embedded_cover(path).is_some();
            if !already_has_cover {
                let folder = path.parent().unwrap_or(monitor_root);
                if let Some(cover) = self.cover_resolver.resolve(folder, path, true, None, None).await {
                    let metadata = TrackMetadata::default();
                    let _ = metadata::write(&dest, &metadata, Some(&cover.data), &cover.mime_type, &WriteOptions::default());
                }
            }
        }

        self.mark_processed_unknown(path).await;
    }

    fn unique_destination(&self, failed_root: &Path, source: &Path) -> PathBuf {
        let file_name = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let candidate = failed_root.join(&file_name);
        if !candidate.exists() {
            return candidate;
        }
        let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = source.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S");
        failed_root.join(format!("{stem}-{timestamp}.{ext}"))
    }

    async fn mark_processed_unknown(&self, path: &Path) {
        let record = ProcessedRecord {
            absolute_path: path.to_string_lossy().into_owned(),
            file_hash: hash_file(path).unwrap_or_default(),
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            file_size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            processed_time: Utc::now().to_rfc3339(),
            recording_id: Some(RECORDING_ID_UNKNOWN.to_string()),
            artist: None,
            title: None,
            album: None,
        };
        let _ = self.store.mark_processed(record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FileProcessedStore;
    use tempfile::TempDir;

    fn handler(temp: &TempDir) -> FailedFileHandler {
        let mut config = Config::default();
        config.file.failed_directory = Some(temp.path().join("failed"));
        config.file.partial_directory = Some(temp.path().join("partial"));
        let store: Arc<dyn ProcessedStore> = Arc::new(FileProcessedStore::new(temp.path().join("processed.log")));
        let resolver = Arc::new(CoverArtResolver::new(temp.path().join("cache")));
        FailedFileHandler::new(Arc::new(config), store, resolver)
    }

    #[tokio::test]
    async fn quarantine_loose_file_copies_and_marks_unknown() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("track.mp3");
        std::fs::write(&source, b"fake audio").unwrap();

        let handler = handler(&temp);
        handler.quarantine_loose_file(&source).await;

        assert!(temp.path().join("failed").join("track.mp3").exists());
        assert!(handler.store.is_processed(&source.to_string_lossy()).await.unwrap());
    }

    #[tokio::test]
    async fn quarantine_album_root_copies_whole_tree_and_marks_every_audio_file() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("incoming").join("Some Album");
        std::fs::create_dir_all(&album).unwrap();
        std::fs::write(album.join("01.mp3"), b"one").unwrap();
        std::fs::write(album.join("02.mp3"), b"two").unwrap();
        std::fs::write(album.join("cover.jpg"), b"cover").unwrap();

        let handler = handler(&temp);
        handler.quarantine_album_root(&album).await;

        let dest = temp.path().join("failed").join("Some Album");
        assert!(dest.join("01.mp3").exists());
        assert!(dest.join("02.mp3").exists());
        assert!(dest.join("cover.jpg").exists());
        assert!(handler.store.is_processed(&album.join("01.mp3").to_string_lossy()).await.unwrap());
        assert!(handler.store.is_processed(&album.join("02.mp3").to_string_lossy()).await.unwrap());
    }

    #[tokio::test]
    async fn copy_partial_recognition_copies_and_marks_processed() {
        let temp = TempDir::new().unwrap();
        let monitor_root = temp.path().join("incoming");
        let source = monitor_root.join("Some Album").join("track.mp3");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, b"fake audio").unwrap();

        let handler = handler(&temp);
        handler.copy_partial_recognition(&source, &monitor_root).await;

        assert!(temp.path().join("partial").join("Some Album").join("track.mp3").exists());
        assert!(handler.store.is_processed(&source.to_string_lossy()).await.unwrap());
    }
}

//! File system watcher for detecting music library changes.
//!
//! Uses the `notify` crate to watch directories for changes and emit events
//! when audio files are added, modified, or removed.
//!
//! # Design
//!
//! - **Debounced events**: Multiple rapid changes coalesce into single events
//! - **Audio files only**: Filters for supported extensions (mp3, flac, etc.)
//! - **Non-blocking**: Runs on a dedicated thread, sends events via channel
//! - **Graceful shutdown**: Stop watching via the returned handle
//!
//! # Usage
//!
//! ```rust,ignore
//! let (watcher, rx) = FileWatcher::new(vec!["/music".into()])?;
//!
//! // In another task/thread:
//! while let Ok(event) = rx.recv() {
//!     match event {
//!         WatchEvent::Created(path) => println!("New file: {:?}", path),
//!         WatchEvent::Modified(path) => println!("Changed: {:?}", path),
//!         WatchEvent::Removed(path) => println!("Deleted: {:?}", path),
//!     }
//! }
//!
//! // To stop watching:
//! drop(watcher);
//! ```

use crossbeam_channel::{Receiver, Sender, bounded};
use notify::{
    RecommendedWatcher, RecursiveMode,
    event::{CreateKind, ModifyKind, RemoveKind},
};
use notify_debouncer_full::{DebounceEventResult, Debouncer, FileIdMap, new_debouncer};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Events emitted by the file watcher.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A new audio file was created
    Created(PathBuf),
    /// An existing audio file was modified
    Modified(PathBuf),
    /// An audio file was removed
    Removed(PathBuf),
    /// A directory was created (may contain audio files)
    DirCreated(PathBuf),
    /// An error occurred while watching
    Error(String),
}

/// Handle to a running file watcher.
///
/// Dropping this handle will stop the watcher.
pub struct FileWatcher {
    _debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
    running: Arc<AtomicBool>,
}

impl FileWatcher {
    /// Create a new file watcher for the given directories.
    ///
    /// Returns the watcher handle and a receiver for watch events.
    pub fn new(watch_paths: Vec<PathBuf>) -> Result<(Self, Receiver<WatchEvent>), WatchError> {
        let (tx, rx) = bounded(256);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        // Create debouncer with 500ms timeout
        let debouncer = new_debouncer(
            Duration::from_millis(500),
            None, // No tick rate limit
            move |result: DebounceEventResult| {
                if !running_clone.load(Ordering::Relaxed) {
                    return;
                }
                Self::handle_debounced_events(result, &tx);
            },
        )
        .map_err(|e| WatchError::Init(e.to_string()))?;

        let mut watcher = Self {
            _debouncer: debouncer,
            running,
        };

        // Watch all paths
        for path in watch_paths {
            watcher.watch(&path)?;
        }

        Ok((watcher, rx))
    }

    /// Add a directory to watch.
    pub fn watch(&mut self, path: &PathBuf) -> Result<(), WatchError> {
        tracing::info!(target: "scanner::watcher", path = %path.display(), "Watching directory");
        self._debouncer
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch(e.to_string()))?;
        
        Ok(())
    }

    /// Stop watching a directory.
    pub fn unwatch(&mut self, path: &PathBuf) -> Result<(), WatchError> {
        tracing::info!(target: "scanner::watcher", path = %path.display(), "Unwatching directory");
        self._debouncer
            .unwatch(path)
            .map_err(|e| WatchError::Watch(e.to_string()))
    }

    /// Handle debounced events from notify.
    fn handle_debounced_events(result: DebounceEventResult, tx: &Sender<WatchEvent>) {
        match result {
            Ok(events) => {
                for event in events {
                    for path in &event.paths {
                        // Skip non-audio files
                        if path.is_file() && !is_audio_file(path) {
                            continue;
                        }

                        let watch_event = match event.kind {
                            notify::EventKind::Create(CreateKind::File) => {
                                if is_audio_file(path) {
                                    tracing::debug!(target: "scanner::watcher", path = %path.display(), "File created");
                                    Some(WatchEvent::Created(path.clone()))
                                } else {
                                    None
                                }
                            }
                            notify::EventKind::Create(CreateKind::Folder) => {
                                tracing::debug!(target: "scanner::watcher", path = %path.display(), "Directory created");
                                Some(WatchEvent::DirCreated(path.clone()))
                            }
                            notify::EventKind::Modify(ModifyKind::Data(_)) |
                            notify::EventKind::Modify(ModifyKind::Metadata(_)) => {
                                if is_audio_file(path) {
                                    tracing::debug!(target: "scanner::watcher", path = %path.display(), "File modified");
                                    Some(WatchEvent::Modified(path.clone()))
                                } else {
                                    None
                                }
                            }
                            notify::EventKind::Remove(RemoveKind::File) => {
                                // For removed files, we can't check extension anymore
                                // so we check if it looks like an audio path
                                if looks_like_audio_path(path) {
                                    tracing::debug!(target: "scanner::watcher", path = %path.display(), "File removed");
                                    Some(WatchEvent::Removed(path.clone()))
                                } else {
                                    None
                                }
                            }
                            _ => None,
                        };

                        if let Some(evt) = watch_event {
                            let _ = tx.try_send(evt);
                        }
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    tracing::warn!(target: "scanner::watcher", error = %error, "Watch error");
                    let _ = tx.try_send(WatchEvent::Error(error.to_string()));
                }
            }
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        tracing::debug!(target: "scanner::watcher", "File watcher stopped");
    }
}

/// Check if a path is an audio file by extension.
fn is_audio_file(path: &PathBuf) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "mp3" | "flac" | "ogg" | "wav" | "m4a"))
        .unwrap_or(false)
}

/// Check if a path looks like it could be an audio file (for deleted files).
fn looks_like_audio_path(path: &PathBuf) -> bool {
    is_audio_file(path)
}

/// Errors that can occur during file watching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {0}")]
    Init(String),
    #[error("Failed to watch path: {0}")]
    Watch(String),
}

// ---------------------------------------------------------------------
// Queues and dispatcher (§4.1): the serial consumer that turns a watched
// or backlog-enumerated path into a call to `AudioFileProcessor.process`.
// ---------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::enrichment::traits::{AcoustIdApi, CoverArtApi, LyricsApi, MusicBrainzApi};
use crate::library::AudioFileProcessor;
use crate::model::ProcessResult;

/// Minimum spacing between two consecutive dispatches, so the pipeline never
/// hammers AcoustID/MusicBrainz's rate limits.
pub const PROCESS_INTERVAL: Duration = Duration::from_secs(5);
/// How often the retry queue is drained.
pub const RETRY_CYCLE: Duration = Duration::from_secs(60);
/// Duplicate watch events for the same path within this window are dropped.
const DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);
/// Consecutive 1 s samples the stable-size wait takes before giving up.
const STABLE_WAIT_SAMPLES: u32 = 10;

/// The main FIFO and retry FIFO (§4.1), plus the per-path debounce memory
/// that suppresses duplicate watch events.
pub struct FileQueues {
    main_tx: mpsc::UnboundedSender<PathBuf>,
    retry: StdMutex<VecDeque<(PathBuf, u32)>>,
    recent: StdMutex<HashMap<PathBuf, Instant>>,
}

impl FileQueues {
    /// Build a fresh queue pair. The returned receiver belongs to whichever
    /// task runs [`run_dispatcher`].
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PathBuf>) {
        let (main_tx, main_rx) = mpsc::unbounded_channel();
        let queues = Self { main_tx, retry: StdMutex::new(VecDeque::new()), recent: StdMutex::new(HashMap::new()) };
        (Arc::new(queues), main_rx)
    }

    /// Enqueue onto the main queue, dropping the event if the same path was
    /// already enqueued within [`DEBOUNCE_WINDOW`].
    pub fn enqueue_main(&self, path: PathBuf) {
        let mut recent = self.recent.lock().unwrap();
        if let Some(last) = recent.get(&path) {
            if last.elapsed() < DEBOUNCE_WINDOW {
                return;
            }
        }
        recent.insert(path.clone(), Instant::now());
        let _ = self.main_tx.send(path);
    }

    /// Re-enqueue straight onto the main queue without going through the
    /// debounce check or incrementing any retry counter (`DELAY_RETRY`).
    fn requeue_main_unconditionally(&self, path: PathBuf) {
        let _ = self.main_tx.send(path);
    }

    pub fn enqueue_retry(&self, path: PathBuf, attempts: u32) {
        self.retry.lock().unwrap().push_back((path, attempts));
    }

    pub fn drain_retry(&self) -> Vec<(PathBuf, u32)> {
        self.retry.lock().unwrap().drain(..).collect()
    }
}

/// Poll a newly-created file's size once a second (up to [`STABLE_WAIT_SAMPLES`]
/// times) until two consecutive samples agree and the file is non-empty.
/// Blocking — call from inside `spawn_blocking` or a dedicated thread.
fn wait_for_stable_size(path: &std::path::Path) -> bool {
    let mut last_size = None;
    for _ in 0..STABLE_WAIT_SAMPLES {
        let Ok(meta) = std::fs::metadata(path) else { return false };
        let size = meta.len();
        if size > 0 && last_size == Some(size) {
            return true;
        }
        last_size = Some(size);
        std::thread::sleep(Duration::from_secs(1));
    }
    false
}

/// Pump raw watch events into `queues`, applying the stable-size wait for
/// newly created files and re-registering newly created sub-directories.
pub async fn pump_events(mut watcher: FileWatcher, rx: Receiver<WatchEvent>, queues: Arc<FileQueues>) {
    tokio::task::spawn_blocking(move || {
        while let Ok(event) = rx.recv() {
            match event {
                WatchEvent::Created(path) => {
                    if wait_for_stable_size(&path) {
                        queues.enqueue_main(path);
                    }
                }
                WatchEvent::Modified(path) => queues.enqueue_main(path),
                WatchEvent::DirCreated(path) => {
                    if let Err(e) = watcher.watch(&path) {
                        tracing::warn!(path = %path.display(), error = %e, "failed to watch new sub-directory");
                    }
                }
                WatchEvent::Removed(_) => {}
                WatchEvent::Error(message) => tracing::warn!(error = %message, "file watcher reported an error"),
            }
        }
    })
    .await
    .ok();
}

/// The single serial dispatcher (§4.1): consumes the main queue one file at
/// a time, sleeping [`PROCESS_INTERVAL`] between dispatches.
pub async fn run_dispatcher<A, M, C, L>(
    processor: Arc<AudioFileProcessor<A, M, C, L>>,
    queues: Arc<FileQueues>,
    mut main_rx: mpsc::UnboundedReceiver<PathBuf>,
) where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    while let Some(path) = main_rx.recv().await {
        let result = processor.process(&path).await;
        match result {
            ProcessResult::Success | ProcessResult::PermanentFail => {}
            ProcessResult::DelayRetry => queues.requeue_main_unconditionally(path),
            ProcessResult::NetworkErrorRetry => queues.enqueue_retry(path, 1),
        }
        tokio::time::sleep(PROCESS_INTERVAL).await;
    }
}

/// Drains the retry queue every [`RETRY_CYCLE`]; a file that is still
/// failing after `max_retries` attempts is quarantined and never retried
/// again.
pub async fn run_retry_worker<A, M, C, L>(
    processor: Arc<AudioFileProcessor<A, M, C, L>>,
    queues: Arc<FileQueues>,
    max_retries: u32,
) where
    A: AcoustIdApi,
    M: MusicBrainzApi,
    C: CoverArtApi,
    L: LyricsApi,
{
    loop {
        tokio::time::sleep(RETRY_CYCLE).await;
        for (path, attempts) in queues.drain_retry() {
            let result = processor.process(&path).await;
            match result {
                ProcessResult::Success | ProcessResult::PermanentFail => {}
                ProcessResult::DelayRetry => queues.requeue_main_unconditionally(path),
                ProcessResult::NetworkErrorRetry if attempts >= max_retries => {
                    processor.quarantine_after_max_retries(&path).await;
                }
                ProcessResult::NetworkErrorRetry => queues.enqueue_retry(path, attempts + 1),
            }
            tokio::time::sleep(PROCESS_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(&PathBuf::from("song.mp3")));
        assert!(is_audio_file(&PathBuf::from("song.FLAC")));
        assert!(is_audio_file(&PathBuf::from("song.ogg")));
        assert!(!is_audio_file(&PathBuf::from("image.png")));
        assert!(!is_audio_file(&PathBuf::from("document.txt")));
    }

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        let (watcher, _rx) = FileWatcher::new(vec![dir.path().to_path_buf()]).unwrap();
        drop(watcher); // Should not panic
    }

    #[test]
    fn test_watcher_detects_new_file() {
        let dir = tempdir().unwrap();
        let (watcher, rx) = FileWatcher::new(vec![dir.path().to_path_buf()]).unwrap();

        // Create a file
        let file_path = dir.path().join("new_song.mp3");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"fake mp3 content").unwrap();
        file.sync_all().unwrap();

        // Wait for event (with timeout)
        let event = rx.recv_timeout(Duration::from_secs(2));
        
        // Clean up
        drop(watcher);

        // Check we got a create event
        if let Ok(WatchEvent::Created(path)) = event {
            assert_eq!(path.file_name().unwrap(), "new_song.mp3");
        }
        // Note: On some systems, the event might not fire within the timeout
        // due to debouncing or filesystem quirks, so we don't assert!(event.is_ok())
    }

    #[test]
    fn enqueue_main_drops_duplicate_within_debounce_window() {
        let (queues, mut rx) = FileQueues::new();
        let path = PathBuf::from("/music/track.mp3");
        queues.enqueue_main(path.clone());
        queues.enqueue_main(path.clone());

        assert_eq!(rx.try_recv().unwrap(), path);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn requeue_main_unconditionally_bypasses_debounce() {
        let (queues, mut rx) = FileQueues::new();
        let path = PathBuf::from("/music/track.mp3");
        queues.enqueue_main(path.clone());
        let _ = rx.try_recv();
        queues.requeue_main_unconditionally(path.clone());

        assert_eq!(rx.try_recv().unwrap(), path);
    }

    #[test]
    fn drain_retry_empties_the_queue() {
        let (queues, _rx) = FileQueues::new();
        queues.enqueue_retry(PathBuf::from("/music/a.mp3"), 1);
        queues.enqueue_retry(PathBuf::from("/music/b.mp3"), 2);

        let drained = queues.drain_retry();
        assert_eq!(drained.len(), 2);
        assert!(queues.drain_retry().is_empty());
    }

    #[tokio::test]
    async fn dispatcher_skips_already_processed_file_without_touching_retry_queue() {
        use crate::config::Config;
        use crate::cover::CoverArtResolver;
        use crate::db::{FileProcessedStore, ProcessedStore};
        use crate::enrichment::traits::mocks::{MockAcoustId, MockCoverArt, MockLyricsApi, MockMusicBrainz};
        use crate::enrichment::MetadataAdapter;
        use crate::library::{BatchWriter, FailedFileHandler, FolderAlbumCache};
        use crate::model::ProcessedRecord;
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.monitor.directory = Some(temp.path().to_path_buf());
        let config = Arc::new(config);

        let store: Arc<dyn ProcessedStore> = Arc::new(FileProcessedStore::new(temp.path().join("processed.log")));
        let track = temp.path().join("track.mp3");
        std::fs::write(&track, b"not real audio").unwrap();
        store
            .mark_processed(ProcessedRecord {
                absolute_path: track.to_string_lossy().into_owned(),
                file_hash: "x".to_string(),
                file_name: "track.mp3".to_string(),
                file_size: 14,
                processed_time: "2026-01-01T00:00:00Z".to_string(),
                recording_id: Some("rec".to_string()),
                artist: None,
                title: None,
                album: None,
            })
            .await
            .unwrap();

        let adapter = Arc::new(MetadataAdapter::with_clients(
            MockAcoustId::no_matches(),
            MockMusicBrainz::default(),
            MockCoverArt::with_placeholder(),
            MockLyricsApi { lyrics: None },
        ));
        let album_cache = Arc::new(FolderAlbumCache::new());
        let cover_resolver = Arc::new(CoverArtResolver::new(temp.path().join("cache")));
        let batch_writer =
            Arc::new(BatchWriter::new(config.clone(), store.clone(), cover_resolver.clone(), album_cache.clone()));
        let failed_handler = Arc::new(FailedFileHandler::new(config.clone(), store.clone(), cover_resolver.clone()));
        let processor = Arc::new(AudioFileProcessor::new(
            config,
            store,
            adapter,
            album_cache,
            cover_resolver,
            batch_writer,
            failed_handler,
        ));

        let (queues, main_rx) = FileQueues::new();
        queues.enqueue_main(track);

        let dispatch_queues = queues.clone();
        let handle = tokio::spawn(run_dispatcher(processor, dispatch_queues, main_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(queues.drain_retry().is_empty());
    }
}

//! FolderAlbumCache (C7, §4.8): per-folder album identification state — a
//! lock, a sample collector, and a pending-file queue — guarded by one
//! mutex so concurrent files landing in the same folder never race each
//! other's view of the lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::enrichment::duration_matcher;
use crate::enrichment::quick_scanner::AlbumSearchSource;
use crate::model::{
    AlbumIdentificationInfo, CacheSource, CachedAlbumInfo, CandidateRelease, PendingFile, SampleCollector,
};

/// Cumulative disagreements with a lock's `release_group_id` before the lock
/// is dropped.
const MISMATCH_LIMIT: u32 = 3;

/// Minimum vote share to accept the voting fallback when no candidate clears
/// the duration-sequence match threshold.
const VOTE_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Default)]
struct FolderState {
    lock: Option<CachedAlbumInfo>,
    sample_collector: Option<SampleCollector>,
    pending_files: Vec<PendingFile>,
}

/// `calculateRequiredSamples(n)`: 1 for a folder of ≤2 files, 2 for 3-6, 3
/// for 7-12, else `clamp(n/4, 3, 5)`.
fn calculate_required_samples(music_files_in_folder: u32) -> usize {
    match music_files_in_folder {
        0..=2 => 1,
        3..=6 => 2,
        7..=12 => 3,
        n => ((n / 4) as usize).clamp(3, 5),
    }
}

pub struct FolderAlbumCache {
    folders: Mutex<HashMap<PathBuf, FolderState>>,
}

impl Default for FolderAlbumCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderAlbumCache {
    pub fn new() -> Self {
        Self { folders: Mutex::new(HashMap::new()) }
    }

    /// Current lock for `folder`, if any.
    pub fn get_lock(&self, folder: &Path) -> Option<CachedAlbumInfo> {
        self.folders.lock().unwrap().get(folder).and_then(|s| s.lock.clone())
    }

    /// Priority-aware lock writer. Higher [`CacheSource::priority`] wins;
    /// equal priority defers to higher confidence. A successful replacement
    /// drops the sample collector — no more evidence is needed once locked.
    /// Returns the lock now in effect, which may be `candidate` or whatever
    /// already outranked it.
    pub fn set_folder_album(&self, folder: &Path, candidate: CachedAlbumInfo) -> CachedAlbumInfo {
        let mut folders = self.folders.lock().unwrap();
        let state = folders.entry(folder.to_path_buf()).or_default();
        let should_replace = match &state.lock {
            None => true,
            Some(current) => {
                candidate.source.priority() > current.source.priority()
                    || (candidate.source.priority() == current.source.priority()
                        && candidate.confidence > current.confidence)
            }
        };
        if should_replace {
            state.lock = Some(candidate.clone());
            state.sample_collector = None;
            candidate
        } else {
            state.lock.clone().expect("should_replace is false only when a lock exists")
        }
    }

    /// Atomic check-then-append: `true` if `file` was newly queued, `false`
    /// if this path was already pending for the folder.
    pub fn add_pending_file_if_absent(&self, folder: &Path, file: PendingFile) -> bool {
        let mut folders = self.folders.lock().unwrap();
        let state = folders.entry(folder.to_path_buf()).or_default();
        if state.pending_files.iter().any(|p| p.absolute_path == file.absolute_path) {
            false
        } else {
            state.pending_files.push(file);
            true
        }
    }

    /// Drain and return every pending file queued for `folder`.
    pub fn take_pending_files(&self, folder: &Path) -> Vec<PendingFile> {
        self.folders
            .lock()
            .unwrap()
            .get_mut(folder)
            .map(|s| std::mem::take(&mut s.pending_files))
            .unwrap_or_default()
    }

    pub fn pending_len(&self, folder: &Path) -> usize {
        self.folders.lock().unwrap().get(folder).map(|s| s.pending_files.len()).unwrap_or(0)
    }

    /// Every folder currently holding at least one pending file, for the
    /// shutdown drain (`BatchWriter.processAllPendingBeforeShutdown`).
    pub fn folders_with_pending(&self) -> Vec<PathBuf> {
        self.folders
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, state)| !state.pending_files.is_empty())
            .map(|(folder, _)| folder.clone())
            .collect()
    }

    /// Sample-driven album determination (§4.8 `addSample`):
    /// 1. If already locked, return the lock.
    /// 2. Append this sample to the folder's collector.
    /// 3. Once the required sample count is reached (capped by how many
    ///    files are actually pending)...
    /// 4. ...match every distinct release-group observed (primary candidates
    ///    plus every alternative, deduplicated) against the folder's
    ///    duration sequence.
    /// 5. A match above the threshold locks with `DurationSequence`; failing
    ///    that, a vote tally above [`VOTE_CONFIDENCE_THRESHOLD`] locks with
    ///    `Voting`.
    /// 6. Otherwise keep collecting.
    pub async fn add_sample(
        &self,
        folder: &Path,
        path: PathBuf,
        info: AlbumIdentificationInfo,
        music_files_in_folder: u32,
        source: &impl AlbumSearchSource,
        folder_durations: &[u32],
        folder_name: &str,
    ) -> Option<CachedAlbumInfo> {
        if let Some(lock) = self.get_lock(folder) {
            return Some(lock);
        }

        {
            let mut folders = self.folders.lock().unwrap();
            let state = folders.entry(folder.to_path_buf()).or_default();
            state.sample_collector.get_or_insert_with(SampleCollector::new).push(path, info);
        }

        let required = calculate_required_samples(music_files_in_folder).min(self.pending_len(folder).max(1));
        let collected = {
            let folders = self.folders.lock().unwrap();
            folders.get(folder).and_then(|s| s.sample_collector.as_ref()).map(|c| c.len()).unwrap_or(0)
        };
        if collected < required {
            return None;
        }

        let mut release_groups: Vec<String> = Vec::new();
        {
            let folders = self.folders.lock().unwrap();
            if let Some(collector) = folders.get(folder).and_then(|s| s.sample_collector.as_ref()) {
                for (_, info) in collector.iter() {
                    if let Some(rg) = &info.release_group_id
                        && !release_groups.contains(rg)
                    {
                        release_groups.push(rg.clone());
                    }
                    for alt in &info.alternatives {
                        if !release_groups.contains(&alt.release_group_id) {
                            release_groups.push(alt.release_group_id.clone());
                        }
                    }
                }
            }
        }

        let mut candidates: Vec<CandidateRelease> = Vec::new();
        for rg in &release_groups {
            if let Ok(releases) = source.duration_sequence(rg).await {
                candidates.extend(releases);
            }
        }

        if let Some(best) = duration_matcher::select(folder_durations, folder_name, &candidates) {
            let locked = CachedAlbumInfo {
                release_group_id: best.candidate.release_group_id.clone(),
                release_id: Some(best.candidate.release_id.clone()),
                album_title: best.candidate.title.clone(),
                album_artist: best.candidate.album_artist.clone(),
                track_count: Some(best.candidate.durations.len() as u32),
                release_date: None,
                confidence: best.similarity,
                source: CacheSource::DurationSequence,
                mismatch_count: 0,
            };
            return Some(self.set_folder_album(folder, locked));
        }

        let tally = {
            let folders = self.folders.lock().unwrap();
            folders.get(folder).and_then(|s| s.sample_collector.as_ref()).map(|c| c.vote_tally()).unwrap_or_default()
        };

        if let Some((winner_rg, votes)) = tally.first() {
            let total: usize = tally.iter().map(|(_, v)| v).sum();
            let confidence = if total > 0 { *votes as f64 / total as f64 } else { 0.0 };
            if confidence >= VOTE_CONFIDENCE_THRESHOLD {
                let winner_info = {
                    let folders = self.folders.lock().unwrap();
                    folders
                        .get(folder)
                        .and_then(|s| s.sample_collector.as_ref())
                        .and_then(|c| c.iter().find(|(_, i)| i.release_group_id.as_deref() == Some(winner_rg.as_str())))
                        .map(|(_, i)| i.clone())
                };
                if let Some(info) = winner_info {
                    let locked = CachedAlbumInfo {
                        release_group_id: winner_rg.clone(),
                        release_id: None,
                        album_title: info.title.unwrap_or_default(),
                        album_artist: info.album_artist.unwrap_or_default(),
                        track_count: info.track_count,
                        release_date: info.release_date,
                        confidence,
                        source: CacheSource::Voting,
                        mismatch_count: 0,
                    };
                    return Some(self.set_folder_album(folder, locked));
                }
            }
        }

        None
    }

    /// Single-file direct determination: a folder with exactly one music
    /// file never accumulates further evidence, so lock immediately from its
    /// own fingerprint match.
    pub fn determine_album_with_duration_sequence(
        &self,
        folder: &Path,
        candidate: CandidateRelease,
        similarity: f64,
    ) -> CachedAlbumInfo {
        let locked = CachedAlbumInfo {
            release_group_id: candidate.release_group_id,
            release_id: Some(candidate.release_id),
            album_title: candidate.title,
            album_artist: candidate.album_artist,
            track_count: Some(candidate.durations.len() as u32),
            release_date: None,
            confidence: similarity,
            source: CacheSource::DurationSequence,
            mismatch_count: 0,
        };
        self.set_folder_album(folder, locked)
    }

    /// A sample disagreeing with the lock's `release_group_id` increments
    /// `mismatch_count`; [`MISMATCH_LIMIT`] cumulative mismatches invalidate
    /// the lock, dropping both the lock and the (already-empty) collector.
    pub fn record_mismatch(&self, folder: &Path, observed_release_group_id: &str) {
        let mut folders = self.folders.lock().unwrap();
        if let Some(state) = folders.get_mut(folder) {
            let invalidate = match &mut state.lock {
                Some(lock) if lock.release_group_id != observed_release_group_id => {
                    lock.mismatch_count += 1;
                    lock.mismatch_count >= MISMATCH_LIMIT
                }
                _ => false,
            };
            if invalidate {
                state.lock = None;
                state.sample_collector = None;
            }
        }
    }
}

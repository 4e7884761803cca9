//! Core data model of the curation pipeline.
//!
//! These are the entities passed between `FingerprintAdapter`, `MetadataAdapter`,
//! `DurationSequenceMatcher`, `QuickScanner`, `FolderAlbumCache`, and
//! `BatchWriter`. None of them map to a persisted relational schema — that is
//! `db::ProcessedRecord`'s job alone; everything here lives in memory for the
//! lifetime of one file (or one folder) being processed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

/// The string written as `albumArtist` whenever normalization can't settle on
/// a single name (empty, "Unknown Artist", or more than one contributing
/// artist).
pub const VARIOUS_ARTISTS: &str = "Various Artists";

/// Normalize a raw album-artist string per the invariant that a written file
/// never carries an empty or "Unknown Artist" `albumArtist` tag (P5 / data
/// model invariant 4).
///
/// `contributor_count` is the number of distinct performing artists observed
/// across the folder's sample set; more than one collapses to
/// [`VARIOUS_ARTISTS`] regardless of what the raw string says.
pub fn normalize_album_artist(raw: Option<&str>, contributor_count: usize) -> String {
    if contributor_count > 1 {
        return VARIOUS_ARTISTS.to_string();
    }
    match raw.map(str::trim) {
        None | Some("") => VARIOUS_ARTISTS.to_string(),
        Some(a) if a.eq_ignore_ascii_case("unknown artist") => VARIOUS_ARTISTS.to_string(),
        Some(a) if names_multiple_contributors(a) => VARIOUS_ARTISTS.to_string(),
        Some(a) => a.to_string(),
    }
}

/// A single `albumArtist` string that itself names more than one contributor
/// ("A feat. B", "A ft. B", "A & B", "A and B") collapses the same as a
/// folder with multiple distinct per-track artists.
fn names_multiple_contributors(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    [" feat. ", " feat ", " ft. ", " ft ", " featuring ", " & ", " and "]
        .iter()
        .any(|sep| lower.contains(sep))
}

/// Number of distinct, non-empty `artist` values across a folder's tracks.
/// Used to feed [`normalize_album_artist`]'s `contributor_count` when several
/// files from the same folder are written together.
pub fn count_distinct_artists<'a>(artists: impl IntoIterator<Item = &'a str>) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for artist in artists {
        let trimmed = artist.trim();
        if !trimmed.is_empty() && !seen.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
            seen.push(trimmed);
        }
    }
    seen.len()
}

/// Fully-identified (or partially-identified) metadata for one track.
///
/// Created by `MetadataAdapter` or `QuickScanner`; mutated only by
/// `AudioFileProcessor` as it merges in a folder lock or an alternate
/// candidate, and is otherwise treated as immutable-on-publish (§9 redesign
/// flag).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub recording_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub release_group_id: Option<String>,
    pub release_id: Option<String>,
    /// ISO year ("2004") or full date ("2004-03-15"), whichever the source offered.
    pub release_date: Option<String>,
    pub track_count: Option<u32>,
    pub disc_no: Option<u32>,
    pub track_no: Option<u32>,
    pub genres: Vec<String>,
    pub composer: Option<String>,
    pub lyricist: Option<String>,
    /// LRC-synced lyrics are preferred over plain text when both are available.
    pub lyrics: Option<String>,
    pub cover_art_url: Option<String>,
    /// Confidence score contributing to candidate ranking; not written to disk.
    pub score: f64,
}

impl TrackMetadata {
    /// Merge `other` into `self`, preferring fields already set on `self` and
    /// filling gaps from `other`. Used when a folder lock supplies
    /// album-level fields (`album`, `album_artist`, `release_group_id`, ...)
    /// that a per-file identification didn't resolve on its own.
    pub fn merge(mut self, other: &TrackMetadata) -> Self {
        macro_rules! fill {
            ($field:ident) => {
                if self.$field.is_none() {
                    self.$field = other.$field.clone();
                }
            };
        }
        fill!(recording_id);
        fill!(title);
        fill!(artist);
        fill!(album_artist);
        fill!(album);
        fill!(release_group_id);
        fill!(release_id);
        fill!(release_date);
        fill!(track_count);
        fill!(disc_no);
        fill!(track_no);
        fill!(composer);
        fill!(lyricist);
        fill!(lyrics);
        fill!(cover_art_url);
        if self.genres.is_empty() {
            self.genres = other.genres.clone();
        }
        self
    }

    /// Apply the write-time `albumArtist` normalization invariant, given how
    /// many distinct contributing artists the folder's samples observed.
    pub fn normalized_album_artist(&self, contributor_count: usize) -> String {
        normalize_album_artist(self.album_artist.as_deref(), contributor_count)
    }
}

/// One release-group candidate as returned by the fingerprint/metadata
/// service, carrying the ordered track durations needed by
/// `DurationSequenceMatcher`. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRelease {
    pub release_group_id: String,
    pub release_id: String,
    pub title: String,
    pub album_artist: String,
    /// Ordered seconds, one per track, in track order.
    pub durations: Vec<u32>,
    pub media_format: Option<String>,
}

/// Where a folder's cached album identification came from, ranked by
/// priority — higher numeric value wins when more than one source is
/// available for the same folder (data model invariant 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CacheSource {
    Unknown = 0,
    Voting = 30,
    DurationSequence = 50,
    QuickScan = 100,
}

impl CacheSource {
    pub fn priority(self) -> u8 {
        self as u8
    }
}

/// The per-folder album identification, once locked. At most one exists per
/// folder at any time; `mismatch_count` is the only field mutated after
/// creation (accumulated mismatch evidence that eventually invalidates the
/// lock, see `FolderAlbumCache`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAlbumInfo {
    pub release_group_id: String,
    pub release_id: Option<String>,
    pub album_title: String,
    pub album_artist: String,
    pub track_count: Option<u32>,
    pub release_date: Option<String>,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
    pub source: CacheSource,
    pub mismatch_count: u32,
}

/// A file parked in a folder's sample-collection queue, waiting for the
/// folder to lock onto an album before `BatchWriter` can write it out.
/// Destroyed when the folder drains (lock acquired or forced).
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub absolute_path: PathBuf,
    pub track_metadata: TrackMetadata,
    pub cover_art_bytes: Option<Vec<u8>>,
    pub enqueue_timestamp: Instant,
}

/// One alternative release-group the fingerprint service offered besides the
/// primary candidate recorded on an `AlbumIdentificationInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReleaseGroup {
    pub release_group_id: String,
    pub title: String,
    pub album_artist: String,
    pub track_count: Option<u32>,
}

/// A single sample observation recorded while a folder is still collecting
/// evidence: the primary candidate plus whatever alternates the service
/// offered for the same recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumIdentificationInfo {
    pub release_group_id: Option<String>,
    pub title: Option<String>,
    pub album_artist: Option<String>,
    pub track_count: Option<u32>,
    pub release_date: Option<String>,
    pub alternatives: Vec<CandidateReleaseGroup>,
}

/// Ordered multimap file → observed `AlbumIdentificationInfo`, kept per
/// folder while that folder has no lock. Lives only as long as the folder is
/// unlocked; dropped (or converted into a vote) once a lock is acquired.
#[derive(Debug, Clone, Default)]
pub struct SampleCollector {
    samples: Vec<(PathBuf, AlbumIdentificationInfo)>,
    pub completed: bool,
}

impl SampleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf, info: AlbumIdentificationInfo) {
        self.samples.push((path, info));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PathBuf, AlbumIdentificationInfo)> {
        self.samples.iter()
    }

    /// Tally votes by `release_group_id` across every recorded sample
    /// (primary candidate only), most-voted first. Used by the
    /// confidence-voting fallback when no single candidate reaches the
    /// duration-sequence match threshold.
    pub fn vote_tally(&self) -> Vec<(String, usize)> {
        let mut tally: HashMap<String, usize> = HashMap::new();
        for (_, info) in &self.samples {
            if let Some(rg) = &info.release_group_id {
                *tally.entry(rg.clone()).or_insert(0) += 1;
            }
        }
        let mut tally: Vec<(String, usize)> = tally.into_iter().collect();
        tally.sort_by(|a, b| b.1.cmp(&a.1));
        tally
    }
}

/// `(absolutePath, fileHash, fileName, fileSize, processedTime, recordingId,
/// artist, title, album)`. Unique key: `absolute_path`. The only durable
/// record of a file's pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub absolute_path: String,
    pub file_hash: String,
    pub file_name: String,
    pub file_size: u64,
    /// RFC 3339 timestamp.
    pub processed_time: String,
    pub recording_id: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

/// Outcome of `AudioFileProcessor.process(file)`. A value, never wrapped in
/// `Result` — network or I/O failures are translated into one of the two
/// retry-carrying variants at the single point inside the processor (see
/// `error` module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    Success,
    /// Re-enqueue to the main queue without incrementing the retry counter
    /// (e.g. the folder lock is held by another in-flight file).
    DelayRetry,
    /// Move to the retry queue with the retry counter incremented.
    NetworkErrorRetry,
    /// Quarantine and record as failed; no further retries.
    PermanentFail,
}

/// Match-quality bucket produced by `DurationSequenceMatcher`, used both for
/// the selection rule and for log/diagnostic purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl MatchQuality {
    /// Bucket a similarity score in `[0.0, 1.0]` into a quality tier.
    pub fn from_similarity(sim: f64) -> Self {
        if sim >= 0.95 {
            MatchQuality::Excellent
        } else if sim >= 0.85 {
            MatchQuality::Good
        } else if sim >= 0.7 {
            MatchQuality::Fair
        } else {
            MatchQuality::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_album_artist_empty_and_unknown() {
        assert_eq!(normalize_album_artist(None, 1), VARIOUS_ARTISTS);
        assert_eq!(normalize_album_artist(Some(""), 1), VARIOUS_ARTISTS);
        assert_eq!(normalize_album_artist(Some("Unknown Artist"), 1), VARIOUS_ARTISTS);
        assert_eq!(normalize_album_artist(Some("  "), 1), VARIOUS_ARTISTS);
    }

    #[test]
    fn normalize_album_artist_multi_contributor_collapses() {
        assert_eq!(normalize_album_artist(Some("Daft Punk"), 3), VARIOUS_ARTISTS);
    }

    #[test]
    fn normalize_album_artist_single_contributor_passthrough() {
        assert_eq!(normalize_album_artist(Some("Daft Punk"), 1), "Daft Punk");
    }

    #[test]
    fn normalize_album_artist_embedded_feat_collapses() {
        assert_eq!(normalize_album_artist(Some("A feat. B"), 1), VARIOUS_ARTISTS);
        assert_eq!(normalize_album_artist(Some("A & B"), 1), VARIOUS_ARTISTS);
    }

    #[test]
    fn count_distinct_artists_is_case_insensitive_and_ignores_blanks() {
        assert_eq!(count_distinct_artists(["Daft Punk", "daft punk", "", "  "]), 1);
        assert_eq!(count_distinct_artists(["Daft Punk", "Air"]), 2);
        assert_eq!(count_distinct_artists(std::iter::empty()), 0);
    }

    #[test]
    fn track_metadata_merge_fills_gaps_without_overwriting() {
        let mut a = TrackMetadata {
            title: Some("Track".to_string()),
            ..Default::default()
        };
        let b = TrackMetadata {
            title: Some("Other Title".to_string()),
            album: Some("Album".to_string()),
            ..Default::default()
        };
        a = a.merge(&b);
        assert_eq!(a.title.as_deref(), Some("Track"));
        assert_eq!(a.album.as_deref(), Some("Album"));
    }

    #[test]
    fn cache_source_priority_ordering() {
        assert!(CacheSource::QuickScan > CacheSource::DurationSequence);
        assert!(CacheSource::DurationSequence > CacheSource::Voting);
        assert!(CacheSource::Voting > CacheSource::Unknown);
    }

    #[test]
    fn sample_collector_vote_tally_counts_primary_candidate_only() {
        let mut collector = SampleCollector::new();
        for i in 0..3 {
            collector.push(
                PathBuf::from(format!("track{i}.mp3")),
                AlbumIdentificationInfo {
                    release_group_id: Some("rg-a".to_string()),
                    title: None,
                    album_artist: None,
                    track_count: None,
                    release_date: None,
                    alternatives: vec![],
                },
            );
        }
        collector.push(
            PathBuf::from("track3.mp3"),
            AlbumIdentificationInfo {
                release_group_id: Some("rg-b".to_string()),
                title: None,
                album_artist: None,
                track_count: None,
                release_date: None,
                alternatives: vec![],
            },
        );
        let tally = collector.vote_tally();
        assert_eq!(tally[0], ("rg-a".to_string(), 3));
        assert_eq!(tally[1], ("rg-b".to_string(), 1));
    }

    #[test]
    fn match_quality_buckets() {
        assert_eq!(MatchQuality::from_similarity(0.99), MatchQuality::Excellent);
        assert_eq!(MatchQuality::from_similarity(0.9), MatchQuality::Good);
        assert_eq!(MatchQuality::from_similarity(0.75), MatchQuality::Fair);
        assert_eq!(MatchQuality::from_similarity(0.5), MatchQuality::Poor);
    }
}

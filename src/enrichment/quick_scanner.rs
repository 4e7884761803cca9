//! QuickScanner (C9): cheap album identification from tags/folder name plus
//! a duration-sequence confirmation against up to 10 search candidates.

use std::sync::LazyLock;

use regex::Regex;

use crate::enrichment::domain::EnrichmentError;
use crate::model::{CandidateRelease, CandidateReleaseGroup};

/// Matches `"Artist - Album (Year)"`, `"Artist - Album"`, `"Album (Year)"`, or
/// bare `"Album"`.
static FOLDER_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<artist>.+?) - )?(?P<album>.+?)(?: \((?P<year>\d{4})\))?$").expect("valid regex")
});

const QUICK_MATCH_THRESHOLD: f64 = 0.90;
const MAX_CANDIDATES: usize = 10;

/// Parsed `(artist?, album)` from a folder name. `None` if nothing usable
/// could be extracted (step 2 of §4.7: "if no album extracted, give up").
#[derive(Debug, Clone, PartialEq)]
pub struct FolderNameGuess {
    pub artist: Option<String>,
    pub album: String,
}

pub fn parse_folder_name(folder_name: &str) -> Option<FolderNameGuess> {
    let trimmed = folder_name.trim();
    if trimmed.is_empty() {
        return None;
    }
    let caps = FOLDER_NAME_PATTERN.captures(trimmed)?;
    let album = caps.name("album")?.as_str().trim();
    if album.is_empty() {
        return None;
    }
    Some(FolderNameGuess {
        artist: caps.name("artist").map(|m| m.as_str().trim().to_string()),
        album: album.to_string(),
    })
}

/// Source of album search + duration-sequence data for QuickScanner. Kept
/// abstract so QuickScanner doesn't depend on the metadata facade directly —
/// `MetadataAdapter` implements this.
#[async_trait::async_trait]
pub trait AlbumSearchSource {
    async fn search_album(
        &self,
        album_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<CandidateReleaseGroup>, EnrichmentError>;

    async fn duration_sequence(&self, release_group_id: &str) -> Result<Vec<CandidateRelease>, EnrichmentError>;
}

/// Outcome of a successful quick scan.
#[derive(Debug, Clone)]
pub struct QuickScanResult {
    pub release: CandidateRelease,
    pub similarity: f64,
}

/// Run QuickScanner's full algorithm (§4.7 steps 3-5): search up to
/// [`MAX_CANDIDATES`] albums, fetch each candidate's duration sequence, DTW
/// against `folder_durations`, early-exiting once [`QUICK_MATCH_THRESHOLD`]
/// is reached.
pub async fn scan(
    source: &impl AlbumSearchSource,
    folder_name: &str,
    folder_durations: &[u32],
) -> Option<QuickScanResult> {
    let guess = parse_folder_name(folder_name)?;

    let candidates = source
        .search_album(&guess.album, guess.artist.as_deref())
        .await
        .ok()?;

    let mut best: Option<QuickScanResult> = None;
    for rg in candidates.iter().take(MAX_CANDIDATES) {
        let Ok(releases) = source.duration_sequence(&rg.release_group_id).await else {
            continue;
        };
        for release in releases {
            let similarity = crate::enrichment::duration_matcher::dtw_similarity(folder_durations, &release.durations);
            let is_better = best.as_ref().map(|b| similarity > b.similarity).unwrap_or(true);
            if is_better {
                best = Some(QuickScanResult { release: release.clone(), similarity });
            }
            if similarity >= QUICK_MATCH_THRESHOLD {
                return best;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn parses_artist_album_year() {
        let guess = parse_folder_name("Pink Floyd - The Wall (1979)").unwrap();
        assert_eq!(guess.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(guess.album, "The Wall");
    }

    #[test]
    fn parses_bare_album_name() {
        let guess = parse_folder_name("Discovery").unwrap();
        assert_eq!(guess.artist, None);
        assert_eq!(guess.album, "Discovery");
    }

    #[test]
    fn rejects_empty_folder_name() {
        assert!(parse_folder_name("   ").is_none());
    }

    struct FakeSource {
        groups: Vec<CandidateReleaseGroup>,
        sequences: Mutex<Vec<(String, Vec<CandidateRelease>)>>,
    }

    #[async_trait::async_trait]
    impl AlbumSearchSource for FakeSource {
        async fn search_album(
            &self,
            _album_name: &str,
            _artist_name: Option<&str>,
        ) -> Result<Vec<CandidateReleaseGroup>, EnrichmentError> {
            Ok(self.groups.clone())
        }

        async fn duration_sequence(&self, release_group_id: &str) -> Result<Vec<CandidateRelease>, EnrichmentError> {
            let sequences = self.sequences.lock().unwrap();
            Ok(sequences
                .iter()
                .find(|(id, _)| id == release_group_id)
                .map(|(_, r)| r.clone())
                .unwrap_or_default())
        }
    }

    fn release(rg: &str, durations: Vec<u32>) -> CandidateRelease {
        CandidateRelease {
            release_group_id: rg.to_string(),
            release_id: format!("{rg}-rel"),
            title: "Test".to_string(),
            album_artist: "Artist".to_string(),
            durations,
            media_format: Some("CD".to_string()),
        }
    }

    #[tokio::test]
    async fn scan_returns_none_when_folder_name_unparseable() {
        let source = FakeSource { groups: vec![], sequences: Mutex::new(vec![]) };
        let result = scan(&source, "   ", &[180, 200]).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn scan_early_exits_on_strong_match() {
        let source = FakeSource {
            groups: vec![
                CandidateReleaseGroup {
                    release_group_id: "rg-1".to_string(),
                    title: "Wrong".to_string(),
                    album_artist: "Artist".to_string(),
                    track_count: None,
                },
                CandidateReleaseGroup {
                    release_group_id: "rg-2".to_string(),
                    title: "Right".to_string(),
                    album_artist: "Artist".to_string(),
                    track_count: None,
                },
            ],
            sequences: Mutex::new(vec![
                ("rg-1".to_string(), vec![release("rg-1", vec![999, 999])]),
                ("rg-2".to_string(), vec![release("rg-2", vec![180, 200])]),
            ]),
        };
        let result = scan(&source, "Artist - Right", &[180, 200]).await.unwrap();
        assert_eq!(result.release.release_group_id, "rg-2");
        assert!(result.similarity >= QUICK_MATCH_THRESHOLD);
    }
}

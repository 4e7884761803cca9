//! Release selection scoring (§4.5), used by `MetadataAdapter::get_recording_by_id`
//! whenever a recording maps to more than one candidate release and neither a
//! preferred release nor a preferred release-group was supplied.

/// Formats that carry no audio tracks worth scoring against a folder of
/// music files — `getAllReleaseDurationSequences` skips media in these
/// formats entirely.
pub const VIDEO_FORMATS: &[&str] = &["dvd-video", "dvd", "blu-ray", "vhs", "laserdisc", "vcd"];

pub fn is_video_format(format: Option<&str>) -> bool {
    match format {
        Some(f) => VIDEO_FORMATS.iter().any(|v| v.eq_ignore_ascii_case(f)),
        None => false,
    }
}

/// One release worth scoring: a flattened view of the MusicBrainz release +
/// release-group DTOs, independent of any particular client.
#[derive(Debug, Clone)]
pub struct ReleaseCandidate {
    pub release_id: String,
    pub release_group_id: Option<String>,
    pub primary_type: Option<String>,
    pub secondary_types: Vec<String>,
    pub format: Option<String>,
    pub track_count: Option<u32>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FolderSize {
    Mini,
    EpSized,
    LargeCollection,
    Other,
}

fn folder_size(music_files_in_folder: u32) -> FolderSize {
    if music_files_in_folder <= 2 {
        FolderSize::Mini
    } else if music_files_in_folder <= 6 {
        FolderSize::EpSized
    } else if music_files_in_folder >= 15 {
        FolderSize::LargeCollection
    } else {
        FolderSize::Other
    }
}

fn primary_type_score(
    primary_type: Option<&str>,
    size: FolderSize,
    track_count: Option<u32>,
    music_files_in_folder: u32,
) -> f64 {
    let kind = primary_type.unwrap_or("").to_ascii_lowercase();
    match kind.as_str() {
        "album" => match size {
            FolderSize::Mini => 50.0,
            FolderSize::EpSized => 90.0,
            FolderSize::LargeCollection => 120.0,
            FolderSize::Other => 100.0,
        },
        "ep" => match size {
            FolderSize::Mini => 70.0,
            FolderSize::EpSized => 150.0,
            FolderSize::LargeCollection => {
                // An EP whose trackCount covers most of the folder is
                // standing in for a full release, not a true EP: score it
                // like one.
                let large_enough = track_count
                    .map(|tc| tc as f64 >= 0.7 * music_files_in_folder as f64)
                    .unwrap_or(false);
                if large_enough { 120.0 } else { 80.0 }
            }
            FolderSize::Other => 80.0,
        },
        "single" => match size {
            FolderSize::Mini => 150.0,
            FolderSize::EpSized => 60.0,
            FolderSize::LargeCollection => 60.0,
            FolderSize::Other => 60.0,
        },
        "compilation" => match size {
            FolderSize::Mini => 40.0,
            FolderSize::EpSized => 40.0,
            FolderSize::LargeCollection => 110.0,
            FolderSize::Other => 40.0,
        },
        _ => 20.0,
    }
}

fn secondary_type_penalty(secondary_types: &[String]) -> f64 {
    secondary_types
        .iter()
        .filter(|t| {
            let t = t.to_ascii_lowercase();
            t == "live" || t == "remix" || t == "demo"
        })
        .count() as f64
        * -15.0
}

fn format_bonus(format: Option<&str>) -> f64 {
    match format.map(str::to_ascii_lowercase).as_deref() {
        Some("cd") | Some("digital media") => 10.0,
        Some("vinyl") => 5.0,
        _ => 0.0,
    }
}

fn track_count_bonus(track_count: Option<u32>, size: FolderSize, music_files_in_folder: u32) -> f64 {
    let Some(track_count) = track_count else {
        return 0.0;
    };
    let diff = (track_count as i64 - music_files_in_folder as i64).unsigned_abs() as f64;
    if size == FolderSize::LargeCollection {
        let base = (50.0 - 2.0 * diff).max(0.0);
        let close_ratio = track_count as f64 / music_files_in_folder.max(1) as f64;
        let bonus = if (0.8..=1.2).contains(&close_ratio) { 30.0 } else { 0.0 };
        base + bonus
    } else {
        (track_count as f64).min(20.0)
    }
}

/// Score a single release against a folder of `music_files_in_folder` files.
pub fn score_release(candidate: &ReleaseCandidate, music_files_in_folder: u32) -> f64 {
    let size = folder_size(music_files_in_folder);
    primary_type_score(candidate.primary_type.as_deref(), size, candidate.track_count, music_files_in_folder)
        + secondary_type_penalty(&candidate.secondary_types)
        + format_bonus(candidate.format.as_deref())
        + track_count_bonus(candidate.track_count, size, music_files_in_folder)
}

/// §4.5's release selection: preferred release id, else preferred release
/// group id, else score-and-rank with tie-breakers.
pub fn select_release<'a>(
    candidates: &'a [ReleaseCandidate],
    music_files_in_folder: u32,
    preferred_release_id: Option<&str>,
    preferred_release_group_id: Option<&str>,
) -> Option<&'a ReleaseCandidate> {
    if let Some(id) = preferred_release_id {
        if let Some(found) = candidates.iter().find(|c| c.release_id == id) {
            return Some(found);
        }
    }
    if let Some(rg_id) = preferred_release_group_id {
        if let Some(found) = candidates
            .iter()
            .find(|c| c.release_group_id.as_deref() == Some(rg_id))
        {
            return Some(found);
        }
    }

    let size = folder_size(music_files_in_folder);

    candidates.iter().max_by(|a, b| {
        let score_a = score_release(a, music_files_in_folder);
        let score_b = score_release(b, music_files_in_folder);
        score_a
            .partial_cmp(&score_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                // (a) smaller |trackCount - musicFilesInFolder| wins
                let diff_a = track_count_diff(a.track_count, music_files_in_folder);
                let diff_b = track_count_diff(b.track_count, music_files_in_folder);
                diff_b.cmp(&diff_a)
            })
            .then_with(|| {
                // (b) higher type score wins
                let type_a = primary_type_score(a.primary_type.as_deref(), size, a.track_count, music_files_in_folder);
                let type_b = primary_type_score(b.primary_type.as_deref(), size, b.track_count, music_files_in_folder);
                type_a.partial_cmp(&type_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                // (c) earlier release date wins
                b.release_date.cmp(&a.release_date)
            })
    })
}

fn track_count_diff(track_count: Option<u32>, music_files_in_folder: u32) -> i64 {
    match track_count {
        Some(tc) => -(tc as i64 - music_files_in_folder as i64).abs(),
        None => i64::MIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(release_id: &str, primary_type: &str, track_count: u32, format: &str) -> ReleaseCandidate {
        ReleaseCandidate {
            release_id: release_id.to_string(),
            release_group_id: Some(format!("rg-{release_id}")),
            primary_type: Some(primary_type.to_string()),
            secondary_types: vec![],
            format: Some(format.to_string()),
            track_count: Some(track_count),
            release_date: None,
        }
    }

    #[test]
    fn album_beats_single_for_large_folder() {
        let album = candidate("album", "Album", 12, "CD");
        let single = candidate("single", "Single", 2, "CD");
        let score = select_release(&[album, single], 12, None, None).unwrap();
        assert_eq!(score.release_id, "album");
    }

    #[test]
    fn preferred_release_id_wins_regardless_of_score() {
        let album = candidate("album", "Album", 12, "CD");
        let single = candidate("single", "Single", 2, "CD");
        let chosen = select_release(&[album, single], 12, Some("single"), None).unwrap();
        assert_eq!(chosen.release_id, "single");
    }

    #[test]
    fn live_secondary_type_is_penalized() {
        let mut live = candidate("live", "Album", 12, "CD");
        live.secondary_types = vec!["Live".to_string()];
        let studio = candidate("studio", "Album", 12, "CD");
        let chosen = select_release(&[live, studio], 12, None, None).unwrap();
        assert_eq!(chosen.release_id, "studio");
    }

    #[test]
    fn is_video_format_matches_case_insensitively() {
        assert!(is_video_format(Some("DVD-Video")));
        assert!(is_video_format(Some("vhs")));
        assert!(!is_video_format(Some("CD")));
        assert!(!is_video_format(None));
    }

    #[test]
    fn track_count_bonus_rewards_close_match_in_large_collection() {
        let close = track_count_bonus(Some(20), FolderSize::LargeCollection, 20);
        let far = track_count_bonus(Some(5), FolderSize::LargeCollection, 20);
        assert!(close > far);
    }
}

//! Adapter layer: Convert MusicBrainz DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! This isolates API changes - if MusicBrainz changes their response format,
//! only this file and dto.rs need to change.

use super::dto;
use crate::enrichment::release_selection::{is_video_format, ReleaseCandidate};
use crate::model::{CandidateRelease, CandidateReleaseGroup, TrackMetadata};

/// Build a combined artist string from artist credits, honoring join phrases
/// (e.g. `"Queen & David Bowie"`).
pub fn build_artist_string(credits: &[dto::ArtistCredit]) -> Option<String> {
    if credits.is_empty() {
        return None;
    }
    let mut result = String::new();
    for credit in credits {
        let name = credit.name.as_ref().unwrap_or(&credit.artist.name);
        result.push_str(name);
        if let Some(ref join) = credit.joinphrase {
            result.push_str(join);
        }
    }
    Some(result)
}

/// Flatten a recording's releases into scoring candidates for §4.5.
pub fn to_release_candidates(response: &dto::RecordingResponse) -> Vec<ReleaseCandidate> {
    response
        .releases
        .iter()
        .map(|release| {
            let rg = release.release_group.as_ref();
            ReleaseCandidate {
                release_id: release.id.clone(),
                release_group_id: rg.map(|rg| rg.id.clone()),
                primary_type: rg.and_then(|rg| rg.primary_type.clone()),
                secondary_types: rg.map(|rg| rg.secondary_types.clone()).unwrap_or_default(),
                format: release.media.first().and_then(|m| m.format.clone()),
                track_count: release.media.first().and_then(|m| m.track_count),
                release_date: release.date.clone(),
            }
        })
        .collect()
}

/// Build `TrackMetadata` for `recording` once a release has been chosen (via
/// `release_selection::select_release`). Resolves `disc_no`/`track_no` by
/// matching `recording.id` against the release's track listing; if no track
/// carries a matching recording id and `file_duration_sec` is given, falls
/// back to the unique (or closest) track within ±2 s, updating
/// `recording_id`/`title` from that track instead.
pub fn to_track_metadata(
    response: &dto::RecordingResponse,
    release: &dto::Release,
    file_duration_sec: Option<u32>,
) -> TrackMetadata {
    let artist = build_artist_string(&response.artist_credit);
    let mut recording_id = Some(response.id.clone());
    let mut title = Some(response.title.clone());
    let mut disc_no = None;
    let mut track_no = None;

    if let Some((medium, track)) = find_track_by_recording_id(release, &response.id) {
        disc_no = medium.position;
        track_no = track.position;
    } else if let Some(duration) = file_duration_sec {
        if let Some((medium, track)) = find_closest_track_by_duration(release, duration, 2) {
            disc_no = medium.position;
            track_no = track.position;
            if let Some(r) = &track.recording {
                recording_id = Some(r.id.clone());
            }
            if let Some(t) = &track.title {
                title = Some(t.clone());
            }
        }
    }

    let rg = release.release_group.as_ref();
    TrackMetadata {
        recording_id,
        title,
        artist,
        album_artist: rg.and_then(|rg| build_artist_string(&rg.artist_credit)),
        album: Some(release.title.clone()),
        release_group_id: rg.map(|rg| rg.id.clone()),
        release_id: Some(release.id.clone()),
        release_date: release.date.clone().or_else(|| rg.and_then(|rg| rg.first_release_date.clone())),
        track_count: release.media.first().and_then(|m| m.track_count),
        disc_no,
        track_no,
        genres: Vec::new(),
        composer: None,
        lyricist: None,
        lyrics: None,
        cover_art_url: None,
        score: 1.0,
    }
}

fn find_track_by_recording_id<'a>(
    release: &'a dto::Release,
    recording_id: &str,
) -> Option<(&'a dto::Medium, &'a dto::Track)> {
    for medium in &release.media {
        for track in &medium.tracks {
            if track.recording.as_ref().map(|r| r.id.as_str()) == Some(recording_id) {
                return Some((medium, track));
            }
        }
    }
    None
}

fn find_closest_track_by_duration(
    release: &dto::Release,
    file_duration_sec: u32,
    tolerance_sec: u32,
) -> Option<(&dto::Medium, &dto::Track)> {
    let mut best: Option<(&dto::Medium, &dto::Track, u32)> = None;
    for medium in &release.media {
        for track in &medium.tracks {
            let Some(length_ms) = track.length else { continue };
            let track_sec = (length_ms / 1000) as u32;
            let diff = track_sec.abs_diff(file_duration_sec);
            if diff <= tolerance_sec {
                match &best {
                    Some((_, _, best_diff)) if *best_diff <= diff => {}
                    _ => best = Some((medium, track, diff)),
                }
            }
        }
    }
    best.map(|(m, t, _)| (m, t))
}

/// Convert a release browse entry into the ordered duration sequence used by
/// `DurationSequenceMatcher`, skipping video media entirely.
pub fn to_candidate_release(release: &dto::Release) -> Option<CandidateRelease> {
    let rg = release.release_group.as_ref()?;
    let durations: Vec<u32> = release
        .media
        .iter()
        .filter(|m| !is_video_format(m.format.as_deref()))
        .flat_map(|m| &m.tracks)
        .filter(|t| !t.recording.as_ref().and_then(|r| r.video).unwrap_or(false))
        .filter_map(|t| t.length.map(|ms| (ms / 1000) as u32))
        .collect();

    Some(CandidateRelease {
        release_group_id: rg.id.clone(),
        release_id: release.id.clone(),
        title: release.title.clone(),
        album_artist: build_artist_string(&rg.artist_credit).unwrap_or_default(),
        durations,
        media_format: release.media.first().and_then(|m| m.format.clone()),
    })
}

/// Convert a `searchAlbum` result into a candidate release group.
pub fn to_candidate_release_group(result: &dto::ReleaseGroupSearchResult) -> CandidateReleaseGroup {
    CandidateReleaseGroup {
        release_group_id: result.id.clone(),
        title: result.title.clone(),
        album_artist: build_artist_string(&result.artist_credit).unwrap_or_default(),
        track_count: None,
    }
}

/// `forceTrackFromLockedAlbum`: find the track within `tolerance_sec` of
/// `duration_sec` on `release`, and build `TrackMetadata` from it (title
/// comes straight from the track; artist from the release group).
pub fn force_track_metadata(release: &dto::Release, duration_sec: u32, tolerance_sec: u32) -> Option<TrackMetadata> {
    let (medium, track) = find_closest_track_by_duration(release, duration_sec, tolerance_sec)?;
    let rg = release.release_group.as_ref();
    Some(TrackMetadata {
        recording_id: track.recording.as_ref().map(|r| r.id.clone()),
        title: track.title.clone(),
        artist: rg.and_then(|rg| build_artist_string(&rg.artist_credit)),
        album_artist: rg.and_then(|rg| build_artist_string(&rg.artist_credit)),
        album: Some(release.title.clone()),
        release_group_id: rg.map(|rg| rg.id.clone()),
        release_id: Some(release.id.clone()),
        release_date: release.date.clone(),
        track_count: medium.track_count,
        disc_no: medium.position,
        track_no: track.position,
        genres: Vec::new(),
        composer: None,
        lyricist: None,
        lyrics: None,
        cover_art_url: None,
        score: 1.0,
    })
}

//! Adapter layer: convert AcoustID DTOs to domain models.
//!
//! This is the ONLY place where DTO types are converted to domain types. If
//! AcoustID changes their response format, only this file and `dto.rs` need
//! to change.

use super::dto;
use crate::enrichment::domain::{EnrichmentError, FingerprintLookup, FingerprintMatch, FingerprintRecording};
use crate::model::CandidateReleaseGroup;

/// Convert an AcoustID lookup response into `lookupByFingerprint`'s contract
/// (§4.4): `{status, results: [{score, acoustId, recordings[]}]}`.
pub fn to_lookup(response: dto::LookupResponse) -> Result<FingerprintLookup, EnrichmentError> {
    if response.status != "ok" {
        let error = response.error.unwrap_or(dto::ApiError {
            code: -1,
            message: "unknown error".to_string(),
        });
        return Err(EnrichmentError::ApiError(error.message));
    }

    let results = response.results.into_iter().map(convert_result).collect();
    Ok(FingerprintLookup {
        status: response.status,
        results,
    })
}

fn convert_result(result: dto::LookupResult) -> FingerprintMatch {
    FingerprintMatch {
        acoustid: result.id,
        score: result.score as f64,
        recordings: result.recordings.into_iter().map(convert_recording).collect(),
    }
}

fn convert_recording(recording: dto::Recording) -> FingerprintRecording {
    let artist = recording.artists.first().map(|a| a.name.clone());
    FingerprintRecording {
        id: recording.id,
        title: recording.title,
        artist,
        duration: recording.duration,
        release_groups: recording
            .releasegroups
            .into_iter()
            .map(|rg| CandidateReleaseGroup {
                release_group_id: rg.id,
                title: rg.title.unwrap_or_default(),
                album_artist: rg
                    .artists
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_default(),
                track_count: None,
            })
            .collect(),
    }
}

/// Pick the highest-scoring match in a lookup's result set.
pub fn best_match(lookup: &FingerprintLookup) -> Option<&FingerprintMatch> {
    lookup
        .results
        .iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(status: &str, results: Vec<dto::LookupResult>) -> dto::LookupResponse {
        dto::LookupResponse {
            status: status.to_string(),
            results,
            error: None,
        }
    }

    fn make_result(id: &str, score: f32, recordings: Vec<dto::Recording>) -> dto::LookupResult {
        dto::LookupResult {
            id: id.to_string(),
            score,
            recordings,
        }
    }

    fn make_recording(id: &str, title: Option<&str>) -> dto::Recording {
        dto::Recording {
            id: id.to_string(),
            title: title.map(String::from),
            duration: None,
            artists: vec![],
            releases: vec![],
            releasegroups: vec![],
        }
    }

    #[test]
    fn converts_successful_response() {
        let response = make_response(
            "ok",
            vec![make_result("aid-1", 0.9, vec![make_recording("mbid-1", Some("Test Song"))])],
        );
        let lookup = to_lookup(response).unwrap();
        assert_eq!(lookup.results.len(), 1);
        assert_eq!(lookup.results[0].recordings[0].title.as_deref(), Some("Test Song"));
    }

    #[test]
    fn converts_error_response() {
        let response = dto::LookupResponse {
            status: "error".to_string(),
            results: vec![],
            error: Some(dto::ApiError {
                code: 4,
                message: "rate limit".to_string(),
            }),
        };
        let result = to_lookup(response);
        assert!(matches!(result, Err(EnrichmentError::ApiError(_))));
    }

    #[test]
    fn recording_preserves_id_with_no_title() {
        let response = make_response("ok", vec![make_result("aid", 0.5, vec![make_recording("mbid-bare", None)])]);
        let lookup = to_lookup(response).unwrap();
        assert_eq!(lookup.results[0].recordings[0].id, "mbid-bare");
        assert!(lookup.results[0].recordings[0].title.is_none());
    }

    #[test]
    fn best_match_picks_highest_score() {
        let lookup = FingerprintLookup {
            status: "ok".to_string(),
            results: vec![
                FingerprintMatch { acoustid: "a".to_string(), score: 0.5, recordings: vec![] },
                FingerprintMatch { acoustid: "b".to_string(), score: 0.9, recordings: vec![] },
            ],
        };
        assert_eq!(best_match(&lookup).unwrap().acoustid, "b");
    }
}

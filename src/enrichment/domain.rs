//! Internal domain models shared across the enrichment clients.
//!
//! These types are OURS - they don't change when external APIs change. Each
//! client's `adapter.rs` is the only place a DTO gets converted into one of
//! these (or into [`crate::model::TrackMetadata`] / [`crate::model::CandidateReleaseGroup`]
//! directly, for the richer operations).

use crate::model::CandidateReleaseGroup;

/// Audio fingerprint for a track, as produced by `fingerprint::generate`.
#[derive(Debug, Clone)]
pub struct AudioFingerprint {
    pub fingerprint: String,
    pub duration_secs: u32,
}

/// Result of `MetadataAdapter::lookup_by_fingerprint` (§4.4).
#[derive(Debug, Clone, Default)]
pub struct FingerprintLookup {
    pub status: String,
    pub results: Vec<FingerprintMatch>,
}

/// One AcoustID result: its own match score plus every recording it maps to.
#[derive(Debug, Clone)]
pub struct FingerprintMatch {
    pub acoustid: String,
    pub score: f64,
    pub recordings: Vec<FingerprintRecording>,
}

/// A single recording returned by AcoustID. `id` survives even when
/// `title`/`artist` are missing — it is later resolvable via
/// `getRecordingById`.
#[derive(Debug, Clone)]
pub struct FingerprintRecording {
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<f64>,
    pub release_groups: Vec<CandidateReleaseGroup>,
}

/// Errors that can occur during enrichment, across all three services plus
/// fingerprinting.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    #[error("failed to generate fingerprint: {0}")]
    FingerprintFailed(String),

    #[error("fpcalc binary not available: {0}")]
    FingerprintUnavailable(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("no matches found")]
    NoMatches,

    #[error("rate limited - try again later")]
    RateLimited,

    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    #[error("API contract violation: expected {expected}, got {actual}")]
    ContractViolation { expected: String, actual: String },
}

impl EnrichmentError {
    /// Whether this failure is worth retrying at the transport level
    /// (§4.4: "non-2xx responses except 404 are not retried; 404 is a clean
    /// miss"). `NoMatches`/`InvalidResponse`/`Parse`/`ContractViolation` are
    /// never transport failures.
    pub fn is_retryable_transport_error(&self) -> bool {
        matches!(self, EnrichmentError::Network(_) | EnrichmentError::RateLimited)
    }
}

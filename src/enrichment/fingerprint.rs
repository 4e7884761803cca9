//! Audio fingerprint generation using Chromaprint/fpcalc (C2).
//!
//! This module shells out to the `fpcalc` command-line tool (part of
//! Chromaprint) to generate audio fingerprints. This approach is more
//! reliable than Rust bindings and works on all platforms where fpcalc is
//! installed.
//!
//! Install fpcalc:
//! - Windows: `winget install AcoustID.Chromaprint` or https://acoustid.org/chromaprint
//! - macOS: `brew install chromaprint`
//! - Linux: `apt install libchromaprint-tools` or equivalent

use std::path::Path;
use std::process::Command;

use crate::enrichment::domain::{AudioFingerprint, EnrichmentError};

#[cfg(windows)]
const FPCALC_PATHS: &[&str] = &[
    "fpcalc",
    r"C:\Program Files\Chromaprint\fpcalc.exe",
    r"C:\Program Files\MusicBrainz Picard\fpcalc.exe",
    r"C:\Program Files (x86)\Chromaprint\fpcalc.exe",
    r"C:\Program Files (x86)\MusicBrainz Picard\fpcalc.exe",
];

#[cfg(not(windows))]
const FPCALC_PATHS: &[&str] = &[
    "fpcalc",
    "/usr/bin/fpcalc",
    "/usr/local/bin/fpcalc",
    "/opt/homebrew/bin/fpcalc",
];

fn find_fpcalc() -> Option<&'static str> {
    FPCALC_PATHS
        .iter()
        .find(|&path| {
            Command::new(path)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .map(|v| v as _)
}

fn require_fpcalc() -> Result<&'static str, EnrichmentError> {
    find_fpcalc().ok_or_else(|| {
        EnrichmentError::FingerprintUnavailable(
            "fpcalc not found. Install Chromaprint: https://acoustid.org/chromaprint".to_string(),
        )
    })
}

/// `fingerprint(path) → (durationSec, fingerprintStr)` via `fpcalc -json`.
pub fn generate(path: &Path) -> Result<AudioFingerprint, EnrichmentError> {
    let fpcalc = require_fpcalc()?;

    let output = Command::new(fpcalc)
        .arg("-json")
        .arg(path)
        .output()
        .map_err(|e| EnrichmentError::FingerprintFailed(format!("failed to run fpcalc: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EnrichmentError::FingerprintFailed(format!(
            "fpcalc failed: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_fpcalc_json(&stdout)
}

/// `duration(path) → durationSec` via `fpcalc -json -length 0` (no fingerprint).
pub fn duration(path: &Path) -> Result<u32, EnrichmentError> {
    let fpcalc = require_fpcalc()?;

    let output = Command::new(fpcalc)
        .arg("-json")
        .arg("-length")
        .arg("0")
        .arg(path)
        .output()
        .map_err(|e| EnrichmentError::FingerprintFailed(format!("failed to run fpcalc: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EnrichmentError::FingerprintFailed(format!(
            "fpcalc failed: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: DurationOnlyOutput = serde_json::from_str(&stdout)
        .map_err(|e| EnrichmentError::FingerprintFailed(format!("failed to parse fpcalc output: {e}")))?;
    Ok(parsed.duration.round() as u32)
}

/// `batchDurations(paths[]) → durations[]` preserving order; a path whose
/// duration can't be determined is skipped (logged as a warning), not
/// treated as fatal for the batch.
pub fn batch_durations(paths: &[std::path::PathBuf]) -> Vec<Option<u32>> {
    paths
        .iter()
        .map(|path| match duration(path) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not determine duration");
                None
            }
        })
        .collect()
}

fn parse_fpcalc_json(json: &str) -> Result<AudioFingerprint, EnrichmentError> {
    let parsed: FpcalcOutput = serde_json::from_str(json)
        .map_err(|e| EnrichmentError::FingerprintFailed(format!("failed to parse fpcalc output: {e}")))?;

    Ok(AudioFingerprint {
        fingerprint: parsed.fingerprint,
        duration_secs: parsed.duration.round() as u32,
    })
}

#[derive(serde::Deserialize)]
struct FpcalcOutput {
    fingerprint: String,
    duration: f64,
}

#[derive(serde::Deserialize)]
struct DurationOnlyOutput {
    duration: f64,
}

/// Check if fpcalc is available on the system.
pub fn is_available() -> bool {
    find_fpcalc().is_some()
}

/// Get fpcalc version string (for `check-tools` diagnostics).
pub fn version() -> Option<String> {
    let fpcalc = find_fpcalc()?;
    Command::new(fpcalc)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

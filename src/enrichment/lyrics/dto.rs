//! lrclib.net API Data Transfer Objects
//!
//! These types match EXACTLY what lrclib returns. DO NOT use these types
//! outside the lyrics module - convert to domain types in adapter.rs.
//!
//! API Reference: https://lrclib.net/docs

use serde::{Deserialize, Serialize};

/// `GET /api/get` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GetResponse {
    pub id: i64,
    #[serde(rename = "trackName")]
    pub track_name: String,
    #[serde(rename = "artistName")]
    pub artist_name: String,
    #[serde(rename = "albumName")]
    pub album_name: Option<String>,
    pub duration: Option<f64>,
    pub instrumental: bool,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[test]
    fn test_parse_synced_response() {
        let json = r#"{
            "id": 1,
            "trackName": "Test Song",
            "artistName": "Test Artist",
            "albumName": "Test Album",
            "duration": 180.5,
            "instrumental": false,
            "plainLyrics": "line one\nline two",
            "syncedLyrics": "[00:01.00]line one\n[00:05.00]line two"
        }"#;

        let response: GetResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(response.track_name, "Test Song");
        assert!(response.synced_lyrics.is_some());
    }

    #[test]
    fn test_parse_instrumental_response() {
        let json = r#"{
            "id": 2,
            "trackName": "Intro",
            "artistName": "Test Artist",
            "albumName": null,
            "duration": null,
            "instrumental": true,
            "plainLyrics": null,
            "syncedLyrics": null
        }"#;

        let response: GetResponse = serde_json::from_str(json).expect("should parse");
        assert!(response.instrumental);
        assert!(response.plain_lyrics.is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{"code": 404, "message": "Tracks not found"}"#;
        let error: ErrorResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(error.code, 404);
    }
}

//! Lyrics lookup via lrclib.net
//!
//! Optional enrichment: a missing or failed lookup never fails the pipeline,
//! it just leaves `TrackMetadata::lyrics` unset.

mod client;
pub mod dto;

pub use client::LyricsClient;

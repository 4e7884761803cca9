//! CoverArtResolver (C5): five-tier cover art fallback chain.
//!
//! 1. Per-folder memo (cheapest — already resolved this folder this run)
//! 2. Per-release-group persistent disk cache
//! 3. Remote fetch from the Cover Art Archive, compressed and cached
//! 4. Artwork embedded in the audio file's own tags
//! 5. A sidecar image file (`cover.jpg`, `folder.png`, ...) in the album root

mod cache;
pub mod compress;
mod embedded;
mod resolver;
mod sidecar;

pub use cache::CoverCache;
pub use embedded::extract_embedded_cover;
pub use resolver::CoverArtResolver;
pub use sidecar::find_sidecar_cover;

/// Resolved cover art, ready to embed or re-serve.
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: String,
}

//! Music enrichment module - identifies tracks and fetches metadata from external services.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Internal types that represent our business logic
//! - **API DTOs** (`acoustid/dto.rs`, `musicbrainz/dto.rs`, `coverart/dto.rs`, `lyrics/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - HTTP clients for external APIs
//! - **Fingerprint** - Audio fingerprint generation via fpcalc
//! - **Release selection** (`release_selection.rs`) - Scoring table that picks one release among a recording's editions
//! - **Duration matcher** (`duration_matcher.rs`) - DTW-based duration-sequence matching
//! - **Quick scanner** (`quick_scanner.rs`) - Cheap folder-name-driven album identification
//! - **Service** (`service.rs`) - `MetadataAdapter`, the facade the rest of the pipeline calls
//!
//! This decoupling means:
//! 1. API changes don't ripple through our codebase
//! 2. We can test API contracts independently
//! 3. We can swap providers without changing business logic
//!
//! # Usage
//!
//! ```ignore
//! use enrichment::{MetadataAdapter, EnrichmentConfig};
//!
//! let config = EnrichmentConfig {
//!     acoustid_api_key: "your-api-key".to_string(),
//!     musicbrainz_user_agent: "music-curator/0.1 ( you@example.com )".to_string(),
//! };
//! let adapter = MetadataAdapter::new(&config);
//!
//! let lookup = adapter.lookup_by_fingerprint(&fingerprint).await?;
//! ```

pub mod acoustid;
pub mod coverart;
pub mod domain;
pub mod duration_matcher;
pub mod fingerprint;
pub mod lyrics;
pub mod musicbrainz;
pub mod quick_scanner;
pub mod release_selection;
pub mod service;
pub mod traits;

pub use coverart::{CoverArt, CoverArtClient, CoverSize};
pub use domain::{AudioFingerprint, EnrichmentError, FingerprintLookup, FingerprintMatch, FingerprintRecording};
pub use lyrics::LyricsClient;
pub use quick_scanner::{AlbumSearchSource, QuickScanResult};
pub use service::{EnrichmentConfig, MetadataAdapter};
pub use traits::{AcoustIdApi, CoverArtApi, LyricsApi, MusicBrainzApi};

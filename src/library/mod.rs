//! Library processing services (C6, C7, C10, C11, C12): the shared,
//! long-lived state a running daemon builds once and hands to the scanner's
//! dispatcher.

pub mod album_cache;
pub mod batch_writer;
pub mod failed_handler;
pub mod processor;

use std::sync::Arc;

use crate::config::Config;
use crate::cover::CoverArtResolver;
use crate::db;
use crate::enrichment::{EnrichmentConfig, MetadataAdapter};
use crate::error::Result;

pub use album_cache::FolderAlbumCache;
pub use batch_writer::BatchWriter;
pub use failed_handler::FailedFileHandler;
pub use processor::AudioFileProcessor;

/// Everything `AudioFileProcessor` needs, built once at startup and shared
/// (via `Arc`) across every dispatched file.
pub struct LibraryServices {
    pub processor: Arc<AudioFileProcessor>,
    pub album_cache: Arc<FolderAlbumCache>,
    pub batch_writer: Arc<BatchWriter>,
    pub failed_handler: Arc<FailedFileHandler>,
}

impl LibraryServices {
    pub async fn build(config: Arc<Config>) -> Result<Self> {
        let store = db::build_store(&config).await.map_err(|e| crate::error::Error::Config(e.to_string()))?;

        let enrichment_config = EnrichmentConfig {
            acoustid_api_key: config.acoustid.api_key.clone().unwrap_or_default(),
            musicbrainz_user_agent: config.musicbrainz.user_agent.clone(),
        };
        let metadata_adapter = Arc::new(MetadataAdapter::new(&enrichment_config));

        let cover_cache_dir = config.cache.cover_art_directory.clone().unwrap_or_else(|| {
            crate::config::config_dir().unwrap_or_else(std::env::temp_dir).join("cover-cache")
        });
        let cover_resolver = Arc::new(CoverArtResolver::new(cover_cache_dir));

        let album_cache = Arc::new(FolderAlbumCache::new());
        let batch_writer =
            Arc::new(BatchWriter::new(config.clone(), store.clone(), cover_resolver.clone(), album_cache.clone()));
        let failed_handler = Arc::new(FailedFileHandler::new(config.clone(), store.clone(), cover_resolver.clone()));

        let processor = Arc::new(AudioFileProcessor::new(
            config,
            store,
            metadata_adapter,
            album_cache.clone(),
            cover_resolver,
            batch_writer.clone(),
            failed_handler.clone(),
        ));

        Ok(Self { processor, album_cache, batch_writer, failed_handler })
    }
}

//! CoverArtResolver (C5): the five-tier fallback chain described in §4.9.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::enrichment::coverart::CoverArtClient;

use super::cache::CoverCache;
use super::compress;
use super::embedded::extract_embedded_cover;
use super::sidecar::find_sidecar_cover;
use super::CoverArt;

/// Per-folder memo + per-release-group persistent cache, backed by a
/// Cover Art Archive client for the remote tiers.
pub struct CoverArtResolver {
    folder_memo: Mutex<HashMap<PathBuf, CoverArt>>,
    release_group_cache: CoverCache,
    client: CoverArtClient,
}

impl CoverArtResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            folder_memo: Mutex::new(HashMap::new()),
            release_group_cache: CoverCache::new(cache_dir),
            client: CoverArtClient::new(),
        }
    }

    /// Resolve cover art for one file per the five-tier chain. `folder` is
    /// the album root (used for the memo and the sidecar search);
    /// `audio_path` is the specific file (used for embedded-tag extraction).
    pub async fn resolve(
        &self,
        folder: &Path,
        audio_path: &Path,
        is_loose_file: bool,
        locked_release_group_id: Option<&str>,
        metadata_cover_url: Option<&str>,
    ) -> Option<CoverArt> {
        // Tier 0: per-folder memo.
        if !is_loose_file
            && let Some(cover) = self.folder_memo.lock().unwrap().get(folder).cloned()
        {
            return Some(cover);
        }

        // Tier 0.5: per-release-group persistent cache.
        if let Some(rg) = locked_release_group_id
            && let Some(cover) = self.release_group_cache.get(rg)
        {
            self.memoize(folder, is_loose_file, &cover);
            return Some(cover);
        }

        // Tier 1: locked release group present, fetch + compress + cache both levels.
        if let Some(rg) = locked_release_group_id
            && let Some(cover) = self.fetch_and_cache_for_release_group(rg, folder, is_loose_file).await
        {
            return Some(cover);
        }

        // Tier 1': no lock but the file's own metadata already carries a cover URL.
        if locked_release_group_id.is_none()
            && let Some(url) = metadata_cover_url
            && let Some(cover) = self.download_and_memoize(url, folder, is_loose_file).await
        {
            return Some(cover);
        }

        // Tier 2: artwork embedded in the file itself.
        if let Some(cover) = extract_embedded_cover(audio_path)
            && let Ok(compressed) = compress::compress(&cover.data, &cover.mime_type)
        {
            return Some(CoverArt { data: compressed.data, mime_type: compressed.mime_type });
        }

        // Tier 3: sidecar image file in the album root.
        if let Some(cover) = find_sidecar_cover(audio_path)
            && let Ok(compressed) = compress::compress(&cover.data, &cover.mime_type)
        {
            return Some(CoverArt { data: compressed.data, mime_type: compressed.mime_type });
        }

        None
    }

    /// Tier 0.5/1 only, with no embedded/sidecar fallback: fetch (or recall)
    /// the authoritative cover for a locked release group. Used by
    /// `BatchWriter` to stamp every pending file in a folder with the same
    /// album art.
    pub async fn get_cover_art_by_release_group_id(&self, release_group_id: &str, folder: &Path) -> Option<CoverArt> {
        if let Some(cover) = self.release_group_cache.get(release_group_id) {
            self.memoize(folder, false, &cover);
            return Some(cover);
        }
        self.fetch_and_cache_for_release_group(release_group_id, folder, false).await
    }

    async fn fetch_and_cache_for_release_group(
        &self,
        release_group_id: &str,
        folder: &Path,
        is_loose_file: bool,
    ) -> Option<CoverArt> {
        let url = self.client.front_cover_url_for_release_group(release_group_id).await.ok()??;
        let downloaded = self.client.download(&url).await.ok()?;
        let compressed = compress::compress(&downloaded.data, &downloaded.mime_type).ok()?;
        let cover = CoverArt { data: compressed.data, mime_type: compressed.mime_type };
        let _ = self.release_group_cache.put(release_group_id, &cover);
        self.memoize(folder, is_loose_file, &cover);
        Some(cover)
    }

    async fn download_and_memoize(&self, url: &str, folder: &Path, is_loose_file: bool) -> Option<CoverArt> {
        let downloaded = self.client.download(url).await.ok()?;
        let compressed = compress::compress(&downloaded.data, &downloaded.mime_type).ok()?;
        let cover = CoverArt { data: compressed.data, mime_type: compressed.mime_type };
        self.memoize(folder, is_loose_file, &cover);
        Some(cover)
    }

    fn memoize(&self, folder: &Path, is_loose_file: bool, cover: &CoverArt) {
        if !is_loose_file {
            self.folder_memo.lock().unwrap().insert(folder.to_path_buf(), cover.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn falls_back_to_sidecar_when_nothing_else_resolves() {
        let temp = TempDir::new().unwrap();
        let audio_path = temp.path().join("track.mp3");
        std::fs::write(&audio_path, b"fake audio").unwrap();
        std::fs::write(temp.path().join("cover.jpg"), b"cover bytes").unwrap();

        let resolver = CoverArtResolver::new(temp.path().join("cache"));
        let cover = resolver.resolve(temp.path(), &audio_path, false, None, None).await.unwrap();
        assert_eq!(cover.data, b"cover bytes");
    }

    #[tokio::test]
    async fn returns_none_when_no_tier_resolves() {
        let temp = TempDir::new().unwrap();
        let audio_path = temp.path().join("track.mp3");
        std::fs::write(&audio_path, b"fake audio").unwrap();

        let resolver = CoverArtResolver::new(temp.path().join("cache"));
        let cover = resolver.resolve(temp.path(), &audio_path, false, None, None).await;
        assert!(cover.is_none());
    }

    #[tokio::test]
    async fn release_group_cache_hit_populates_folder_memo() {
        let temp = TempDir::new().unwrap();
        let audio_path = temp.path().join("track.mp3");
        std::fs::write(&audio_path, b"fake audio").unwrap();

        let resolver = CoverArtResolver::new(temp.path().join("cache"));
        resolver
            .release_group_cache
            .put("rg-1", &CoverArt { data: b"rg cover".to_vec(), mime_type: "image/jpeg".to_string() })
            .unwrap();

        let cover = resolver.resolve(temp.path(), &audio_path, false, Some("rg-1"), None).await.unwrap();
        assert_eq!(cover.data, b"rg cover");
        assert!(resolver.folder_memo.lock().unwrap().contains_key(temp.path()));
    }

    #[tokio::test]
    async fn loose_files_skip_the_folder_memo() {
        let temp = TempDir::new().unwrap();
        let audio_path = temp.path().join("track.mp3");
        std::fs::write(&audio_path, b"fake audio").unwrap();

        let resolver = CoverArtResolver::new(temp.path().join("cache"));
        resolver
            .release_group_cache
            .put("rg-1", &CoverArt { data: b"rg cover".to_vec(), mime_type: "image/jpeg".to_string() })
            .unwrap();

        let cover = resolver.resolve(temp.path(), &audio_path, true, Some("rg-1"), None).await.unwrap();
        assert_eq!(cover.data, b"rg cover");
        assert!(!resolver.folder_memo.lock().unwrap().contains_key(temp.path()));
    }
}

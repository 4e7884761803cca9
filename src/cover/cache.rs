//! Tier 0.5: the persistent per-release-group cover art cache.
//!
//! Keyed by MusicBrainz release-group ID so every track in an album shares
//! one cached image regardless of which file first resolved it.

use std::fs;
use std::path::PathBuf;

use super::CoverArt;

pub struct CoverCache {
    cache_dir: PathBuf,
}

impl CoverCache {
    /// `cache_dir` is `config::CacheConfig::cover_art_directory`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let _ = fs::create_dir_all(&cache_dir);
        Self { cache_dir }
    }

    pub fn get(&self, release_group_id: &str) -> Option<CoverArt> {
        let path = self.cache_path(release_group_id);
        if !path.exists() {
            return None;
        }
        let data = fs::read(&path).ok()?;
        let mime_type = match path.extension().and_then(|s| s.to_str()) {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        Some(CoverArt { data, mime_type: mime_type.to_string() })
    }

    pub fn put(&self, release_group_id: &str, cover: &CoverArt) -> std::io::Result<PathBuf> {
        let ext = match cover.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        };
        let path = self.cache_dir.join(format!("{release_group_id}.{ext}"));
        fs::write(&path, &cover.data)?;
        Ok(path)
    }

    pub fn contains(&self, release_group_id: &str) -> bool {
        self.cache_path(release_group_id).exists()
    }

    fn cache_path(&self, release_group_id: &str) -> PathBuf {
        for ext in ["jpg", "png", "webp"] {
            let candidate = self.cache_dir.join(format!("{release_group_id}.{ext}"));
            if candidate.exists() {
                return candidate;
            }
        }
        self.cache_dir.join(format!("{release_group_id}.jpg"))
    }

    pub fn clear(&self) -> std::io::Result<()> {
        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    pub fn size_bytes(&self) -> u64 {
        if !self.cache_dir.exists() {
            return 0;
        }
        fs::read_dir(&self.cache_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cover(data: &[u8]) -> CoverArt {
        CoverArt { data: data.to_vec(), mime_type: "image/jpeg".to_string() }
    }

    #[test]
    fn put_and_get_round_trips() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());

        cache.put("rg-1", &cover(b"fake jpeg data")).unwrap();
        let cached = cache.get("rg-1").unwrap();
        assert_eq!(cached.data, b"fake jpeg data");
        assert_eq!(cached.mime_type, "image/jpeg");
    }

    #[test]
    fn miss_returns_none() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn contains_reflects_put() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());
        assert!(!cache.contains("rg-2"));
        cache.put("rg-2", &cover(&[1, 2, 3])).unwrap();
        assert!(cache.contains("rg-2"));
    }

    #[test]
    fn clear_removes_all_entries() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());
        cache.put("rg-1", &cover(&[1])).unwrap();
        cache.put("rg-2", &cover(&[2])).unwrap();
        cache.clear().unwrap();
        assert!(!cache.contains("rg-1"));
        assert!(!cache.contains("rg-2"));
    }

    #[test]
    fn size_bytes_sums_cached_files() {
        let temp = TempDir::new().unwrap();
        let cache = CoverCache::new(temp.path());
        assert_eq!(cache.size_bytes(), 0);
        cache.put("rg-1", &cover(&[0; 1000])).unwrap();
        assert_eq!(cache.size_bytes(), 1000);
    }
}

//! Tier 3: a sidecar image file in the album root.
//!
//! §4.9: "look in the album root for `{cover,folder,album,front}.{jpg,jpeg,
//! png,webp}` in that order."

use std::path::Path;

use super::CoverArt;

const COVER_FILENAMES: &[&str] = &["cover", "folder", "album", "front"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Look for a sidecar cover file next to `audio_path`, trying the exact
/// (name, extension) combinations in order before falling back to a
/// case-insensitive directory scan for the same name/extension sets.
pub fn find_sidecar_cover(audio_path: &Path) -> Option<CoverArt> {
    let parent = audio_path.parent()?;

    for name in COVER_FILENAMES {
        for ext in IMAGE_EXTENSIONS {
            let candidate = parent.join(format!("{name}.{ext}"));
            if candidate.exists() {
                return load_sidecar_cover(&candidate);
            }
        }
    }

    let entries = std::fs::read_dir(parent).ok()?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_lowercase());
        let ext = path.extension().and_then(|s| s.to_str()).map(|s| s.to_lowercase());
        if let (Some(stem), Some(ext)) = (stem, ext)
            && COVER_FILENAMES.contains(&stem.as_str())
            && IMAGE_EXTENSIONS.contains(&ext.as_str())
        {
            return load_sidecar_cover(&path);
        }
    }

    None
}

fn load_sidecar_cover(path: &Path) -> Option<CoverArt> {
    let data = std::fs::read(path).ok()?;
    let mime_type = match path.extension().and_then(|s| s.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Some(CoverArt { data, mime_type: mime_type.to_string() })
}

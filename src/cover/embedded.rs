//! Tier 2: cover art embedded in the audio file's own tags.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;

use super::CoverArt;

/// Extract the front cover from embedded tags, falling back to the first
/// picture present if no picture is tagged `CoverFront`. Returns `None` if
/// the file has no tag, no pictures, or can't be read at all.
pub fn extract_embedded_cover(path: &Path) -> Option<CoverArt> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag())?;

    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == lofty::picture::PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let mime_type = match picture.mime_type() {
        Some(lofty::picture::MimeType::Jpeg) => "image/jpeg",
        Some(lofty::picture::MimeType::Png) => "image/png",
        Some(lofty::picture::MimeType::Gif) => "image/gif",
        Some(lofty::picture::MimeType::Bmp) => "image/bmp",
        Some(lofty::picture::MimeType::Tiff) => "image/tiff",
        _ => "image/jpeg",
    };

    Some(CoverArt { data: picture.data().to_vec(), mime_type: mime_type.to_string() })
}

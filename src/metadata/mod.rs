//! Audio file tag reading and writing.
//!
//! Uses lofty for format-independent tag access across MP3, FLAC, OGG,
//! M4A, and WAV. `read` returns a raw snapshot of whatever tags are
//! already on disk; `write` merges an enriched [`crate::model::TrackMetadata`]
//! into those tags (step 10 of the per-file pipeline: "merge with existing
//! source tags" rather than blindly overwrite) and optionally embeds cover
//! art.

use std::path::Path;

use lofty::config::WriteOptions as LoftyWriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};

use crate::error::{Error, Result, ResultExt};
use crate::model::TrackMetadata;

/// Raw tag values already present on a file, before any enrichment is
/// merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<u32>,
    pub disc_no: Option<u32>,
    pub track_no: Option<u32>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub lyricist: Option<String>,
    pub lyrics: Option<String>,
    pub musicbrainz_recording_id: Option<String>,
    pub duration_secs: u64,
}

/// Controls how aggressively `write` overwrites tags that already have a
/// value.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Only fill tags that are currently empty; never clobber an existing value.
    pub only_fill_empty: bool,
    /// Write `MUSICBRAINZ_*` ID tags.
    pub write_musicbrainz_ids: bool,
}

/// Outcome of a `write` call.
#[derive(Debug, Clone, Default)]
pub struct WriteResult {
    pub fields_updated: usize,
    pub fields_skipped: Vec<String>,
    pub cover_embedded: bool,
}

pub fn read(path: &Path) -> Result<SourceTags> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, e.to_string()))?
        .read()
        .map_err(|e| Error::metadata(path, e.to_string()))?;

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let musicbrainz_recording_id = tag
        .and_then(|t| t.get_string(&ItemKey::MusicBrainzRecordingId))
        .map(|s| s.to_string());

    Ok(SourceTags {
        title: tag.and_then(|t| t.title()).map(|s| s.to_string()),
        artist: tag.and_then(|t| t.artist()).map(|s| s.to_string()),
        album: tag.and_then(|t| t.album()).map(|s| s.to_string()),
        album_artist: tag
            .and_then(|t| t.get_string(&ItemKey::AlbumArtist))
            .map(|s| s.to_string()),
        year: tag.and_then(|t| t.year()),
        disc_no: tag.and_then(|t| t.disk()),
        track_no: tag.and_then(|t| t.track()),
        genre: tag.and_then(|t| t.genre()).map(|s| s.to_string()),
        composer: tag.and_then(|t| t.get_string(&ItemKey::Composer)).map(|s| s.to_string()),
        lyricist: tag.and_then(|t| t.get_string(&ItemKey::Lyricist)).map(|s| s.to_string()),
        lyrics: tag.and_then(|t| t.get_string(&ItemKey::Lyrics)).map(|s| s.to_string()),
        musicbrainz_recording_id,
        duration_secs: tagged_file.properties().duration().as_secs(),
    })
}

/// Merge `metadata` into `path`'s tags and, if `cover` is given, embed it as
/// the front cover (replacing any existing front cover).
pub fn write(
    path: &Path,
    metadata: &TrackMetadata,
    cover: Option<&[u8]>,
    cover_mime: &str,
    options: &WriteOptions,
) -> Result<WriteResult> {
    let mut tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, e.to_string()))?
        .read()
        .map_err(|e| Error::metadata(path, e.to_string()))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag_mut(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file.tag_mut(tag_type).expect("tag just ensured present");

    let mut fields_updated = 0;
    let mut fields_skipped = Vec::new();
    let only_fill_empty = options.only_fill_empty;

    macro_rules! write_string {
        ($value:expr, $name:literal, $existing:expr, $set:expr) => {
            if let Some(ref v) = $value {
                let has_existing = $existing.map(|s: &str| !s.is_empty()).unwrap_or(false);
                if only_fill_empty && has_existing {
                    fields_skipped.push($name.to_string());
                } else {
                    $set(v.clone());
                    fields_updated += 1;
                }
            }
        };
    }

    write_string!(metadata.title, "title", tag.title(), |v| tag.set_title(v));
    write_string!(metadata.artist, "artist", tag.artist(), |v| tag.set_artist(v));
    write_string!(metadata.album, "album", tag.album(), |v| tag.set_album(v));

    if let Some(ref album_artist) = metadata.album_artist {
        let existing = tag.get_string(&ItemKey::AlbumArtist).map(|s| !s.is_empty()).unwrap_or(false);
        if only_fill_empty && existing {
            fields_skipped.push("album_artist".to_string());
        } else {
            tag.insert_text(ItemKey::AlbumArtist, album_artist.clone());
            fields_updated += 1;
        }
    }

    if !metadata.genres.is_empty() {
        let joined = metadata.genres.join("; ");
        let existing = tag.genre().map(|s| !s.is_empty()).unwrap_or(false);
        if only_fill_empty && existing {
            fields_skipped.push("genre".to_string());
        } else {
            tag.set_genre(joined);
            fields_updated += 1;
        }
    }

    write_string!(metadata.composer, "composer", tag.get_string(&ItemKey::Composer), |v| {
        tag.insert_text(ItemKey::Composer, v)
    });
    write_string!(metadata.lyricist, "lyricist", tag.get_string(&ItemKey::Lyricist), |v| {
        tag.insert_text(ItemKey::Lyricist, v)
    });
    write_string!(metadata.lyrics, "lyrics", tag.get_string(&ItemKey::Lyrics), |v| {
        tag.insert_text(ItemKey::Lyrics, v)
    });

    if let Some(disc_no) = metadata.disc_no {
        if !only_fill_empty || tag.disk().is_none() {
            tag.set_disk(disc_no);
            fields_updated += 1;
        } else {
            fields_skipped.push("disc_no".to_string());
        }
    }

    if let Some(track_no) = metadata.track_no {
        if !only_fill_empty || tag.track().is_none() {
            tag.set_track(track_no);
            fields_updated += 1;
        } else {
            fields_skipped.push("track_no".to_string());
        }
    }

    if let Some(ref date) = metadata.release_date {
        if let Some(year) = date.get(0..4).and_then(|y| y.parse::<u32>().ok()) {
            if !only_fill_empty || tag.year().is_none() {
                tag.set_year(year);
                fields_updated += 1;
            } else {
                fields_skipped.push("year".to_string());
            }
        }
    }

    if options.write_musicbrainz_ids {
        if let Some(ref recording_id) = metadata.recording_id {
            tag.insert_text(ItemKey::MusicBrainzRecordingId, recording_id.clone());
            fields_updated += 1;
        }
        if let Some(ref release_id) = metadata.release_id {
            tag.insert_text(ItemKey::MusicBrainzReleaseId, release_id.clone());
            fields_updated += 1;
        }
        if let Some(ref release_group_id) = metadata.release_group_id {
            tag.insert_text(ItemKey::MusicBrainzReleaseGroupId, release_group_id.clone());
            fields_updated += 1;
        }
    }

    let mut cover_embedded = false;
    if let Some(data) = cover {
        let mime = mime_from_str(cover_mime);
        let picture = Picture::new_unchecked(PictureType::CoverFront, Some(mime), None, data.to_vec());
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
        cover_embedded = true;
        fields_updated += 1;
    }

    tag.save_to_path(path, LoftyWriteOptions::default())
        .map_err(|e| Error::metadata(path, e.to_string()))?;

    Ok(WriteResult { fields_updated, fields_skipped, cover_embedded })
}

fn mime_from_str(mime: &str) -> MimeType {
    match mime {
        "image/png" => MimeType::Png,
        "image/gif" => MimeType::Gif,
        "image/bmp" => MimeType::Bmp,
        "image/tiff" => MimeType::Tiff,
        _ => MimeType::Jpeg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn read_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "This is just some text, not music.").expect("write");

        let result = read(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn read_non_existent_file_returns_error() {
        let result = read(Path::new("non_existent_file.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn write_options_default_does_not_touch_musicbrainz() {
        let options = WriteOptions::default();
        assert!(!options.only_fill_empty);
        assert!(!options.write_musicbrainz_ids);
    }

    #[test]
    fn write_result_tracks_skipped_fields() {
        let result = WriteResult {
            fields_updated: 3,
            fields_skipped: vec!["title".to_string()],
            cover_embedded: false,
        };
        assert_eq!(result.fields_updated, 3);
        assert_eq!(result.fields_skipped.len(), 1);
    }

    #[test]
    fn write_on_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "Not an audio file").expect("write");

        let metadata = TrackMetadata { title: Some("Real Title".to_string()), ..Default::default() };
        let result = write(file.path(), &metadata, None, "image/jpeg", &WriteOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn mime_from_str_defaults_to_jpeg() {
        assert!(matches!(mime_from_str("image/png"), MimeType::Png));
        assert!(matches!(mime_from_str("image/weird"), MimeType::Jpeg));
    }
}

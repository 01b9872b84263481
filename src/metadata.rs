// Unified metadata extraction over every supported tag format

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::error::ParseResult;
use crate::field_mapping::ValueConverter;
use crate::id3::{Id3v1Tag, Id3v2FrameHandler, Id3v2Section};
use crate::riff::{self, InfoEntryHandler, ListChunk, RiffChunkHandler};

/// Receives the fields discovered in a file
pub trait ContentMetadataHandler {
    fn on_last_modified(&mut self, value: DateTime<Utc>);
    fn on_title(&mut self, value: &str);
    fn on_artist(&mut self, value: &str);
    fn on_genre(&mut self, value: &str);
}

/// Tag formats probed by the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    RiffInfo,
    Id3v1,
    Id3v2,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::RiffInfo => write!(f, "RIFF INFO"),
            TagKind::Id3v1 => write!(f, "ID3v1"),
            TagKind::Id3v2 => write!(f, "ID3v2"),
        }
    }
}

/// Order in which tag formats are read. Every stage may overwrite fields
/// reported by an earlier one, so the last entry has the highest precedence.
pub const PROBE_ORDER: [TagKind; 3] = [TagKind::RiffInfo, TagKind::Id3v1, TagKind::Id3v2];

/// Report the fields of an in-memory file.
///
/// `last_modified` is always reported first. Each tag format in
/// [`PROBE_ORDER`] is then tried independently; a missing tag is not an
/// error, and a malformed one is logged and skipped.
pub fn extract_metadata<H: ContentMetadataHandler + ?Sized>(
    content: &[u8],
    last_modified: DateTime<Utc>,
    handler: &mut H,
) {
    handler.on_last_modified(last_modified);

    for kind in PROBE_ORDER {
        if let Err(e) = read_stage(kind, content, handler) {
            warn!("skipping malformed {} tag: {}", kind, e);
        }
    }
}

/// Read a file from disk and report its fields, using the file's mtime
pub fn extract_metadata_from_file<H, P>(path: P, handler: &mut H) -> io::Result<()>
where
    H: ContentMetadataHandler + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let last_modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
    let content = fs::read(path)?;

    extract_metadata(&content, last_modified, handler);
    Ok(())
}

/// Which tag formats are present in `content`, in probe order
pub fn detect_tags(content: &[u8]) -> Vec<TagKind> {
    PROBE_ORDER
        .into_iter()
        .filter(|kind| match kind {
            TagKind::RiffInfo => riff::is_wave_container(content),
            TagKind::Id3v1 => Id3v1Tag::try_parse(content).is_some(),
            TagKind::Id3v2 => Id3v2Section::try_read(content).is_some(),
        })
        .collect()
}

fn read_stage<H: ContentMetadataHandler + ?Sized>(
    kind: TagKind,
    content: &[u8],
    handler: &mut H,
) -> ParseResult<()> {
    match kind {
        TagKind::RiffInfo => {
            if riff::is_wave_container(content) {
                riff::read_all_chunks(content, &mut RiffStage(handler))?;
            }
        }
        TagKind::Id3v1 => {
            if let Some(tag) = Id3v1Tag::try_parse(content) {
                handler.on_title(&tag.title);
                handler.on_artist(&tag.artist);
                handler.on_genre(&ValueConverter::genre_id3v1_display(tag.genre));
            }
        }
        TagKind::Id3v2 => {
            if let Some(section) = Id3v2Section::try_read(content) {
                section.read_all_frames(&mut Forward(handler))?;
            }
        }
    }
    Ok(())
}

/// Feeds `INFO` lists found in a RIFF container to the handler
struct RiffStage<'h, H: ?Sized>(&'h mut H);

impl<H: ContentMetadataHandler + ?Sized> RiffChunkHandler for RiffStage<'_, H> {
    fn on_list(&mut self, chunk: &ListChunk<'_>) -> ParseResult<()> {
        match chunk.try_convert_to_info_list() {
            Some(info) => info.read_all_entries(&mut Forward(&mut *self.0)),
            None => {
                debug!("skipping non-INFO LIST chunk");
                Ok(())
            }
        }
    }
}

/// Adapts the per-format handlers onto a [`ContentMetadataHandler`]
struct Forward<'h, H: ?Sized>(&'h mut H);

impl<H: ContentMetadataHandler + ?Sized> InfoEntryHandler for Forward<'_, H> {
    fn on_name(&mut self, value: &str) {
        self.0.on_title(value);
    }
    fn on_artist(&mut self, value: &str) {
        self.0.on_artist(value);
    }
    fn on_genre(&mut self, value: &str) {
        self.0.on_genre(value);
    }
}

impl<H: ContentMetadataHandler + ?Sized> Id3v2FrameHandler for Forward<'_, H> {
    fn on_title(&mut self, title: &str) {
        self.0.on_title(title);
    }
    fn on_artist(&mut self, artist: &str) {
        self.0.on_artist(artist);
    }
    fn on_genre(&mut self, genre: &str) {
        self.0.on_genre(genre);
    }
}

/// Collected metadata fields; later reports overwrite earlier ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataFields {
    pub last_modified: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
}

impl MetadataFields {
    /// Extract every field of an in-memory file
    pub fn from_content(content: &[u8], last_modified: DateTime<Utc>) -> Self {
        let mut fields = MetadataFields::default();
        extract_metadata(content, last_modified, &mut fields);
        fields
    }

    /// Extract every field of a file on disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut fields = MetadataFields::default();
        extract_metadata_from_file(path, &mut fields)?;
        Ok(fields)
    }
}

impl ContentMetadataHandler for MetadataFields {
    fn on_last_modified(&mut self, value: DateTime<Utc>) {
        self.last_modified = Some(value);
    }
    fn on_title(&mut self, value: &str) {
        self.title = Some(value.to_string());
    }
    fn on_artist(&mut self, value: &str) {
        self.artist = Some(value.to_string());
    }
    fn on_genre(&mut self, value: &str) {
        self.genre = Some(value.to_string());
    }
}

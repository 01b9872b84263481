// ID3v2 tag implementation

use log::{debug, warn};

use crate::error::{ParseError, ParseResult};
use crate::field_mapping::{FieldMappings, StandardField};
use crate::id3::frames::{Id3v2Frame, FRAME_HEADER_SIZE};
use crate::utils::{ByteCursor, Endian};

/// Receives recognized frames while a tag is walked
pub trait Id3v2FrameHandler {
    fn on_title(&mut self, title: &str);
    fn on_artist(&mut self, artist: &str);
    fn on_genre(&mut self, genre: &str);

    fn on_unknown(&mut self, frame: &Id3v2Frame<'_>) {
        debug!("skipping ID3v2 frame {} ({} bytes, flags {:#06x})", frame.id, frame.size, frame.flags);
    }
}

/// An ID3v2 tag found at the start of a buffer
#[derive(Debug, Clone, Copy)]
pub struct Id3v2Section<'a> {
    pub minor_version: u8,
    pub patch_version: u8,
    pub flags: u8,
    /// Declared tag size, excluding the 10-byte header
    pub size: u32,
    /// Frame region: the declared tag body minus any extended header
    pub content: ByteCursor<'a>,
}

impl<'a> Id3v2Section<'a> {
    pub const HEADER_SIZE: usize = 10;
    const ID: &'static [u8; 3] = b"ID3";
    const FLAG_EXTENDED_HEADER: u8 = 0x40;

    /// Read the tag header; `None` if there is no usable ID3v2 tag
    pub fn try_read(buffer: &'a [u8]) -> Option<Self> {
        let view = ByteCursor::new(buffer);
        if !view.has_signature(0, Self::ID) {
            return None;
        }

        let version = view.read_u16(3, Endian::Big).ok()?;
        let flags = view.read_u8(5).ok()?;
        let size = decode_synchsafe(view.read_array(6).ok()?);

        let minor_version = (version >> 8) as u8;
        let patch_version = (version & 0xFF) as u8;
        if minor_version <= 2 {
            warn!("ID3v2.{} tag uses 3-character frame ids; reading best effort", minor_version);
        }

        let body = match view.slice(Self::HEADER_SIZE, size as usize) {
            Ok(body) => body,
            Err(e) => {
                warn!("ID3v2 tag size runs past the buffer: {}", e);
                return None;
            }
        };

        let content = if flags & Self::FLAG_EXTENDED_HEADER != 0 {
            match Self::skip_extended_header(&body, minor_version) {
                Ok(content) => content,
                Err(e) => {
                    warn!("unreadable ID3v2 extended header: {}", e);
                    return None;
                }
            }
        } else {
            body
        };

        Some(Id3v2Section {
            minor_version,
            patch_version,
            flags,
            size,
            content,
        })
    }

    /// v2.3 stores the extended header size excluding its own 4 bytes;
    /// v2.4 stores it synchsafe and including them
    fn skip_extended_header(body: &ByteCursor<'a>, minor_version: u8) -> ParseResult<ByteCursor<'a>> {
        let raw = body.read_array::<4>(0)?;
        let skip = if minor_version >= 4 {
            decode_synchsafe(raw) as usize
        } else {
            (u32::from_be_bytes(raw) as usize).saturating_add(4)
        };

        if skip < 4 {
            return Err(ParseError::malformed("ID3v2", format!("extended header size {}", skip)));
        }
        body.slice_from(skip)
    }

    /// ID3v2.4 encodes frame sizes as synchsafe integers; earlier versions do not
    pub fn uses_synchsafe_integers(&self) -> bool {
        self.minor_version >= 4
    }

    /// Read the frame at `at`; `None` once padding is reached
    pub fn read_frame(&self, at: usize) -> ParseResult<Option<Id3v2Frame<'a>>> {
        let id = self.content.read_fourcc(at)?;
        if id.is_zero() {
            return Ok(None);
        }

        let raw_size = self.content.read_array::<4>(at + 4)?;
        let size = if self.uses_synchsafe_integers() {
            decode_synchsafe(raw_size)
        } else {
            u32::from_be_bytes(raw_size)
        };
        let flags = self.content.read_u16(at + 8, Endian::Big)?;
        let value = self.content.slice(at + FRAME_HEADER_SIZE, size as usize)?;

        Ok(Some(Id3v2Frame {
            id,
            size,
            flags,
            value,
        }))
    }

    /// Walk every frame, dispatching recognized ids to `handler`.
    ///
    /// Frames already dispatched stay dispatched when a later frame turns
    /// out to be truncated; the walk then stops with an error.
    pub fn read_all_frames<H: Id3v2FrameHandler + ?Sized>(&self, handler: &mut H) -> ParseResult<()> {
        let mut offset = 0;

        while offset < self.content.len() {
            if self.is_padding_from(offset) {
                break;
            }

            let frame = match self.read_frame(offset)? {
                Some(frame) => frame,
                None => break,
            };

            match FieldMappings::from_id3v2(&frame.id.0) {
                Some(StandardField::Title) => handler.on_title(&frame.text()),
                Some(StandardField::Artist) => handler.on_artist(&frame.text()),
                Some(StandardField::Genre) => handler.on_genre(&frame.text()),
                None => handler.on_unknown(&frame),
            }

            offset += frame.entire_size();
        }

        Ok(())
    }

    fn is_padding_from(&self, offset: usize) -> bool {
        self.content
            .slice_from(offset)
            .map(|rest| rest.as_bytes().iter().all(|&b| b == 0))
            .unwrap_or(false)
    }
}

/// Decode a synchsafe integer: 7 significant bits per byte
pub fn decode_synchsafe(bytes: [u8; 4]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 7) | (b & 0x7F) as u32)
}

/// Encode a value below 2^28 as a synchsafe integer
pub fn encode_synchsafe(value: u32) -> Option<[u8; 4]> {
    if value >= 1 << 28 {
        return None;
    }

    Some([
        (value >> 21) as u8 & 0x7F,
        (value >> 14) as u8 & 0x7F,
        (value >> 7) as u8 & 0x7F,
        value as u8 & 0x7F,
    ])
}

// RIFF container chunk walking

use log::debug;

use crate::error::ParseResult;
use crate::riff::info::InfoList;
use crate::utils::{ByteCursor, Endian, FourCc};

/// RIFF file signature
pub const RIFF_SIGNATURE: &[u8; 4] = b"RIFF";

/// WAVE form type
pub const WAVE_FORM: &[u8; 4] = b"WAVE";

/// Size of the `RIFF <size> <form>` file header
pub const RIFF_HEADER_SIZE: usize = 12;

/// Size of a chunk's id + size prefix
pub const CHUNK_HEADER_SIZE: usize = 8;

const LIST_ID: &[u8; 4] = b"LIST";
const INFO_TYPE: &[u8; 4] = b"INFO";

/// The 12-byte header at the start of a RIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffFileHeader {
    /// Size of everything after the size field
    pub chunk_size: u32,
    pub form: FourCc,
}

impl RiffFileHeader {
    /// Read the file header; `None` if the buffer is not a RIFF file
    pub fn read(buffer: &[u8]) -> Option<Self> {
        let view = ByteCursor::new(buffer);
        if !view.has_signature(0, RIFF_SIGNATURE) {
            return None;
        }

        Some(RiffFileHeader {
            chunk_size: view.read_u32(4, Endian::Little).ok()?,
            form: view.read_fourcc(8).ok()?,
        })
    }
}

/// True if the buffer starts with a `RIFF....WAVE` header
pub fn is_wave_container(buffer: &[u8]) -> bool {
    RiffFileHeader::read(buffer).is_some_and(|header| header.form == *WAVE_FORM)
}

/// A chunk with no dedicated reader
#[derive(Debug, Clone, Copy)]
pub struct UnknownChunk<'a> {
    pub id: FourCc,
    pub content: ByteCursor<'a>,
}

/// A `LIST` chunk; the first four content bytes name the list type
#[derive(Debug, Clone, Copy)]
pub struct ListChunk<'a> {
    pub content: ByteCursor<'a>,
}

impl<'a> ListChunk<'a> {
    /// The list sub-type, e.g. `INFO`
    pub fn list_type(&self) -> ParseResult<FourCc> {
        self.content.read_fourcc(0)
    }

    /// The entries of an `INFO` list; `None` for any other list type
    pub fn try_convert_to_info_list(&self) -> Option<InfoList<'a>> {
        match self.list_type() {
            Ok(ty) if ty == *INFO_TYPE => self.content.slice_from(4).ok().map(InfoList::new),
            _ => None,
        }
    }
}

/// One chunk of a RIFF container
#[derive(Debug, Clone, Copy)]
pub enum RiffChunk<'a> {
    List(ListChunk<'a>),
    Unknown(UnknownChunk<'a>),
}

impl<'a> RiffChunk<'a> {
    /// Read the chunk starting at `at` inside `parent`
    pub fn read(parent: &ByteCursor<'a>, at: usize) -> ParseResult<Self> {
        let id = parent.read_fourcc(at)?;
        let size = parent.read_u32(at + 4, Endian::Little)? as usize;
        let content = parent.slice(at + CHUNK_HEADER_SIZE, size)?;

        Ok(if id == *LIST_ID {
            RiffChunk::List(ListChunk { content })
        } else {
            RiffChunk::Unknown(UnknownChunk { id, content })
        })
    }

    pub fn id(&self) -> FourCc {
        match self {
            RiffChunk::List(_) => FourCc(*LIST_ID),
            RiffChunk::Unknown(chunk) => chunk.id,
        }
    }

    pub fn content(&self) -> ByteCursor<'a> {
        match self {
            RiffChunk::List(chunk) => chunk.content,
            RiffChunk::Unknown(chunk) => chunk.content,
        }
    }

    /// Header plus payload
    pub fn entire_size(&self) -> usize {
        self.content().len() + CHUNK_HEADER_SIZE
    }
}

/// Receives chunks while a container is walked
pub trait RiffChunkHandler {
    fn on_list(&mut self, chunk: &ListChunk<'_>) -> ParseResult<()>;

    fn on_unknown(&mut self, chunk: &UnknownChunk<'_>) -> ParseResult<()> {
        debug!("skipping RIFF chunk {} ({} bytes)", chunk.id, chunk.content.len());
        Ok(())
    }
}

/// Walk the top-level chunks of a RIFF file, after its 12-byte header
pub fn read_all_chunks<H: RiffChunkHandler + ?Sized>(buffer: &[u8], handler: &mut H) -> ParseResult<()> {
    let chunks = ByteCursor::new(buffer).slice_from(RIFF_HEADER_SIZE)?;
    read_chunks_in(&chunks, handler)
}

/// Walk consecutive chunks filling `view`
pub fn read_chunks_in<H: RiffChunkHandler + ?Sized>(view: &ByteCursor<'_>, handler: &mut H) -> ParseResult<()> {
    let mut offset = 0;

    while offset < view.len() {
        let chunk = RiffChunk::read(view, offset)?;
        match &chunk {
            RiffChunk::List(list) => handler.on_list(list)?,
            RiffChunk::Unknown(unknown) => handler.on_unknown(unknown)?,
        }
        offset += chunk.entire_size();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::riff::test_support::{chunk, info_list, wave_file};

    #[derive(Default)]
    struct Recorder {
        lists: Vec<String>,
        unknown: Vec<String>,
    }

    impl RiffChunkHandler for Recorder {
        fn on_list(&mut self, chunk: &ListChunk<'_>) -> ParseResult<()> {
            self.lists.push(chunk.list_type()?.to_string());
            Ok(())
        }

        fn on_unknown(&mut self, chunk: &UnknownChunk<'_>) -> ParseResult<()> {
            self.unknown.push(chunk.id.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_wave_detection() {
        let file = wave_file(&[chunk(b"fmt ", &[0; 16])]);
        assert!(is_wave_container(&file));

        let header = RiffFileHeader::read(&file).unwrap();
        assert_eq!(header.chunk_size as usize, file.len() - 8);
        assert_eq!(header.form, *WAVE_FORM);

        let mut avi = file.clone();
        avi[8..12].copy_from_slice(b"AVI ");
        assert!(!is_wave_container(&avi));
        assert!(!is_wave_container(b"RIFF"));
        assert!(!is_wave_container(b""));
    }

    #[test]
    fn test_walks_chunks_in_order() {
        let file = wave_file(&[
            chunk(b"fmt ", &[0; 16]),
            info_list(&[(b"INAM", &b"Song"[..])]),
            chunk(b"data", &[1, 2, 3, 4]),
        ]);

        let mut recorder = Recorder::default();
        read_all_chunks(&file, &mut recorder).unwrap();

        assert_eq!(recorder.unknown, vec!["fmt ", "data"]);
        assert_eq!(recorder.lists, vec!["INFO"]);
    }

    #[test]
    fn test_non_info_list_is_not_converted() {
        let mut payload = b"adtl".to_vec();
        payload.extend_from_slice(&[0; 4]);
        let file = wave_file(&[chunk(b"LIST", &payload)]);
        let view = ByteCursor::new(&file).slice_from(RIFF_HEADER_SIZE).unwrap();

        match RiffChunk::read(&view, 0).unwrap() {
            RiffChunk::List(list) => assert!(list.try_convert_to_info_list().is_none()),
            other => panic!("expected LIST chunk, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_chunk_fails_cleanly() {
        let mut file = wave_file(&[chunk(b"data", &[0; 8])]);
        // Claim 0x1000 bytes of payload where only 8 exist
        file[16..20].copy_from_slice(&0x1000u32.to_le_bytes());

        let mut recorder = Recorder::default();
        let err = read_all_chunks(&file, &mut recorder).unwrap_err();
        assert!(matches!(err, ParseError::OutOfBounds { .. }));
        assert!(recorder.unknown.is_empty());
    }

    #[test]
    fn test_truncated_chunk_header_fails_cleanly() {
        let mut file = wave_file(&[chunk(b"fmt ", &[0; 2])]);
        file.extend_from_slice(b"da");

        let mut recorder = Recorder::default();
        assert!(read_all_chunks(&file, &mut recorder).is_err());
        assert_eq!(recorder.unknown, vec!["fmt "]);
    }
}

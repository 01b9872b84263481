// RIFF INFO list entries

use log::debug;

use crate::error::ParseResult;
use crate::field_mapping::{FieldMappings, StandardField};
use crate::riff::chunk::CHUNK_HEADER_SIZE;
use crate::utils::encoding::decode_latin1;
use crate::utils::{ByteCursor, Endian, FourCc};

/// Receives recognized INFO entries
pub trait InfoEntryHandler {
    fn on_name(&mut self, value: &str);
    fn on_artist(&mut self, value: &str);
    fn on_genre(&mut self, value: &str);

    fn on_unknown(&mut self, id: FourCc, value: &str) {
        debug!("unhandled INFO entry {} = {:?}", id, value);
    }
}

/// One `(id, value)` entry of an INFO list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoEntry {
    pub id: FourCc,
    pub value: String,
    /// Header plus payload, before word alignment
    pub entire_size: usize,
}

/// Content of a `LIST` chunk of type `INFO`, after the type tag
#[derive(Debug, Clone, Copy)]
pub struct InfoList<'a> {
    content: ByteCursor<'a>,
}

impl<'a> InfoList<'a> {
    pub fn new(content: ByteCursor<'a>) -> Self {
        InfoList { content }
    }

    /// Read the entry at `offset`; NUL bytes are dropped from the value
    pub fn read_entry_at(&self, offset: usize) -> ParseResult<InfoEntry> {
        let id = self.content.read_fourcc(offset)?;
        let byte_length = self.content.read_u32(offset + 4, Endian::Little)? as usize;
        let payload = self.content.slice(offset + CHUNK_HEADER_SIZE, byte_length)?;

        let bytes: Vec<u8> = payload.as_bytes().iter().copied().filter(|&b| b != 0).collect();

        Ok(InfoEntry {
            id,
            value: decode_latin1(&bytes),
            entire_size: byte_length + CHUNK_HEADER_SIZE,
        })
    }

    /// Walk every entry, dispatching recognized ids to `handler`
    pub fn read_all_entries<H: InfoEntryHandler + ?Sized>(&self, handler: &mut H) -> ParseResult<()> {
        let mut offset = 0;

        while offset < self.content.len() {
            let entry = self.read_entry_at(offset)?;
            match FieldMappings::from_riff_info(&entry.id.0) {
                Some(StandardField::Title) => handler.on_name(&entry.value),
                Some(StandardField::Artist) => handler.on_artist(&entry.value),
                Some(StandardField::Genre) => handler.on_genre(&entry.value),
                None => handler.on_unknown(entry.id, &entry.value),
            }

            offset = round_up_to_word(offset + entry.entire_size);
        }

        Ok(())
    }
}

/// RIFF entries are word-aligned: odd sizes carry one padding byte
pub fn round_up_to_word(x: usize) -> usize {
    (x + 1) & !1
}

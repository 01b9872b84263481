// ID3 frame definitions and parsers

use crate::utils::encoding::{decode_text, TextEncoding};
use crate::utils::{ByteCursor, FourCc};

/// Size of an ID3v2.3/2.4 frame header
pub const FRAME_HEADER_SIZE: usize = 10;

/// Common ID3v2 frame identifiers
pub mod frame_ids {
    pub const TITLE: &[u8; 4] = b"TIT2"; // Title/songname/content description
    pub const ARTIST: &[u8; 4] = b"TPE1"; // Lead performer(s)/Soloist(s)
    pub const GENRE: &[u8; 4] = b"TCON"; // Content type
}

/// ID3v2 frame structure
#[derive(Debug, Clone, Copy)]
pub struct Id3v2Frame<'a> {
    pub id: FourCc,
    pub size: u32,
    pub flags: u16,
    pub value: ByteCursor<'a>,
}

impl Id3v2Frame<'_> {
    /// Header plus value
    pub fn entire_size(&self) -> usize {
        self.value.len() + FRAME_HEADER_SIZE
    }

    /// Decode the value as a text frame
    pub fn text(&self) -> String {
        decode_text_frame(self.value.as_bytes())
    }
}

/// Decode text frame data: one encoding byte, then the text
pub fn decode_text_frame(data: &[u8]) -> String {
    match data.split_first() {
        Some((&encoding, text)) => decode_text(text, TextEncoding::from_byte(encoding))
            .trim_end_matches('\0')
            .to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::encode_text;

    fn frame(encoding: TextEncoding, text: &str) -> Vec<u8> {
        let mut out = vec![encoding as u8];
        out.extend(encode_text(text, encoding));
        out
    }

    #[test]
    fn test_decode_each_encoding() {
        assert_eq!(decode_text_frame(&frame(TextEncoding::Iso8859_1, "Déjà vu")), "Déjà vu");
        assert_eq!(decode_text_frame(&frame(TextEncoding::Utf16, "夜の街")), "夜の街");
        assert_eq!(decode_text_frame(&frame(TextEncoding::Utf16BE, "夜の街")), "夜の街");
        assert_eq!(decode_text_frame(&frame(TextEncoding::Utf8, "夜の街")), "夜の街");
    }

    #[test]
    fn test_terminators_and_empty_frames() {
        assert_eq!(decode_text_frame(b"\x00Title\x00"), "Title");
        assert_eq!(decode_text_frame(&[0x01, 0xFF, 0xFE, b'A', 0, 0, 0]), "A");
        assert_eq!(decode_text_frame(&[0x03]), "");
        assert_eq!(decode_text_frame(&[]), "");
    }

    #[test]
    fn test_latin1_frame_maps_bytes_to_same_code_points() {
        let text = decode_text_frame(&[0x00, b'A', 0x80, 0x93]);
        assert_eq!(text.chars().map(u32::from).collect::<Vec<_>>(), vec![65, 128, 147]);
    }
}

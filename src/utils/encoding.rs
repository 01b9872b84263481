// Text encodings used by ID3 tags

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};

/// ID3v2 text encoding indicator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Iso8859_1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    /// Map an encoding byte; unknown values fall back to Latin-1
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16BE,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Iso8859_1,
        }
    }
}

/// Decode text with specified encoding
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Iso8859_1 => decode_latin1(data),
        TextEncoding::Utf16 => match data {
            [0xFF, 0xFE, rest @ ..] => UTF_16LE.decode_without_bom_handling(rest).0.into_owned(),
            [0xFE, 0xFF, rest @ ..] => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
            // No BOM: little-endian, as most taggers write it
            _ => UTF_16LE.decode_without_bom_handling(data).0.into_owned(),
        },
        TextEncoding::Utf16BE => UTF_16BE.decode_without_bom_handling(data).0.into_owned(),
        TextEncoding::Utf8 => UTF_8.decode(data).0.into_owned(),
    }
}

/// Strict Latin-1: every byte maps to the code point of the same value
pub fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Encode text with specified encoding; Latin-1 replaces what it cannot hold with `?`
#[cfg(test)]
pub(crate) fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Iso8859_1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
        TextEncoding::Utf16 => {
            let mut out = vec![0xFF, 0xFE];
            out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            out
        }
        TextEncoding::Utf16BE => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
    }
}

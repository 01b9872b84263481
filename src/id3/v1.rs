// ID3v1 tag implementation

use crate::field_mapping::ValueConverter;
use crate::utils::encoding::decode_latin1;
use crate::utils::ByteCursor;

/// ID3v1 tag structure
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Id3v1Tag {
    pub const TAG_SIZE: usize = 128;
    const TAG_ID: &'static [u8; 3] = b"TAG";

    /// Parse the 128-byte trailer at the end of `buffer`, if present
    pub fn try_parse(buffer: &[u8]) -> Option<Self> {
        let trailer = ByteCursor::new(buffer).tail(Self::TAG_SIZE).ok()?;
        if !trailer.has_signature(0, Self::TAG_ID) {
            return None;
        }

        let bytes: [u8; Self::TAG_SIZE] = trailer.read_array(0).ok()?;
        Some(Self::parse(&bytes))
    }

    /// Parse ID3v1 tag from buffer
    fn parse(buffer: &[u8; 128]) -> Self {
        let title = Self::parse_string(&buffer[3..33]);
        let artist = Self::parse_string(&buffer[33..63]);
        let album = Self::parse_string(&buffer[63..93]);
        let year = Self::parse_string(&buffer[93..97]);

        // ID3v1.1 keeps a track number in the last comment byte
        let (comment, track) = if buffer[125] == 0 && buffer[126] != 0 {
            (Self::parse_string(&buffer[97..125]), Some(buffer[126]))
        } else {
            (Self::parse_string(&buffer[97..127]), None)
        };

        Id3v1Tag {
            title,
            artist,
            album,
            year,
            comment,
            track,
            genre: buffer[127],
        }
    }

    /// Name of the numeric genre, if it is a standard one
    pub fn genre_name(&self) -> Option<&'static str> {
        ValueConverter::parse_genre_id3v1(self.genre)
    }

    /// Parse a NUL-padded Latin-1 field
    fn parse_string(bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        decode_latin1(&bytes[..end])
            .trim_end()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(value: &str, width: usize) -> Vec<u8> {
        let mut out = value.as_bytes().to_vec();
        out.resize(width, 0);
        out
    }

    fn trailer(track: Option<u8>, genre: u8) -> Vec<u8> {
        let mut out = b"TAG".to_vec();
        out.extend(field("Night Drive", 30));
        out.extend(field("The Band", 30));
        out.extend(field("Album", 30));
        out.extend(field("1999", 4));
        match track {
            Some(n) => {
                out.extend(field("great", 28));
                out.extend([0, n]);
            }
            None => out.extend(field("great", 30)),
        }
        out.push(genre);
        out
    }

    #[test]
    fn test_parse_trailer_after_audio() {
        let mut file = vec![0xFFu8; 300];
        file.extend(trailer(Some(7), 17));

        let tag = Id3v1Tag::try_parse(&file).unwrap();
        assert_eq!(tag.title, "Night Drive");
        assert_eq!(tag.artist, "The Band");
        assert_eq!(tag.album, "Album");
        assert_eq!(tag.year, "1999");
        assert_eq!(tag.comment, "great");
        assert_eq!(tag.track, Some(7));
        assert_eq!(tag.genre, 17);
        assert_eq!(tag.genre_name(), Some("Rock"));
    }

    #[test]
    fn test_plain_v1_has_no_track() {
        let tag = Id3v1Tag::try_parse(&trailer(None, 255)).unwrap();
        assert_eq!(tag.track, None);
        assert_eq!(tag.genre_name(), None);
    }

    #[test]
    fn test_space_padding_is_trimmed() {
        let mut data = trailer(None, 0);
        data[3..33].copy_from_slice(&[b' '; 30]);
        data[3..8].copy_from_slice(b"Intro");
        assert_eq!(Id3v1Tag::try_parse(&data).unwrap().title, "Intro");
    }

    #[test]
    fn test_fields_are_latin1() {
        let mut data = trailer(None, 0);
        data[33..63].fill(0);
        data[33..37].copy_from_slice(&[b'B', 0xE9, 0x80, 0x9F]);
        let artist = Id3v1Tag::try_parse(&data).unwrap().artist;
        assert_eq!(artist.chars().map(u32::from).collect::<Vec<_>>(), vec![0x42, 0xE9, 0x80, 0x9F]);
    }

    #[test]
    fn test_missing_or_short_tag() {
        assert!(Id3v1Tag::try_parse(&[]).is_none());
        assert!(Id3v1Tag::try_parse(&[0u8; 127]).is_none());
        assert!(Id3v1Tag::try_parse(&[0u8; 128]).is_none());

        // A TAG signature that is not exactly 128 bytes from the end
        let mut shifted = trailer(None, 0);
        shifted.push(0);
        assert!(Id3v1Tag::try_parse(&shifted).is_none());
    }
}

// Unified metadata field mapping system
//
// Each tag format names the same few fields differently:
// - RIFF INFO lists: four-character entry ids (INAM, IART, IGNR)
// - ID3v2: frame ids (TIT2, TPE1, TCON)
// - ID3v1: fixed offsets, with genre stored as a numeric index
//
// The readers dispatch recognized ids through this module so that the
// mapping lives in one place.

/// Standard metadata fields reported by the extraction facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardField {
    Title,
    Artist,
    Genre,
}

/// Format-specific field mappings
pub struct FieldMappings;

impl FieldMappings {
    // RIFF INFO list entry ids
    pub const RIFF_TITLE: &'static [u8; 4] = b"INAM";
    pub const RIFF_ARTIST: &'static [u8; 4] = b"IART";
    pub const RIFF_GENRE: &'static [u8; 4] = b"IGNR";

    // ID3v2 frame ids
    pub const ID3V2_TITLE: &'static [u8; 4] = b"TIT2";
    pub const ID3V2_ARTIST: &'static [u8; 4] = b"TPE1";
    pub const ID3V2_GENRE: &'static [u8; 4] = b"TCON";

    /// Convert RIFF INFO entry id to standard field
    pub fn from_riff_info(id: &[u8; 4]) -> Option<StandardField> {
        match id {
            Self::RIFF_TITLE => Some(StandardField::Title),
            Self::RIFF_ARTIST => Some(StandardField::Artist),
            Self::RIFF_GENRE => Some(StandardField::Genre),
            _ => None,
        }
    }

    /// Convert ID3v2 frame id to standard field
    pub fn from_id3v2(id: &[u8; 4]) -> Option<StandardField> {
        match id {
            Self::ID3V2_TITLE => Some(StandardField::Title),
            Self::ID3V2_ARTIST => Some(StandardField::Artist),
            Self::ID3V2_GENRE => Some(StandardField::Genre),
            _ => None,
        }
    }
}

/// ID3v1 genre names, indexed by the genre byte (standard list plus Winamp extensions)
const ID3V1_GENRES: [&str; 148] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop",
    "Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap",
    "Reggae", "Rock", "Techno", "Industrial", "Alternative", "Ska", "Death Metal", "Pranks",
    "Soundtrack", "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance",
    "Classical", "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
    "AlternRock", "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock",
    "Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
    "Native American", "Cabaret", "New Wave", "Psychadelic", "Rave", "Showtunes", "Trailer", "Lo-Fi",
    "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
    "Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion", "Bebob", "Latin", "Revival",
    "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock", "Progressive Rock", "Psychedelic Rock", "Symphonic Rock", "Slow Rock",
    "Big Band", "Chorus", "Easy Listening", "Acoustic", "Humour", "Speech", "Chanson", "Opera",
    "Chamber Music", "Sonata", "Symphony", "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam",
    "Club", "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle",
    "Duet", "Punk Rock", "Drum Solo", "A capella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass",
    "Club-House", "Hardcore", "Terror", "Indie", "BritPop", "Afro-Punk", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover", "Contemporary Christian", "Christian Rock", "Merengue", "Salsa",
    "Thrash Metal", "Anime", "JPop", "Synthpop",
];

/// Metadata value converter for handling format-specific value formats
pub struct ValueConverter;

impl ValueConverter {
    /// Look up the name of a numeric ID3v1 genre
    pub fn parse_genre_id3v1(genre_id: u8) -> Option<&'static str> {
        ID3V1_GENRES.get(genre_id as usize).copied()
    }

    /// Genre as reported to handlers: the name when known, else the index
    pub fn genre_id3v1_display(genre_id: u8) -> String {
        Self::parse_genre_id3v1(genre_id)
            .map(str::to_string)
            .unwrap_or_else(|| genre_id.to_string())
    }
}

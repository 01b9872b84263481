// RIFF/WAVE container handling module
pub mod chunk;
pub mod info;

pub use chunk::{
    is_wave_container, read_all_chunks, ListChunk, RiffChunk, RiffChunkHandler, RiffFileHeader,
    UnknownChunk,
};
pub use info::{InfoEntryHandler, InfoList};

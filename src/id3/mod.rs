// ID3 metadata handling module
pub mod frames;
pub mod v1;
pub mod v2;

pub use frames::Id3v2Frame;
pub use v1::Id3v1Tag;
pub use v2::{Id3v2FrameHandler, Id3v2Section};

// Shared byte and text helpers
pub mod encoding;
pub mod io;

pub use io::{ByteCursor, Endian, FourCc};

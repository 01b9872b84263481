// Bounds-checked views over in-memory byte buffers

use std::fmt;

use crate::error::{ParseError, ParseResult};

/// Byte order for multi-byte reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Four-character code used by RIFF chunk ids and ID3v2 frame ids
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// True for the all-NUL id that marks ID3v2 padding
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ids are ASCII in practice; anything else is shown as Latin-1
        self.0.iter().try_for_each(|&b| write!(f, "{}", b as char))
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({:?})", self.to_string())
    }
}

impl PartialEq<[u8; 4]> for FourCc {
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

/// Immutable view `(buffer, offset, length)` over a shared byte buffer.
///
/// Slicing never copies: it produces a new view whose range is checked
/// against the parent. Every read is bounds-checked and returns
/// [`ParseError::OutOfBounds`] instead of reading past the view.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
    length: usize,
}

impl<'a> ByteCursor<'a> {
    /// View over a whole buffer
    pub fn new(buffer: &'a [u8]) -> Self {
        ByteCursor {
            buffer,
            offset: 0,
            length: buffer.len(),
        }
    }

    /// Number of bytes visible through this view
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Absolute offset of this view inside the backing buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The bytes visible through this view
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    /// Sub-view of `length` bytes starting at `offset` (relative to this view)
    pub fn slice(&self, offset: usize, length: usize) -> ParseResult<ByteCursor<'a>> {
        let end = offset
            .checked_add(length)
            .ok_or_else(|| ParseError::out_of_bounds(offset, length, self.length))?;
        if end > self.length {
            return Err(ParseError::out_of_bounds(offset, length, self.length));
        }

        Ok(ByteCursor {
            buffer: self.buffer,
            offset: self.offset + offset,
            length,
        })
    }

    /// Sub-view from `offset` to the end of this view
    pub fn slice_from(&self, offset: usize) -> ParseResult<ByteCursor<'a>> {
        let length = self
            .length
            .checked_sub(offset)
            .ok_or_else(|| ParseError::out_of_bounds(offset, 0, self.length))?;
        self.slice(offset, length)
    }

    /// Sub-view of the last `length` bytes
    pub fn tail(&self, length: usize) -> ParseResult<ByteCursor<'a>> {
        let offset = self
            .length
            .checked_sub(length)
            .ok_or_else(|| ParseError::out_of_bounds(0, length, self.length))?;
        self.slice(offset, length)
    }

    /// Fixed-size copy of `N` bytes at `offset`
    pub fn read_array<const N: usize>(&self, offset: usize) -> ParseResult<[u8; N]> {
        let view = self.slice(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(view.as_bytes());
        Ok(out)
    }

    pub fn read_u8(&self, offset: usize) -> ParseResult<u8> {
        let [b] = self.read_array::<1>(offset)?;
        Ok(b)
    }

    pub fn read_u16(&self, offset: usize, endian: Endian) -> ParseResult<u16> {
        let bytes = self.read_array::<2>(offset)?;
        Ok(match endian {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_u32(&self, offset: usize, endian: Endian) -> ParseResult<u32> {
        let bytes = self.read_array::<4>(offset)?;
        Ok(match endian {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        })
    }

    /// Four-character code at `offset`
    pub fn read_fourcc(&self, offset: usize) -> ParseResult<FourCc> {
        self.read_array::<4>(offset).map(FourCc)
    }

    /// Check for `signature` at `offset` without failing on short views
    pub fn has_signature(&self, offset: usize, signature: &[u8]) -> bool {
        self.slice(offset, signature.len())
            .map(|view| view.as_bytes() == signature)
            .unwrap_or(false)
    }
}

impl fmt::Debug for ByteCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteCursor")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_stays_within_parent() {
        let data = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let view = ByteCursor::new(&data);

        let inner = view.slice(2, 4).unwrap();
        assert_eq!(inner.offset(), 2);
        assert_eq!(inner.as_bytes(), &[2, 3, 4, 5]);

        let nested = inner.slice(1, 2).unwrap();
        assert_eq!(nested.offset(), 3);
        assert_eq!(nested.as_bytes(), &[3, 4]);

        assert_eq!(
            inner.slice(2, 3),
            Err(ParseError::out_of_bounds(2, 3, 4))
        );
        assert!(inner.slice(usize::MAX, 2).is_err());
        assert!(inner.slice_from(5).is_err());
        assert!(inner.slice_from(4).unwrap().is_empty());
    }

    #[test]
    fn test_reads_respect_endianness() {
        let data = [0x12u8, 0x34, 0x56, 0x78];
        let view = ByteCursor::new(&data);

        assert_eq!(view.read_u8(3).unwrap(), 0x78);
        assert_eq!(view.read_u16(0, Endian::Big).unwrap(), 0x1234);
        assert_eq!(view.read_u16(0, Endian::Little).unwrap(), 0x3412);
        assert_eq!(view.read_u32(0, Endian::Big).unwrap(), 0x1234_5678);
        assert_eq!(view.read_u32(0, Endian::Little).unwrap(), 0x7856_3412);
        assert!(view.read_u32(1, Endian::Big).is_err());
        assert!(view.read_u8(4).is_err());
    }

    #[test]
    fn test_tail_and_signature() {
        let data = b"xxTAGyy";
        let view = ByteCursor::new(data);

        assert_eq!(view.tail(2).unwrap().as_bytes(), b"yy");
        assert!(view.tail(8).is_err());
        assert!(view.has_signature(2, b"TAG"));
        assert!(!view.has_signature(5, b"TAG"));
        assert_eq!(view.read_fourcc(1).unwrap(), *b"xTAG");
        assert_eq!(view.read_fourcc(1).unwrap().to_string(), "xTAG");
    }
}

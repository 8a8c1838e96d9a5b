use std::ops::Range;

use crate::bytes;
use crate::{RandomiserError, Result};

/// Location of a decoded record inside the image it was read from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Cursor over a mutable image with a stack of saved positions.
///
/// The position always stays within `0..=len`.
#[derive(Debug)]
pub struct ByteStream<'a> {
    data: &'a mut [u8],
    position: usize,
    saved: Vec<usize>,
}

impl<'a> ByteStream<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            data,
            position: 0,
            saved: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of positions currently saved.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(RandomiserError::OutOfBounds {
                offset: position as i64,
                len: 0,
                size: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    /// Seek to a signed address, as produced by pointer arithmetic.
    pub fn seek(&mut self, position: i64) -> Result<()> {
        let target = usize::try_from(position).map_err(|_| RandomiserError::OutOfBounds {
            offset: position,
            len: 0,
            size: self.data.len(),
        })?;
        self.set_position(target)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        let r = self.claim(len)?;
        self.position = r.end;
        Ok(())
    }

    fn claim(&self, len: usize) -> Result<Range<usize>> {
        match self.position.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(self.position..end),
            _ => Err(RandomiserError::OutOfBounds {
                offset: self.position as i64,
                len,
                size: self.data.len(),
            }),
        }
    }

    /// Borrow the bytes a record was decoded from.
    pub fn slice(&self, span: Span) -> Result<&[u8]> {
        match span.offset.checked_add(span.len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[span.offset..end]),
            _ => Err(RandomiserError::OutOfBounds {
                offset: span.offset as i64,
                len: span.len,
                size: self.data.len(),
            }),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        let r = self.claim(len)?;
        self.position = r.end;
        Ok(&self.data[r])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let r = self.claim(bytes.len())?;
        self.position = r.end;
        self.data[r].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let value = bytes::read_u8(self.data, self.position)?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let value = bytes::read_u16(self.data, self.position)?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = bytes::read_u32(self.data, self.position)?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        bytes::write_u8(self.data, self.position, value)?;
        self.position += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        bytes::write_u16(self.data, self.position, value)?;
        self.position += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        bytes::write_u32(self.data, self.position, value)?;
        self.position += 4;
        Ok(())
    }

    /// Read a bit field from the `span` bytes at the current position.
    /// The position does not move.
    pub fn read_bits(&self, span: usize, bit_offset: u32, width: u32) -> Result<u32> {
        let r = self.claim(span)?;
        bytes::read_bits(&self.data[r], bit_offset, width)
    }

    /// Write a bit field into the `span` bytes at the current position.
    /// The position does not move.
    pub fn write_bits(&mut self, value: u32, span: usize, bit_offset: u32, width: u32) -> Result<()> {
        let r = self.claim(span)?;
        bytes::write_bits(&mut self.data[r], value, bit_offset, width)
    }

    pub fn push(&mut self) {
        self.saved.push(self.position);
    }

    /// Restore the most recently saved position.
    ///
    /// # Panics
    ///
    /// Panics if nothing was saved; an unbalanced pop is a bug in the caller.
    pub fn pop(&mut self) {
        match self.saved.pop() {
            Some(position) => self.position = position,
            None => panic!("unbalanced position stack: pop without a matching push"),
        }
    }

    /// Run `f` with the current position saved, restoring it afterwards
    /// whether `f` succeeds or fails.
    pub fn with_saved_position<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.push();
        let result = f(self);
        self.pop();
        result
    }
}

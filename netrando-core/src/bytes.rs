//! Little-endian integer and bit-field access on plain byte slices.
//!
//! Every accessor is bounds checked and reports `OutOfBounds` instead of
//! panicking, so record codecs can work on arbitrary image slices.

use std::ops::Range;

use crate::{RandomiserError, Result};

fn claim(bytes: &[u8], offset: usize, len: usize) -> Result<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= bytes.len() => Ok(offset..end),
        _ => Err(RandomiserError::OutOfBounds {
            offset: offset as i64,
            len,
            size: bytes.len(),
        }),
    }
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8> {
    let r = claim(bytes, offset, 1)?;
    Ok(bytes[r.start])
}

pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    let r = claim(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[r.start], bytes[r.start + 1]]))
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let r = claim(bytes, offset, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[r]);
    Ok(u32::from_le_bytes(raw))
}

pub fn write_u8(bytes: &mut [u8], offset: usize, value: u8) -> Result<()> {
    let r = claim(bytes, offset, 1)?;
    bytes[r.start] = value;
    Ok(())
}

pub fn write_u16(bytes: &mut [u8], offset: usize, value: u16) -> Result<()> {
    let r = claim(bytes, offset, 2)?;
    bytes[r].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u32(bytes: &mut [u8], offset: usize, value: u32) -> Result<()> {
    let r = claim(bytes, offset, 4)?;
    bytes[r].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

fn check_bit_field(span_len: usize, bit_offset: u32, width: u32) -> Result<()> {
    let span_bits = span_len.saturating_mul(8);
    let end = bit_offset as usize + width as usize;
    if width == 0 || width > 32 || end > span_bits {
        return Err(RandomiserError::InvalidBitField {
            offset: bit_offset,
            width,
            span_bits: u32::try_from(span_bits).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

fn field_mask(width: u32) -> u64 {
    (1u64 << width) - 1
}

// Bytes [first, last] covering the field, at most five for a 32-bit field.
fn covering_bytes(bit_offset: u32, width: u32) -> Range<usize> {
    let first = (bit_offset / 8) as usize;
    let last = ((bit_offset + width - 1) / 8) as usize;
    first..last + 1
}

/// Read an unsigned `width`-bit field starting at `bit_offset` inside `span`.
///
/// The span is treated as one little-endian integer: bit 0 is the lowest bit
/// of `span[0]`, bit 8 the lowest bit of `span[1]`.
pub fn read_bits(span: &[u8], bit_offset: u32, width: u32) -> Result<u32> {
    check_bit_field(span.len(), bit_offset, width)?;
    let covered = covering_bytes(bit_offset, width);

    let mut acc = 0u64;
    for (i, &b) in span[covered].iter().enumerate() {
        acc |= u64::from(b) << (8 * i);
    }
    Ok(((acc >> (bit_offset % 8)) & field_mask(width)) as u32)
}

/// Write `value` into the `width`-bit field at `bit_offset` inside `span`,
/// leaving every other bit of the span as it was.
pub fn write_bits(span: &mut [u8], value: u32, bit_offset: u32, width: u32) -> Result<()> {
    check_bit_field(span.len(), bit_offset, width)?;
    if u64::from(value) > field_mask(width) {
        return Err(RandomiserError::InvalidField {
            field: "bit field value",
            value: i64::from(value),
        });
    }
    let covered = covering_bytes(bit_offset, width);
    let shift = bit_offset % 8;

    let mut acc = 0u64;
    for (i, &b) in span[covered.clone()].iter().enumerate() {
        acc |= u64::from(b) << (8 * i);
    }
    let mask = field_mask(width) << shift;
    acc = (acc & !mask) | ((u64::from(value) << shift) & mask);

    for (i, b) in span[covered].iter_mut().enumerate() {
        *b = (acc >> (8 * i)) as u8;
    }
    Ok(())
}

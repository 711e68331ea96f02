// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Conversion between bit-packed binary rasters and byte-per-pixel or byte-packed forms.
//!
//! A binary raster stores one bit per pixel, most significant bit first, in elements of 8, 16 or
//! 32 bits. Rows start at an arbitrary bit offset into their first element. The functions here
//! convert a region of such data into
//!
//! * an *unpacked* form, one byte per pixel holding `0` or `1`, or
//! * a *packed* form, eight pixels per byte, each row starting on a fresh byte,
//!
//! and write either form back. Writes only ever modify the bits belonging to the region.
use crate::error::{RasterError, Result};
use crate::layout::Rect;
use crate::raster::Raster;
use crate::sample::{dispatch_integral, Sample};

/// An integral element type that holds packed bits.
pub trait BitUnit: Sample {
    const BITS: usize;

    /// The raw bit pattern, zero extended.
    fn to_bits(self) -> u32;
    /// Reinterpret the low `BITS` bits.
    fn from_bits(bits: u32) -> Self;
}

impl BitUnit for u8 {
    const BITS: usize = 8;

    fn to_bits(self) -> u32 {
        u32::from(self)
    }

    fn from_bits(bits: u32) -> Self {
        bits as u8
    }
}

impl BitUnit for u16 {
    const BITS: usize = 16;

    fn to_bits(self) -> u32 {
        u32::from(self)
    }

    fn from_bits(bits: u32) -> Self {
        bits as u16
    }
}

impl BitUnit for i16 {
    const BITS: usize = 16;

    fn to_bits(self) -> u32 {
        u32::from(self as u16)
    }

    fn from_bits(bits: u32) -> Self {
        bits as u16 as i16
    }
}

impl BitUnit for i32 {
    const BITS: usize = 32;

    fn to_bits(self) -> u32 {
        self as u32
    }

    fn from_bits(bits: u32) -> Self {
        bits as i32
    }
}

/// A rectangle of bits within a slice of units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitRegion {
    /// The unit holding the start of the first row.
    pub element_offset: usize,
    /// Bits from the start of that unit to the first pixel of each row.
    pub bit_offset: usize,
    /// Units between consecutive rows.
    pub line_stride: usize,
    pub width: usize,
    pub height: usize,
}

impl BitRegion {
    /// The region of a raster's bank addressed by `rect`.
    ///
    /// The rectangle must already be validated against the raster bounds.
    pub fn of_raster(raster: &Raster, rect: &Rect) -> Self {
        let layout = raster.layout();
        let x = (i64::from(rect.x) - i64::from(raster.min_x())) as usize;
        let y = (i64::from(rect.y) - i64::from(raster.min_y())) as usize;
        BitRegion {
            element_offset: raster.buffer().offset(0) + y * layout.scanline_stride(),
            bit_offset: layout.data_bit_offset() + x,
            line_stride: layout.scanline_stride(),
            width: rect.width,
            height: rect.height,
        }
    }

    /// Bytes of packed data per row.
    pub fn packed_stride(&self) -> usize {
        (self.width + 7) / 8
    }

    pub fn packed_len(&self) -> usize {
        self.packed_stride() * self.height
    }

    pub fn unpacked_len(&self) -> usize {
        self.width * self.height
    }

    fn row_start(&self, row: usize) -> usize {
        self.element_offset + row * self.line_stride
    }

    /// Units that must be present for the region to be addressable.
    fn required_units(&self, unit_bits: usize) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        self.row_start(self.height - 1) + (self.bit_offset + self.width + unit_bits - 1) / unit_bits
    }

    fn check<U: BitUnit>(&self, units: usize) -> Result<()> {
        if units < self.required_units(U::BITS) {
            Err(RasterError::InvalidArgument("bit region exceeds the data"))
        } else {
            Ok(())
        }
    }
}

/// Read `n <= 8` bits starting at bit `bit` after unit `start`, right aligned.
fn read_field<U: BitUnit>(data: &[U], start: usize, bit: usize, n: usize) -> u32 {
    let idx = start + bit / U::BITS;
    let shift = bit % U::BITS;
    if shift + n <= U::BITS {
        let pos = U::BITS - shift - n;
        (data[idx].to_bits() >> pos) & ((1u32 << n) - 1)
    } else {
        let first = U::BITS - shift;
        let rest = n - first;
        let high = read_field(data, start, bit, first);
        let low = read_field(data, start, bit + first, rest);
        (high << rest) | low
    }
}

/// Write the low `n <= 8` bits of `value` at bit `bit` after unit `start`.
fn write_field<U: BitUnit>(data: &mut [U], start: usize, bit: usize, n: usize, value: u32) {
    let idx = start + bit / U::BITS;
    let shift = bit % U::BITS;
    if shift + n <= U::BITS {
        let pos = U::BITS - shift - n;
        let mask = ((1u32 << n) - 1) << pos;
        let unit = data[idx].to_bits();
        data[idx] = U::from_bits((unit & !mask) | ((value << pos) & mask));
    } else {
        let first = U::BITS - shift;
        let rest = n - first;
        write_field(data, start, bit, first, value >> rest);
        write_field(data, start, bit + first, rest, value & ((1u32 << rest) - 1));
    }
}

/// Expand to one byte per pixel, `0` or `1`.
pub fn unpack_units<U: BitUnit>(data: &[U], region: &BitRegion, out: &mut [u8]) -> Result<()> {
    region.check::<U>(data.len())?;
    if out.len() < region.unpacked_len() {
        return Err(RasterError::InvalidArgument("output shorter than the region"));
    }

    let mut k = 0;
    for row in 0..region.height {
        let start = region.row_start(row);
        for x in 0..region.width {
            let bit = region.bit_offset + x;
            let unit = data[start + bit / U::BITS].to_bits();
            out[k] = ((unit >> (U::BITS - 1 - bit % U::BITS)) & 1) as u8;
            k += 1;
        }
    }

    Ok(())
}

/// Write one byte per pixel, any nonzero byte sets the bit and zero clears it.
pub fn pack_units<U: BitUnit>(bits: &[u8], data: &mut [U], region: &BitRegion) -> Result<()> {
    region.check::<U>(data.len())?;
    if bits.len() < region.unpacked_len() {
        return Err(RasterError::InvalidArgument("input shorter than the region"));
    }

    let mut k = 0;
    for row in 0..region.height {
        let start = region.row_start(row);
        for x in 0..region.width {
            let bit = region.bit_offset + x;
            let idx = start + bit / U::BITS;
            let mask = 1u32 << (U::BITS - 1 - bit % U::BITS);
            let unit = data[idx].to_bits();
            let unit = if bits[k] != 0 { unit | mask } else { unit & !mask };
            data[idx] = U::from_bits(unit);
            k += 1;
        }
    }

    Ok(())
}

/// Copy into rows of whole bytes, each row starting at a byte boundary.
///
/// Bits past the region's width in the last byte of each row are zero.
pub fn packed_bits_units<U: BitUnit>(data: &[U], region: &BitRegion, out: &mut [u8]) -> Result<()> {
    region.check::<U>(data.len())?;
    let stride = region.packed_stride();
    if out.len() < region.packed_len() {
        return Err(RasterError::InvalidArgument("output shorter than the region"));
    }

    let whole = region.width / 8;
    let tail = region.width % 8;
    let aligned = region.bit_offset % U::BITS == 0;

    if aligned {
        log::trace!("packing {}-bit aligned rows", U::BITS);
    }

    for row in 0..region.height {
        let start = region.row_start(row);
        let line = &mut out[row * stride..(row + 1) * stride];

        if aligned && U::BITS == 8 {
            let first = start + region.bit_offset / 8;
            let units = &data[first..first + stride];
            line.copy_from_slice(bytemuck::cast_slice(units));
        } else if aligned {
            let per_unit = U::BITS / 8;
            let first = start + region.bit_offset / U::BITS;
            for (k, byte) in line.iter_mut().enumerate() {
                let unit = data[first + k / per_unit].to_bits();
                *byte = (unit >> (U::BITS - 8 - 8 * (k % per_unit))) as u8;
            }
        } else {
            for (k, byte) in line[..whole].iter_mut().enumerate() {
                *byte = read_field(data, start, region.bit_offset + 8 * k, 8) as u8;
            }
            if tail > 0 {
                let value = read_field(data, start, region.bit_offset + 8 * whole, tail);
                line[whole] = (value << (8 - tail)) as u8;
            }
        }

        if tail > 0 {
            line[whole] &= 0xffu8 << (8 - tail);
        }
    }

    Ok(())
}

/// Write rows of packed bytes, as produced by `packed_bits_units`.
pub fn set_packed_bits_units<U: BitUnit>(
    packed: &[u8],
    data: &mut [U],
    region: &BitRegion,
) -> Result<()> {
    region.check::<U>(data.len())?;
    let stride = region.packed_stride();
    if packed.len() < region.packed_len() {
        return Err(RasterError::InvalidArgument("input shorter than the region"));
    }

    let whole = region.width / 8;
    let tail = region.width % 8;
    let aligned = region.bit_offset % U::BITS == 0;
    let per_unit = U::BITS / 8;

    if aligned {
        log::trace!("unpacking {}-bit aligned rows", U::BITS);
    }

    for row in 0..region.height {
        let start = region.row_start(row);
        let line = &packed[row * stride..(row + 1) * stride];

        // Bytes of the row stored as whole units, the rest goes through `write_field`.
        let mut done = 0;
        if aligned && U::BITS == 8 {
            let first = start + region.bit_offset / 8;
            let units: &mut [u8] = bytemuck::cast_slice_mut(&mut data[first..first + whole]);
            units.copy_from_slice(&line[..whole]);
            done = whole;
        } else if aligned {
            let first = start + region.bit_offset / U::BITS;
            let units = whole / per_unit;
            let chunks = line[..units * per_unit].chunks_exact(per_unit);
            for (unit, chunk) in data[first..first + units].iter_mut().zip(chunks) {
                let bits = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                *unit = U::from_bits(bits);
            }
            done = units * per_unit;
        }

        for (k, &byte) in line[..whole].iter().enumerate().skip(done) {
            write_field(data, start, region.bit_offset + 8 * k, 8, u32::from(byte));
        }

        if tail > 0 {
            let value = u32::from(line[whole]) >> (8 - tail);
            write_field(data, start, region.bit_offset + 8 * whole, tail, value);
        }
    }

    Ok(())
}

fn binary_region(raster: &Raster, rect: &Rect) -> Result<BitRegion> {
    if !raster.layout().is_binary() {
        return Err(RasterError::InvalidArgument("raster is not binary"));
    }
    raster.check_region(rect)?;
    Ok(BitRegion::of_raster(raster, rect))
}

const NOT_INTEGRAL: RasterError =
    RasterError::UnsupportedFormat("binary data requires an integral backing type");

/// One byte per pixel of a binary raster region.
pub fn unpack(raster: &Raster, rect: Rect) -> Result<Vec<u8>> {
    let region = binary_region(raster, &rect)?;
    let mut out = vec![0; region.unpacked_len()];
    dispatch_integral!(raster.layout().data_type(), U => {
        let data = raster.buffer().bank::<U>(0).ok_or(NOT_INTEGRAL)?;
        unpack_units(data, &region, &mut out)?
    }, _ => return Err(NOT_INTEGRAL));
    Ok(out)
}

/// Store one byte per pixel into a binary raster region.
pub fn pack(bits: &[u8], raster: &mut Raster, rect: Rect) -> Result<()> {
    let region = binary_region(raster, &rect)?;
    let data_type = raster.layout().data_type();
    dispatch_integral!(data_type, U => {
        let data = raster.buffer_mut().bank_mut::<U>(0).ok_or(NOT_INTEGRAL)?;
        pack_units(bits, data, &region)
    }, _ => Err(NOT_INTEGRAL))
}

/// The packed bits of a binary raster region, `ceil(width / 8)` bytes per row.
pub fn packed_bits(raster: &Raster, rect: Rect) -> Result<Vec<u8>> {
    let region = binary_region(raster, &rect)?;
    let mut out = vec![0; region.packed_len()];
    dispatch_integral!(raster.layout().data_type(), U => {
        let data = raster.buffer().bank::<U>(0).ok_or(NOT_INTEGRAL)?;
        packed_bits_units(data, &region, &mut out)?
    }, _ => return Err(NOT_INTEGRAL));
    Ok(out)
}

/// Store packed bits into a binary raster region.
pub fn set_packed_bits(packed: &[u8], raster: &mut Raster, rect: Rect) -> Result<()> {
    let region = binary_region(raster, &rect)?;
    let data_type = raster.layout().data_type();
    dispatch_integral!(data_type, U => {
        let data = raster.buffer_mut().bank_mut::<U>(0).ok_or(NOT_INTEGRAL)?;
        set_packed_bits_units(packed, data, &region)
    }, _ => Err(NOT_INTEGRAL))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(bit_offset: usize, width: usize, height: usize, line_stride: usize) -> BitRegion {
        BitRegion {
            element_offset: 0,
            bit_offset,
            line_stride,
            width,
            height,
        }
    }

    #[test]
    fn fields_across_units() {
        let data = [0b0000_0111u8, 0b1010_0000];
        assert_eq!(read_field(&data, 0, 5, 5), 0b11110);
        let mut data = [0u8; 2];
        write_field(&mut data, 0, 6, 4, 0b1011);
        assert_eq!(data, [0b0000_0010, 0b1100_0000]);
    }

    #[test]
    fn unpack_msb_first() {
        let data = [0b1000_0001u16, 0b0100_0000_0000_0000];
        let mut out = [0u8; 4];
        unpack_units(&data, &region(14, 4, 1, 2), &mut out).unwrap();
        assert_eq!(out, [0, 1, 0, 1]);
    }

    #[test]
    fn packed_pad_bits_are_zero() {
        let data = [0xffu8, 0xff];
        let mut out = [0u8; 2];
        packed_bits_units(&data, &region(0, 5, 2, 1), &mut out).unwrap();
        assert_eq!(out, [0b1111_1000, 0b1111_1000]);
    }

    #[test]
    fn aligned_int_rows() {
        let data = [0x1234_5678i32, 0x9abc_def0u32 as i32];
        let mut out = [0u8; 8];
        packed_bits_units(&data, &region(0, 64, 1, 2), &mut out).unwrap();
        assert_eq!(out, [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0]);
    }

    #[test]
    fn short_region_is_rejected() {
        let data = [0u8; 3];
        let mut out = [0u8; 8];
        let err = unpack_units(&data, &region(4, 4, 2, 3), &mut out).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn set_packed_keeps_neighbours() {
        let mut data = [0xffu8, 0xff, 0xff];
        set_packed_bits_units(&[0x00, 0x00], &mut data, &region(3, 10, 1, 3)).unwrap();
        assert_eq!(data, [0b1110_0000, 0b0000_0111, 0xff]);
    }

    #[test]
    fn set_packed_whole_shorts() {
        let mut data = [0xffffu16, 0xffff];
        set_packed_bits_units(&[0xab, 0xcd, 0xe0], &mut data, &region(0, 20, 1, 2)).unwrap();
        assert_eq!(data, [0xabcd, 0xefff]);
    }

    #[test]
    fn set_packed_whole_ints_then_bytes() {
        let mut data = [-1i32; 4];
        let packed = [0x12, 0x34, 0x56, 0x78, 0x00];
        let region = region(32, 40, 1, 4);
        set_packed_bits_units(&packed, &mut data, &region).unwrap();
        assert_eq!(data, [-1, 0x1234_5678, 0x00ff_ffff, -1]);

        let mut out = [0u8; 5];
        packed_bits_units(&data, &region, &mut out).unwrap();
        assert_eq!(out, packed);
    }
}

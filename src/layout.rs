// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Descriptions of how samples are arranged within a data buffer.
//!
//! A `SampleLayout` maps a pixel coordinate and a band to a bank and an element index, or for
//! bit-packed binary data to an element and a bit within it. The layout does not own any data,
//! it only describes the shape of a `DataBuffer` that a raster pairs with it.
use core::fmt;

use crate::buffer::DataBuffer;
use crate::error::{RasterError, Result};
use crate::sample::DataType;

pub mod factory;

/// An axis aligned rectangle in raster coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

/// How the samples of a pixel are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Packing {
    /// Every sample occupies a whole element.
    Component,
    /// One band, one bit per pixel, most significant bit first.
    ///
    /// The first pixel of each row begins `bit_offset` bits into the row's first element.
    Binary { bit_offset: usize },
}

/// The full geometry of samples within a buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleLayout {
    data_type: DataType,
    width: usize,
    height: usize,
    pixel_stride: usize,
    scanline_stride: usize,
    band_offsets: Vec<usize>,
    bank_indices: Vec<usize>,
    packing: Packing,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    // Wide enough for any `i32` origin plus any `usize` extent.
    fn end_x(&self) -> i128 {
        i128::from(self.x) + self.width as i128
    }

    fn end_y(&self) -> i128 {
        i128::from(self.y) + self.height as i128
    }

    /// Whether `other` lies completely within this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.end_x() <= self.end_x()
            && other.end_y() <= self.end_y()
    }

    /// The common area, `None` if the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let end_x = self.end_x().min(other.end_x());
        let end_y = self.end_y().min(other.end_y());

        if end_x <= i128::from(x) || end_y <= i128::from(y) {
            return None;
        }

        // Never wider than either input, so the extents fit.
        Some(Rect {
            x,
            y,
            width: (end_x - i128::from(x)) as usize,
            height: (end_y - i128::from(y)) as usize,
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[x={}, y={}, {}x{}]",
            self.x, self.y, self.width, self.height
        )
    }
}

impl SampleLayout {
    /// Validate a component layout.
    ///
    /// Dimensions and band count must be nonzero and every band needs an offset and a bank.
    pub fn component(
        data_type: DataType,
        width: usize,
        height: usize,
        pixel_stride: usize,
        scanline_stride: usize,
        band_offsets: Vec<usize>,
        bank_indices: Vec<usize>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidArgument("width and height must be positive"));
        }

        if band_offsets.is_empty() {
            return Err(RasterError::InvalidArgument("at least one band is required"));
        }

        if band_offsets.len() != bank_indices.len() {
            return Err(RasterError::InvalidArgument(
                "band offsets and bank indices differ in length",
            ));
        }

        let layout = SampleLayout {
            data_type,
            width,
            height,
            pixel_stride,
            scanline_stride,
            band_offsets,
            bank_indices,
            packing: Packing::Component,
        };

        // Must be addressable without overflow.
        layout
            .checked_buffer_size()
            .ok_or(RasterError::InvalidArgument("layout exceeds the address space"))?;

        Ok(layout)
    }

    /// Validate a binary layout with a given scanline stride, in elements.
    pub fn binary(
        data_type: DataType,
        width: usize,
        height: usize,
        scanline_stride: usize,
        bit_offset: usize,
    ) -> Result<Self> {
        if !data_type.is_integral() {
            return Err(RasterError::UnsupportedFormat(
                "binary data requires an integral backing type",
            ));
        }

        if width == 0 || height == 0 {
            return Err(RasterError::InvalidArgument("width and height must be positive"));
        }

        let bits = data_type.bits() as usize;
        let min_stride = (bit_offset + width + bits - 1) / bits;
        if scanline_stride < min_stride {
            return Err(RasterError::InvalidArgument(
                "scanline stride too small for the row bits",
            ));
        }

        let layout = SampleLayout {
            data_type,
            width,
            height,
            pixel_stride: 1,
            scanline_stride,
            band_offsets: vec![0],
            bank_indices: vec![0],
            packing: Packing::Binary { bit_offset },
        };

        layout
            .checked_buffer_size()
            .ok_or(RasterError::InvalidArgument("layout exceeds the address space"))?;

        Ok(layout)
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_bands(&self) -> usize {
        self.band_offsets.len()
    }

    /// Elements between horizontally adjacent pixels of a band.
    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    /// Elements between vertically adjacent pixels of a band.
    pub fn scanline_stride(&self) -> usize {
        self.scanline_stride
    }

    pub fn band_offsets(&self) -> &[usize] {
        &self.band_offsets
    }

    pub fn bank_indices(&self) -> &[usize] {
        &self.bank_indices
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    /// The number of banks a buffer for this layout must have.
    pub fn num_banks(&self) -> usize {
        self.bank_indices.iter().max().map_or(0, |max| max + 1)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.packing, Packing::Binary { .. })
    }

    /// The first bit of each row, for binary layouts.
    pub fn data_bit_offset(&self) -> usize {
        match self.packing {
            Packing::Binary { bit_offset } => bit_offset,
            Packing::Component => 0,
        }
    }

    /// One band per bank, consecutive pixels in consecutive elements.
    pub fn is_banded(&self) -> bool {
        if self.is_binary() || self.pixel_stride != 1 {
            return false;
        }

        let mut banks = self.bank_indices.clone();
        banks.sort_unstable();
        banks.dedup();
        banks.len() == self.bank_indices.len()
    }

    /// All bands share one bank and form a dense, non-overlapping pixel.
    pub fn is_pixel_sequential(&self) -> bool {
        if self.is_binary() || self.pixel_stride != self.num_bands() {
            return false;
        }

        let bank = self.bank_indices[0];
        if self.bank_indices.iter().any(|&b| b != bank) {
            return false;
        }

        let mut seen = vec![false; self.pixel_stride];
        for &off in &self.band_offsets {
            match seen.get_mut(off) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }

        true
    }

    /// The element at which a pixel starts, relative to the bank offset.
    ///
    /// For component layouts the band offset still needs to be added. For binary layouts this
    /// is the element holding the pixel's bit.
    pub fn offset(&self, x: usize, y: usize) -> usize {
        match self.packing {
            Packing::Component => y * self.scanline_stride + x * self.pixel_stride,
            Packing::Binary { bit_offset } => {
                y * self.scanline_stride + (bit_offset + x) / self.data_type.bits() as usize
            }
        }
    }

    /// The element of one sample of a pixel.
    pub fn sample_offset(&self, x: usize, y: usize, band: usize) -> usize {
        self.offset(x, y) + self.band_offsets[band]
    }

    /// The position of a pixel's bit within its element, counted from the most significant bit.
    pub fn bit_offset(&self, x: usize) -> usize {
        (self.data_bit_offset() + x) % self.data_type.bits() as usize
    }

    /// Significant bits of a band.
    pub fn sample_size(&self, _band: usize) -> u32 {
        match self.packing {
            Packing::Binary { .. } => 1,
            Packing::Component => self.data_type.bits(),
        }
    }

    pub fn sample_sizes(&self) -> Vec<u32> {
        (0..self.num_bands()).map(|b| self.sample_size(b)).collect()
    }

    fn checked_buffer_size(&self) -> Option<usize> {
        match self.packing {
            Packing::Binary { .. } => self.scanline_stride.checked_mul(self.height),
            Packing::Component => {
                let max_offset = *self.band_offsets.iter().max()?;
                let last_col = self.pixel_stride.checked_mul(self.width - 1)?;
                let last_row = self.scanline_stride.checked_mul(self.height - 1)?;
                max_offset
                    .checked_add(1)?
                    .checked_add(last_col)?
                    .checked_add(last_row)
            }
        }
    }

    /// Elements each bank must hold past its offset.
    pub fn buffer_size(&self) -> usize {
        // Validated at construction.
        self.checked_buffer_size().unwrap_or(usize::MAX)
    }

    /// A zeroed buffer which fits this layout.
    pub fn create_buffer(&self) -> DataBuffer {
        DataBuffer::zeroed(self.data_type, self.num_banks(), self.buffer_size())
    }

    /// A layout with the same band arrangement but a new size.
    ///
    /// Strides are rebuilt so that their relative order (pixel, scanline, band) stays the same
    /// while the new layout is as compact as possible. Bank indices are kept.
    pub fn derive_compatible(&self, width: usize, height: usize) -> Result<Self> {
        if let Packing::Binary { .. } = self.packing {
            return factory::create_binary(self.data_type, width, height, 0);
        }

        if width == 0 || height == 0 {
            return Err(RasterError::InvalidArgument("width and height must be positive"));
        }

        let num_bands = self.num_bands();
        let min_offset = self.band_offsets.iter().copied().min().unwrap_or(0);
        let max_offset = self.band_offsets.iter().copied().max().unwrap_or(0);
        let band_stride = max_offset - min_offset;

        let mut pixel_stride = self.pixel_stride;
        let mut line_stride = self.scanline_stride;
        let band_offsets;

        let compact = || -> Vec<usize> {
            self.band_offsets.iter().map(|off| off - min_offset).collect()
        };

        if pixel_stride > line_stride {
            if pixel_stride > band_stride {
                if line_stride > band_stride {
                    // pixel > line > band
                    band_offsets = compact();
                    line_stride = band_stride + 1;
                    pixel_stride = line_stride * height;
                } else {
                    // pixel > band > line
                    band_offsets = order_bands(&self.band_offsets, line_stride * height);
                    pixel_stride = num_bands * line_stride * height;
                }
            } else {
                // band > pixel > line
                pixel_stride = line_stride * height;
                band_offsets = order_bands(&self.band_offsets, pixel_stride * width);
            }
        } else if pixel_stride > band_stride {
            // line > pixel > band
            band_offsets = compact();
            pixel_stride = band_stride + 1;
            line_stride = pixel_stride * width;
        } else if line_stride > band_stride {
            // line > band > pixel
            band_offsets = order_bands(&self.band_offsets, pixel_stride * width);
            line_stride = num_bands * pixel_stride * width;
        } else {
            // band > line > pixel
            line_stride = pixel_stride * width;
            band_offsets = order_bands(&self.band_offsets, line_stride * height);
        }

        log::trace!(
            "derived layout {}x{} pixel stride {} line stride {} offsets {:?}",
            width,
            height,
            pixel_stride,
            line_stride,
            band_offsets
        );

        SampleLayout::component(
            self.data_type,
            width,
            height,
            pixel_stride,
            line_stride,
            band_offsets,
            self.bank_indices.clone(),
        )
    }

    /// A layout of a subset of the bands, keeping each selected band's offset and bank.
    pub fn subset_bands(&self, bands: &[usize]) -> Result<Self> {
        if bands.is_empty() {
            return Err(RasterError::InvalidArgument("band subset must not be empty"));
        }

        if bands.iter().any(|&b| b >= self.num_bands()) {
            return Err(RasterError::InvalidArgument("band subset index out of range"));
        }

        if self.is_binary() {
            return Ok(self.clone());
        }

        let band_offsets = bands.iter().map(|&b| self.band_offsets[b]).collect();
        let bank_indices = bands.iter().map(|&b| self.bank_indices[b]).collect();

        SampleLayout::component(
            self.data_type,
            self.width,
            self.height,
            self.pixel_stride,
            self.scanline_stride,
            band_offsets,
            bank_indices,
        )
    }
}

/// Assign offsets `0, step, 2*step, ..` in the ascending order of the original offsets.
///
/// Equal offsets are ranked by band index.
fn order_bands(orig: &[usize], step: usize) -> Vec<usize> {
    let mut map: Vec<usize> = (0..orig.len()).collect();
    let mut ordered = vec![0; orig.len()];

    for i in 0..orig.len() {
        let mut index = i;
        for j in i + 1..orig.len() {
            if orig[map[index]] > orig[map[j]] {
                index = j;
            }
        }
        ordered[map[index]] = i * step;
        map[index] = map[i];
    }

    ordered
}

// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Constructors for the common layout shapes.
use super::SampleLayout;
use crate::error::{RasterError, Result};
use crate::sample::DataType;

/// Pixel-interleaved samples in a single bank.
///
/// Band `i` is stored at offset `num_bands - 1 - i` within the pixel, so the first band comes
/// last in memory. This matches the historical behaviour of this constructor and is relied on
/// by callers that store BGR data.
pub fn create_interleaved(
    data_type: DataType,
    width: usize,
    height: usize,
    num_bands: usize,
) -> Result<SampleLayout> {
    if num_bands == 0 {
        return Err(RasterError::InvalidArgument("at least one band is required"));
    }

    let band_offsets = (0..num_bands).map(|i| num_bands - 1 - i).collect();
    let scanline_stride = width
        .checked_mul(num_bands)
        .ok_or(RasterError::InvalidArgument("layout exceeds the address space"))?;

    SampleLayout::component(
        data_type,
        width,
        height,
        num_bands,
        scanline_stride,
        band_offsets,
        vec![0; num_bands],
    )
}

/// Pixel-interleaved samples in a single bank, with explicit strides and offsets.
pub fn create_pixel_interleaved(
    data_type: DataType,
    width: usize,
    height: usize,
    pixel_stride: usize,
    scanline_stride: usize,
    band_offsets: Vec<usize>,
) -> Result<SampleLayout> {
    let min = band_offsets.iter().copied().min();
    let max = band_offsets.iter().copied().max();
    let span = match (min, max) {
        (Some(min), Some(max)) => max - min,
        _ => return Err(RasterError::InvalidArgument("at least one band is required")),
    };

    if span > scanline_stride {
        return Err(RasterError::InvalidArgument(
            "band offsets spread wider than the scanline stride",
        ));
    }

    if pixel_stride.saturating_mul(width) > scanline_stride {
        return Err(RasterError::InvalidArgument(
            "pixel stride times width exceeds the scanline stride",
        ));
    }

    if pixel_stride < span {
        return Err(RasterError::InvalidArgument(
            "pixel stride smaller than the band offset spread",
        ));
    }

    let num_bands = band_offsets.len();
    SampleLayout::component(
        data_type,
        width,
        height,
        pixel_stride,
        scanline_stride,
        band_offsets,
        vec![0; num_bands],
    )
}

/// One band per bank with a pixel stride of 1 and a scanline stride of `width`.
///
/// Banks default to `0..num_bands` and offsets to zero. When both are given they must have the
/// same length.
pub fn create_banded(
    data_type: DataType,
    width: usize,
    height: usize,
    num_bands: usize,
    bank_indices: Option<Vec<usize>>,
    band_offsets: Option<Vec<usize>>,
) -> Result<SampleLayout> {
    if num_bands == 0 {
        return Err(RasterError::InvalidArgument("at least one band is required"));
    }

    let bank_indices = bank_indices.unwrap_or_else(|| (0..num_bands).collect());
    let band_offsets = band_offsets.unwrap_or_else(|| vec![0; bank_indices.len()]);

    if bank_indices.len() != band_offsets.len() {
        return Err(RasterError::InvalidArgument(
            "bank indices and band offsets differ in length",
        ));
    }

    SampleLayout::component(data_type, width, height, 1, width, band_offsets, bank_indices)
}

/// A bit-packed single band layout with the smallest possible scanline stride.
pub fn create_binary(
    data_type: DataType,
    width: usize,
    height: usize,
    bit_offset: usize,
) -> Result<SampleLayout> {
    let bits = data_type.bits() as usize;
    let scanline_stride = width
        .checked_add(bit_offset)
        .and_then(|bits_per_row| bits_per_row.checked_add(bits - 1))
        .ok_or(RasterError::InvalidArgument("layout exceeds the address space"))?
        / bits;
    SampleLayout::binary(data_type, width, height, scanline_stride, bit_offset)
}

/// A component layout shaped like `existing`: banded if it is banded, interleaved otherwise.
pub fn create_component(
    existing: &SampleLayout,
    data_type: DataType,
    width: usize,
    height: usize,
    num_bands: usize,
) -> Result<SampleLayout> {
    if existing.is_banded() {
        create_banded(data_type, width, height, num_bands, None, None)
    } else {
        create_interleaved(data_type, width, height, num_bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_offsets_are_reversed() {
        let layout = create_interleaved(DataType::UShort, 3, 2, 4).unwrap();
        assert_eq!(layout.band_offsets(), &[3, 2, 1, 0]);
        assert_eq!(layout.pixel_stride(), 4);
        assert_eq!(layout.scanline_stride(), 12);
        assert_eq!(layout.bank_indices(), &[0; 4]);
    }

    #[test]
    fn pixel_interleaved_validation() {
        assert!(create_pixel_interleaved(DataType::Byte, 4, 4, 3, 12, vec![0, 1, 2]).is_ok());
        // Spread beyond the pixel stride.
        assert!(create_pixel_interleaved(DataType::Byte, 4, 4, 2, 12, vec![0, 1, 3]).is_err());
        // Row does not fit its stride.
        assert!(create_pixel_interleaved(DataType::Byte, 4, 4, 3, 11, vec![0, 1, 2]).is_err());
        assert!(create_pixel_interleaved(DataType::Byte, 4, 4, 3, 12, vec![]).is_err());
    }

    #[test]
    fn banded_defaults_and_mismatch() {
        let layout = create_banded(DataType::Float, 5, 5, 3, None, None).unwrap();
        assert_eq!(layout.bank_indices(), &[0, 1, 2]);
        assert_eq!(layout.band_offsets(), &[0, 0, 0]);
        assert_eq!(layout.scanline_stride(), 5);
        assert_eq!(layout.num_banks(), 3);

        let err = create_banded(DataType::Float, 5, 5, 3, Some(vec![0, 1]), Some(vec![0]));
        assert!(err.is_err());
    }

    #[test]
    fn binary_backing_types() {
        let layout = create_binary(DataType::UShort, 17, 2, 0).unwrap();
        assert_eq!(layout.scanline_stride(), 2);
        assert!(layout.is_binary());
        assert_eq!(layout.sample_size(0), 1);
        assert_eq!(
            create_binary(DataType::Float, 8, 8, 0).unwrap_err().kind(),
            crate::ErrorKind::UnsupportedFormat
        );
    }

    #[test]
    fn component_follows_existing_shape() {
        let banded = create_banded(DataType::Byte, 2, 2, 2, None, None).unwrap();
        let interleaved = create_interleaved(DataType::Byte, 2, 2, 2).unwrap();
        assert!(create_component(&banded, DataType::Int, 3, 3, 3)
            .unwrap()
            .is_banded());
        assert!(create_component(&interleaved, DataType::Int, 3, 3, 3)
            .unwrap()
            .is_pixel_sequential());
    }
}

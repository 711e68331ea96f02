// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Uniform access to the samples of a raster region.
//!
//! A `RasterAccessor` presents one region of a raster as a set of per-band arrays with a pixel
//! stride, a scanline stride and a start offset per band. Depending on its `FormatTag` the arrays
//! are either the raster's own banks or canonical pixel-interleaved copies in the tag's data
//! type. Operators written against the accessor never need to know the physical layout.
//!
//! Copies must be committed with `write_back`. When the working type is wider than the raster's
//! storage, callers clamp first:
//!
//! ```
//! # use image_raster::*;
//! # fn main() -> Result<()> {
//! let layout = factory::create_interleaved(DataType::Byte, 3, 1, 1)?;
//! let mut raster = Raster::create_writable(layout.clone(), (0, 0));
//! let tag = FormatTag::new(&layout, DataType::Int, CopyMode::Copied, Expansion::Unexpanded);
//! let region = raster.bounds();
//!
//! let mut acc = RasterAccessor::new_mut(&mut raster, region, &tag, None)?;
//! acc.band_mut::<i32>(0).unwrap().copy_from_slice(&[-5, 130, 300]);
//! acc.clamp_data_arrays()?;
//! acc.write_back()?;
//! drop(acc);
//!
//! assert_eq!(raster.buffer().bank::<u8>(0), Some(&[0, 130, 255][..]));
//! # Ok(()) }
//! ```
use crate::binary;
use crate::error::{RasterError, Result};
use crate::layout::Rect;
use crate::palette::Palette;
use crate::raster::{Raster, Strided};
use crate::sample::{dispatch_sample, BandData, DataType, Sample, SampleVec};
use crate::tag::{CopyMode, Expansion, FormatTag};

enum RasterRef<'r> {
    Shared(&'r Raster),
    Exclusive(&'r mut Raster),
}

enum Storage {
    /// The raster's own banks.
    View,
    /// Arrays allocated by the accessor.
    Owned(Vec<SampleVec>),
}

/// Canonical per-band arrays over one region of a raster.
pub struct RasterAccessor<'r> {
    raster: RasterRef<'r>,
    rect: Rect,
    data_type: DataType,
    copied: bool,
    binary: bool,
    storage: Storage,
    /// Per band, the bank (view) or owned array holding it.
    band_arrays: Vec<usize>,
    /// Per band, the index of the region's first sample in its array.
    band_data_offsets: Vec<usize>,
    /// Per band, the offset of the sample within a pixel.
    band_offsets: Vec<usize>,
    pixel_stride: usize,
    scanline_stride: usize,
    packed: Option<Vec<u8>>,
}

struct Arrays {
    storage: Storage,
    band_arrays: Vec<usize>,
    band_data_offsets: Vec<usize>,
    band_offsets: Vec<usize>,
    pixel_stride: usize,
    scanline_stride: usize,
}

impl Arrays {
    /// A single owned array of `num_bands` interleaved samples per pixel.
    fn interleaved(data: SampleVec, num_bands: usize, width: usize) -> Self {
        Arrays {
            storage: Storage::Owned(vec![data]),
            band_arrays: vec![0; num_bands],
            band_data_offsets: (0..num_bands).collect(),
            band_offsets: (0..num_bands).collect(),
            pixel_stride: num_bands,
            scanline_stride: num_bands * width,
        }
    }
}

impl RasterRef<'_> {
    fn get(&self) -> &Raster {
        match self {
            RasterRef::Shared(raster) => raster,
            RasterRef::Exclusive(raster) => raster,
        }
    }
}

impl<'r> RasterAccessor<'r> {
    /// A read-only accessor, `write_back` is not available.
    pub fn new(
        raster: &'r Raster,
        rect: Rect,
        tag: &FormatTag,
        palette: Option<&Palette>,
    ) -> Result<Self> {
        Self::build(RasterRef::Shared(raster), rect, tag, palette)
    }

    /// An accessor that can modify the raster, directly or through `write_back`.
    pub fn new_mut(
        raster: &'r mut Raster,
        rect: Rect,
        tag: &FormatTag,
        palette: Option<&Palette>,
    ) -> Result<Self> {
        Self::build(RasterRef::Exclusive(raster), rect, tag, palette)
    }

    fn build(
        handle: RasterRef<'r>,
        rect: Rect,
        tag: &FormatTag,
        palette: Option<&Palette>,
    ) -> Result<Self> {
        let raster = handle.get();
        raster.check_region(&rect)?;
        let layout = raster.layout();
        check_tag(tag, raster)?;

        let copied = tag.copy == CopyMode::Copied;
        let binary = tag.is_binary_for(layout);
        let data_type;

        let arrays = if !copied {
            if layout.is_binary() {
                return Err(RasterError::FormatMismatch(
                    "binary rasters can not be accessed without a copy",
                ));
            }
            if tag.data_type != layout.data_type() {
                return Err(RasterError::FormatMismatch(
                    "uncopied tag type differs from the raster type",
                ));
            }

            data_type = layout.data_type();
            match (tag.expansion, palette) {
                (Expansion::Expanded, Some(palette)) => {
                    log::debug!("expanding {} palette indices in place", rect);
                    dispatch_sample!(data_type, T => expand_palette::<T>(raster, &rect, palette)?)
                }
                _ if tag.pixel_sequential => {
                    let start = raster.pixel_start(&rect);
                    let buffer = raster.buffer();
                    Arrays {
                        storage: Storage::View,
                        band_arrays: tag.bank_indices.clone(),
                        band_data_offsets: tag
                            .bank_indices
                            .iter()
                            .zip(&tag.band_offsets)
                            .map(|(&bank, &off)| buffer.offset(bank) + start + off)
                            .collect(),
                        band_offsets: tag.band_offsets.clone(),
                        pixel_stride: tag.pixel_stride,
                        scanline_stride: layout.scanline_stride(),
                    }
                }
                _ => Arrays {
                    storage: Storage::View,
                    band_arrays: layout.bank_indices().to_vec(),
                    band_data_offsets: (0..layout.num_bands())
                        .map(|band| raster.band_start(&rect, band))
                        .collect(),
                    band_offsets: layout.band_offsets().to_vec(),
                    pixel_stride: layout.pixel_stride(),
                    scanline_stride: layout.scanline_stride(),
                },
            }
        } else if binary {
            data_type = DataType::Byte;
            let bits = binary::unpack(raster, rect)?;
            Arrays::interleaved(SampleVec::Byte(bits), 1, rect.width)
        } else {
            data_type = tag.data_type;
            match (tag.expansion, palette) {
                (Expansion::Default | Expansion::Expanded, Some(palette)) => {
                    log::debug!("copying {} with palette expansion as {}", rect, data_type);
                    dispatch_sample!(data_type, T => expand_palette::<T>(raster, &rect, palette)?)
                }
                _ => {
                    log::debug!("copying {} as {}", rect, data_type);
                    dispatch_sample!(data_type, T => copy_bands::<T>(raster, &rect)?)
                }
            }
        };

        Ok(RasterAccessor {
            raster: handle,
            rect,
            data_type,
            copied,
            binary,
            storage: arrays.storage,
            band_arrays: arrays.band_arrays,
            band_data_offsets: arrays.band_data_offsets,
            band_offsets: arrays.band_offsets,
            pixel_stride: arrays.pixel_stride,
            scanline_stride: arrays.scanline_stride,
            packed: None,
        })
    }

    pub fn x(&self) -> i32 {
        self.rect.x
    }

    pub fn y(&self) -> i32 {
        self.rect.y
    }

    pub fn width(&self) -> usize {
        self.rect.width
    }

    pub fn height(&self) -> usize {
        self.rect.height
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn num_bands(&self) -> usize {
        self.band_arrays.len()
    }

    /// The type of the band arrays.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Whether the arrays are a copy that must be committed with `write_back`.
    pub fn is_data_copy(&self) -> bool {
        self.copied
    }

    /// Whether the arrays hold unpacked bits of a binary raster.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn raster(&self) -> &Raster {
        self.raster.get()
    }

    /// The full array holding a band, `None` if `T` is not the array type.
    pub fn band<T: Sample>(&self, band: usize) -> Option<&[T]> {
        let array = *self.band_arrays.get(band)?;
        match &self.storage {
            Storage::View => self.raster.get().buffer().bank(array),
            Storage::Owned(arrays) => arrays.get(array)?.as_slice(),
        }
    }

    /// Mutable band array. Views of a read-only raster give `None`.
    ///
    /// Bands may share one array, writing through one band is visible through the others.
    pub fn band_mut<T: Sample>(&mut self, band: usize) -> Option<&mut [T]> {
        let array = *self.band_arrays.get(band)?;
        match &mut self.storage {
            Storage::View => match &mut self.raster {
                RasterRef::Exclusive(raster) => raster.buffer_mut().bank_mut(array),
                RasterRef::Shared(_) => None,
            },
            Storage::Owned(arrays) => arrays.get_mut(array)?.as_mut_slice(),
        }
    }

    /// The array holding a band, with its type kept at runtime.
    pub fn band_data(&self, band: usize) -> Option<BandData<'_>> {
        let array = *self.band_arrays.get(band)?;
        match &self.storage {
            Storage::View => self.raster.get().buffer().bank_data(array),
            Storage::Owned(arrays) => arrays.get(array).map(SampleVec::as_band_data),
        }
    }

    /// Index of the region's first sample of `band` within its array.
    pub fn band_offset(&self, band: usize) -> Option<usize> {
        self.band_data_offsets.get(band).copied()
    }

    pub fn band_offsets(&self) -> &[usize] {
        &self.band_data_offsets
    }

    /// Offset of a band's sample relative to the start of its pixel.
    pub fn offset_for_band(&self, band: usize) -> Option<usize> {
        self.band_offsets.get(band).copied()
    }

    pub fn offsets_for_bands(&self) -> &[usize] {
        &self.band_offsets
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    pub fn scanline_stride(&self) -> usize {
        self.scanline_stride
    }

    /// Array index of a sample at a position relative to the region, `None` for a missing band.
    pub fn index(&self, band: usize, col: usize, row: usize) -> Option<usize> {
        let start = self.band_offset(band)?;
        Some(start + row * self.scanline_stride + col * self.pixel_stride)
    }

    fn strided(&self, band: usize) -> Strided {
        Strided {
            start: self.band_data_offsets[band],
            pixel_stride: self.pixel_stride,
            scanline_stride: self.scanline_stride,
        }
    }

    /// The region as packed bits, `ceil(width / 8)` bytes per row.
    ///
    /// Read from the raster on first use and kept afterwards.
    pub fn binary_data(&mut self) -> Result<&[u8]> {
        self.binary_data_mut().map(|data| &*data)
    }

    /// Modifiable packed bits, committed with `write_back_binary`.
    pub fn binary_data_mut(&mut self) -> Result<&mut [u8]> {
        if !self.binary {
            return Err(RasterError::InvalidArgument("accessor is not binary"));
        }

        let packed = match self.packed.take() {
            Some(packed) => packed,
            None => binary::packed_bits(self.raster.get(), self.rect)?,
        };

        Ok(self.packed.insert(packed).as_mut_slice())
    }

    /// Commit copied arrays to the raster.
    ///
    /// Views need no commit and return immediately. If there are fewer bands than the raster
    /// has, band 0 is written to the missing bands.
    pub fn write_back(&mut self) -> Result<()> {
        if !self.copied {
            return Ok(());
        }

        let raster_bands = self.raster.get().num_bands();
        if self.num_bands() < raster_bands {
            self.replicate_band_zero(raster_bands);
        }

        let rect = self.rect;
        let binary = self.binary;
        let planes: Vec<Strided> = (0..raster_bands).map(|b| self.strided(b)).collect();
        let band_arrays = &self.band_arrays;

        let (raster, arrays) = match (&mut self.raster, &self.storage) {
            (RasterRef::Exclusive(raster), Storage::Owned(arrays)) => (raster, arrays),
            (RasterRef::Shared(_), _) => {
                return Err(RasterError::InvalidArgument(
                    "write back requires a mutable raster",
                ))
            }
            (_, Storage::View) => return Ok(()),
        };

        if binary {
            let bits = match arrays.first() {
                Some(SampleVec::Byte(bits)) => bits,
                _ => return Err(RasterError::FormatMismatch("unpacked bits are not bytes")),
            };
            return binary::pack(bits, raster, rect);
        }

        for (band, plane) in planes.into_iter().enumerate() {
            let array = &arrays[band_arrays[band]];
            dispatch_sample!(array.data_type(), T => {
                let samples = array.as_slice::<T>().unwrap_or(&[]);
                raster.write_band(&rect, band, samples, plane)?
            });
        }

        Ok(())
    }

    /// Commit the packed bits, if they were ever requested.
    pub fn write_back_binary(&mut self) -> Result<()> {
        let packed = match &self.packed {
            Some(packed) if self.binary => packed,
            _ => return Ok(()),
        };

        match &mut self.raster {
            RasterRef::Exclusive(raster) => binary::set_packed_bits(packed, raster, self.rect),
            RasterRef::Shared(_) => Err(RasterError::InvalidArgument(
                "write back requires a mutable raster",
            )),
        }
    }

    /// Whether any band of the raster stores fewer than 32 bits per sample.
    pub fn needs_clamping(&self) -> bool {
        self.raster
            .get()
            .layout()
            .sample_sizes()
            .iter()
            .any(|&bits| bits < 32)
    }

    /// Clamp copied arrays to the range representable by the raster.
    ///
    /// Views already hold the raster's storage type and are left alone.
    pub fn clamp_data_arrays(&mut self) -> Result<()> {
        if !self.needs_clamping() || matches!(self.storage, Storage::View) {
            return Ok(());
        }

        let layout = self.raster.get().layout();
        let bits = layout.sample_sizes();
        let uniform = |size: u32| bits.iter().all(|&b| b == size);

        let (lo, hi): (Vec<f64>, Vec<f64>) = match layout.data_type() {
            DataType::UShort if uniform(16) => (vec![0.0], vec![f64::from(u16::MAX)]),
            DataType::Short if uniform(16) => {
                (vec![f64::from(i16::MIN)], vec![f64::from(i16::MAX)])
            }
            DataType::Int if uniform(32) => (vec![f64::from(i32::MIN)], vec![f64::from(i32::MAX)]),
            _ => (
                vec![0.0; bits.len()],
                bits.iter()
                    .map(|&b| ((1u64 << b.min(32)) - 1) as f64)
                    .collect(),
            ),
        };

        let bands = self.num_bands();
        let widen = |values: Vec<f64>| -> Vec<f64> {
            (0..bands)
                .map(|b| values.get(b).or(values.first()).copied().unwrap_or(0.0))
                .collect()
        };

        self.clamp(&widen(lo), &widen(hi))
    }

    /// Clamp every sample of band `b` into `lo[b]..=hi[b]`.
    pub fn clamp(&mut self, lo: &[f64], hi: &[f64]) -> Result<()> {
        let bands = self.num_bands();
        if lo.len() < bands || hi.len() < bands {
            return Err(RasterError::InvalidArgument("fewer clamp ranges than bands"));
        }

        let (width, height) = (self.rect.width, self.rect.height);
        for band in 0..bands {
            let plane = self.strided(band);
            let data_type = self.data_type;
            dispatch_sample!(data_type, T => {
                let data = self
                    .band_mut::<T>(band)
                    .ok_or(RasterError::InvalidArgument("band arrays are read-only"))?;
                clamp_plane(data, plane, width, height, lo[band], hi[band]);
            });
        }

        Ok(())
    }

    /// Extend to `num_bands` bands by aliasing band 0's array and offsets.
    ///
    /// Used where an operation produced fewer bands than its destination holds. Suspect
    /// behaviour kept for compatibility; a warning is logged whenever it takes effect.
    pub fn replicate_band_zero(&mut self, num_bands: usize) {
        let current = self.num_bands();
        if current == 0 || num_bands <= current {
            return;
        }

        log::warn!(
            "replicating band 0 into {} missing bands of {}",
            num_bands - current,
            self.rect
        );

        for _ in current..num_bands {
            self.band_arrays.push(self.band_arrays[0]);
            self.band_data_offsets.push(self.band_data_offsets[0]);
            self.band_offsets.push(self.band_offsets[0]);
        }
    }
}

/// Reject a tag that was derived for a differently shaped raster.
///
/// Uncopied pixel-sequential tags are used in place of the layout's own band geometry, so their
/// offsets must form a dense pixel and their banks must exist.
fn check_tag(tag: &FormatTag, raster: &Raster) -> Result<()> {
    let layout = raster.layout();
    if tag.num_bands != layout.num_bands() {
        return Err(RasterError::FormatMismatch(
            "tag band count differs from the raster",
        ));
    }

    if tag.copy == CopyMode::Copied {
        return Ok(());
    }

    if tag.pixel_stride != layout.pixel_stride()
        || tag.pixel_sequential != layout.is_pixel_sequential()
    {
        return Err(RasterError::FormatMismatch(
            "tag pixel geometry differs from the raster",
        ));
    }

    if tag.pixel_sequential {
        let bands = tag.num_bands;
        let mut seen = vec![false; tag.pixel_stride];
        let dense = tag.band_offsets.len() == bands
            && tag.band_offsets.iter().all(|&off| match seen.get_mut(off) {
                Some(slot) if !*slot => {
                    *slot = true;
                    true
                }
                _ => false,
            });
        let banks = tag.bank_indices.len() == bands
            && tag
                .bank_indices
                .iter()
                .all(|&bank| bank < raster.buffer().num_banks());
        if !dense || !banks {
            return Err(RasterError::FormatMismatch(
                "tag band offsets do not fit the raster",
            ));
        }
    }

    Ok(())
}

fn clamp_plane<T: Sample>(
    data: &mut [T],
    plane: Strided,
    width: usize,
    height: usize,
    lo: f64,
    hi: f64,
) {
    for row in 0..height {
        for col in 0..width {
            let idx = plane.index(col, row);
            let value = data[idx].to_f64();
            if value < lo {
                data[idx] = T::from_f64(lo);
            } else if value > hi {
                data[idx] = T::from_f64(hi);
            }
        }
    }
}

fn copy_bands<T: Sample>(raster: &Raster, rect: &Rect) -> Result<Arrays> {
    let bands = raster.num_bands();
    let mut data = vec![T::default(); rect.width * rect.height * bands];
    for band in 0..bands {
        raster.read_band(rect, band, &mut data, Strided::interleaved(band, bands, rect.width))?;
    }
    Ok(Arrays::interleaved(
        T::into_sample_vec(data),
        bands,
        rect.width,
    ))
}

fn expand_palette<T: Sample>(raster: &Raster, rect: &Rect, palette: &Palette) -> Result<Arrays> {
    let pixels = rect.width * rect.height;
    let mut indices = vec![0i32; pixels];
    raster.read_band(rect, 0, &mut indices, Strided::interleaved(0, 1, rect.width))?;

    let components: Vec<&[u8]> = (0..palette.num_components())
        .filter_map(|c| palette.component(c))
        .collect();
    let bands = components.len();

    let mut data = vec![T::default(); pixels * bands];
    for (pixel, &index) in indices.iter().enumerate() {
        let entry = usize::try_from(index)
            .ok()
            .filter(|&idx| idx < palette.map_size())
            .ok_or(RasterError::IndexOutOfBounds {
                band: 0,
                value: i64::from(index),
            })?;
        for (band, component) in components.iter().enumerate() {
            data[pixel * bands + band] = T::from_i32(i32::from(component[entry]));
        }
    }

    Ok(Arrays::interleaved(
        T::into_sample_vec(data),
        bands,
        rect.width,
    ))
}

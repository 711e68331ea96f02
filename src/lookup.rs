// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Per-band lookup tables.
//!
//! A table maps each integral source sample `v` of band `b` to `table[b][v - offset[b]]`. Tables
//! hold bytes, unsigned or signed shorts, or ints, and the result of applying a table has the
//! table's type regardless of the source type.
use crate::accessor::RasterAccessor;
use crate::error::{RasterError, Result};
use crate::layout::factory::create_component;
use crate::layout::{Rect, SampleLayout};
use crate::palette::Palette;
use crate::raster::Raster;
use crate::sample::{dispatch_integral, dispatch_sample, DataType, Sample};
use crate::tag::find_compatible_tag;

/// The entries of all bands of a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TableData {
    Byte(Vec<Vec<u8>>),
    UShort(Vec<Vec<u16>>),
    Short(Vec<Vec<i16>>),
    Int(Vec<Vec<i32>>),
}

/// A sample type that can be stored in a lookup table.
pub trait TableSample: Sample {
    fn into_table(bands: Vec<Vec<Self>>) -> TableData;
    fn table_bands(data: &TableData) -> Option<&[Vec<Self>]>;
}

macro_rules! table_sample {
    ($($ty:ty = $variant:ident),*) => {
        $(
            impl TableSample for $ty {
                fn into_table(bands: Vec<Vec<Self>>) -> TableData {
                    TableData::$variant(bands)
                }

                fn table_bands(data: &TableData) -> Option<&[Vec<Self>]> {
                    match data {
                        TableData::$variant(bands) => Some(bands.as_slice()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

table_sample!(u8 = Byte, u16 = UShort, i16 = Short, i32 = Int);

/// Tables with one entry list per band and a per-band index offset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupTable {
    data: TableData,
    offsets: Vec<i32>,
    entries: usize,
}

macro_rules! each_table {
    ($data:expr, $bands:ident => $body:expr) => {
        match $data {
            TableData::Byte($bands) => $body,
            TableData::UShort($bands) => $body,
            TableData::Short($bands) => $body,
            TableData::Int($bands) => $body,
        }
    };
}

impl TableData {
    pub fn data_type(&self) -> DataType {
        match self {
            TableData::Byte(_) => DataType::Byte,
            TableData::UShort(_) => DataType::UShort,
            TableData::Short(_) => DataType::Short,
            TableData::Int(_) => DataType::Int,
        }
    }

    pub fn num_bands(&self) -> usize {
        each_table!(self, bands => bands.len())
    }

    fn entry_i32(&self, band: usize, idx: usize) -> Option<i32> {
        each_table!(self, bands => bands.get(band)?.get(idx).map(|v| v.to_i32()))
    }

    fn entry_f32(&self, band: usize, idx: usize) -> Option<f32> {
        each_table!(self, bands => bands.get(band)?.get(idx).map(|v| v.to_f32()))
    }

    fn entry_f64(&self, band: usize, idx: usize) -> Option<f64> {
        each_table!(self, bands => bands.get(band)?.get(idx).map(|v| v.to_f64()))
    }
}

impl LookupTable {
    /// A table with the same index offset for every band.
    pub fn new<T: TableSample>(bands: Vec<Vec<T>>, offset: i32) -> Result<Self> {
        let offsets = vec![offset; bands.len()];
        Self::with_offsets(bands, offsets)
    }

    /// A table with its own index offset per band.
    ///
    /// Every band must have at least as many entries as band 0.
    pub fn with_offsets<T: TableSample>(bands: Vec<Vec<T>>, offsets: Vec<i32>) -> Result<Self> {
        let entries = match bands.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(RasterError::InvalidArgument("table without entries")),
        };

        if bands.iter().any(|band| band.len() < entries) {
            return Err(RasterError::InvalidArgument(
                "table band shorter than band 0",
            ));
        }

        if offsets.len() != bands.len() {
            return Err(RasterError::InvalidArgument(
                "table offsets and bands differ in length",
            ));
        }

        Ok(LookupTable {
            data: T::into_table(bands),
            offsets,
            entries,
        })
    }

    /// A three band byte table of the red, green and blue palette components.
    pub fn from_palette(palette: &Palette) -> Result<Self> {
        let bands = (0..3)
            .filter_map(|c| palette.component(c))
            .map(<[u8]>::to_vec)
            .collect();
        Self::new(bands, 0)
    }

    /// A single band byte ramp for a window centered on `level`, covering source values
    /// `min..=max`.
    ///
    /// Values below the window map to 0, values above it to 255, with a linear ramp between.
    pub fn window_level(window: f64, level: f64, min: i32, max: i32) -> Result<Self> {
        if max < min {
            return Err(RasterError::InvalidArgument("empty value range"));
        }

        let low = level - window / 2.0;
        let high = level + window / 2.0;
        let range = (high - low).max(1.0);
        let slope = 255.0 / range;
        let intercept = 255.0 - slope * high;

        let ramp: Vec<u8> = (min..=max)
            .map(|v| (slope * f64::from(v) + intercept) as i32)
            .map(|v| v.clamp(0, 255) as u8)
            .collect();

        log::debug!(
            "window {} level {} over {}..={}, slope {}",
            window,
            level,
            min,
            max,
            slope
        );

        Self::new(vec![ramp], min)
    }

    pub fn data(&self) -> &TableData {
        &self.data
    }

    pub fn num_bands(&self) -> usize {
        self.data.num_bands()
    }

    /// Entries per band.
    pub fn num_entries(&self) -> usize {
        self.entries
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Index offset of a band, `None` past the last band.
    pub fn offset(&self, band: usize) -> Option<i32> {
        self.offsets.get(band).copied()
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    /// Whether samples of this type can index a table.
    pub fn is_integral(data_type: DataType) -> bool {
        data_type.is_integral()
    }

    fn index(&self, band: usize, value: i32) -> Option<usize> {
        let offset = *self.offsets.get(band)?;
        let idx = i64::from(value) - i64::from(offset);
        usize::try_from(idx).ok().filter(|&idx| idx < self.entries)
    }

    /// `table[band][value - offset[band]]`, `None` when that lies outside the table.
    pub fn lookup(&self, band: usize, value: i32) -> Option<i32> {
        let idx = self.index(band, value)?;
        self.data.entry_i32(band, idx)
    }

    pub fn lookup_f32(&self, band: usize, value: i32) -> Option<f32> {
        let idx = self.index(band, value)?;
        self.data.entry_f32(band, idx)
    }

    pub fn lookup_f64(&self, band: usize, value: i32) -> Option<f64> {
        let idx = self.index(band, value)?;
        self.data.entry_f64(band, idx)
    }

    /// Bands produced from a source with `src_bands` bands.
    ///
    /// A single band source takes as many bands as the table has.
    pub fn dest_num_bands(&self, src_bands: usize) -> usize {
        if src_bands == 1 {
            self.num_bands()
        } else {
            src_bands
        }
    }

    /// A layout for the result of applying this table to `src` data, shaped like `src`.
    pub fn dest_layout(
        &self,
        src: &SampleLayout,
        width: usize,
        height: usize,
    ) -> Result<SampleLayout> {
        if !Self::is_integral(src.data_type()) {
            return Err(RasterError::UnsupportedFormat(
                "lookup source must be of an integral type",
            ));
        }

        let bands = self.dest_num_bands(src.num_bands());
        create_component(src, self.data_type(), width, height, bands)
    }

    /// Map a raster region into a new raster placed at the same region.
    ///
    /// Without a region the whole raster is mapped, otherwise the region is clipped to the
    /// raster bounds.
    pub fn lookup_raster(&self, src: &Raster, rect: Option<Rect>) -> Result<Raster> {
        if !Self::is_integral(src.layout().data_type()) {
            return Err(RasterError::UnsupportedFormat(
                "lookup source must be of an integral type",
            ));
        }

        let bounds = src.bounds();
        let rect = match rect {
            None => bounds,
            Some(rect) => rect
                .intersection(&bounds)
                .ok_or(RasterError::RegionOutOfBounds { region: rect, bounds })?,
        };

        let tag = find_compatible_tag(&[], src.layout());
        let accessor = RasterAccessor::new(src, rect, &tag, None)?;
        self.apply(&accessor)
    }

    /// Map the samples of an accessor into a new raster at the accessor's region.
    pub fn apply(&self, src: &RasterAccessor) -> Result<Raster> {
        if !Self::is_integral(src.data_type()) {
            return Err(RasterError::UnsupportedFormat(
                "lookup source must be of an integral type",
            ));
        }

        let bands = self.dest_num_bands(src.num_bands());
        let layout = create_component(
            src.raster().layout(),
            self.data_type(),
            src.width(),
            src.height(),
            bands,
        )?;

        let mut dst = Raster::create_writable(layout, (src.x(), src.y()));
        let rect = dst.bounds();
        let tag = find_compatible_tag(&[], dst.layout());
        let mut accessor = RasterAccessor::new_mut(&mut dst, rect, &tag, None)?;
        self.apply_to(src, &mut accessor)?;
        accessor.write_back()?;
        drop(accessor);

        Ok(dst)
    }

    /// Map the samples of `src` into the arrays of `dst`.
    ///
    /// Entries are converted to the type of the `dst` arrays, so a copied accessor of any type
    /// can receive them. A source with fewer bands than `dst`, or a table with fewer bands, uses
    /// its band 0 for every destination band. When `dst` views a raster directly and a sample
    /// falls outside the table, the bands and rows before it have already been written.
    pub fn apply_to(&self, src: &RasterAccessor, dst: &mut RasterAccessor) -> Result<()> {
        if dst.width() != src.width() || dst.height() != src.height() {
            return Err(RasterError::FormatMismatch(
                "destination and source regions differ in size",
            ));
        }

        let dst_bands = dst.num_bands();
        let src_bands = src.num_bands();
        let tbl_bands = self.num_bands();

        for band in 0..dst_bands {
            let src_band = if src_bands < dst_bands { 0 } else { band };
            let tbl_band = if tbl_bands < dst_bands { 0 } else { band };
            let plane = Plane {
                width: dst.width(),
                height: dst.height(),
                band: tbl_band,
                offset: self.offsets[tbl_band],
            };

            each_table!(&self.data, bands => {
                let table = bands
                    .get(tbl_band)
                    .map(|entries| &entries[..self.entries])
                    .ok_or(RasterError::InvalidArgument("table band missing"))?;
                dispatch_integral!(src.data_type(), S => {
                    dispatch_sample!(dst.data_type(), T => {
                        map_band::<S, _, T>(src, src_band, table, &plane, dst, band)?
                    })
                }, _ => {
                    return Err(RasterError::UnsupportedFormat(
                        "lookup source must be of an integral type",
                    ))
                })
            });
        }

        Ok(())
    }

    /// The entry closest to `pixel` in Euclidean distance over all bands, plus the offset of
    /// band 0.
    ///
    /// Of several equally close entries the first one wins.
    pub fn find_nearest_entry(&self, pixel: &[f32]) -> Result<i32> {
        let bands = self.num_bands();
        if pixel.len() < bands {
            return Err(RasterError::InvalidArgument(
                "pixel has fewer components than the table has bands",
            ));
        }

        let index = each_table!(&self.data, data => nearest(data, self.entries, pixel));
        Ok(index as i32 + self.offsets[0])
    }
}

struct Plane {
    width: usize,
    height: usize,
    /// The table band in use.
    band: usize,
    offset: i32,
}

fn map_band<S: Sample, D: Sample, T: Sample>(
    src: &RasterAccessor,
    src_band: usize,
    table: &[D],
    plane: &Plane,
    dst: &mut RasterAccessor,
    dst_band: usize,
) -> Result<()> {
    let mismatch = RasterError::FormatMismatch("accessor arrays differ from their type");
    let src_data = src.band::<S>(src_band).ok_or(mismatch.clone())?;
    let src_start = src.band_offset(src_band).ok_or(mismatch.clone())?;
    let src_strides = (src.pixel_stride(), src.scanline_stride());

    let dst_start = dst.band_offset(dst_band).ok_or(mismatch.clone())?;
    let dst_strides = (dst.pixel_stride(), dst.scanline_stride());
    let dst_data = dst.band_mut::<T>(dst_band).ok_or(mismatch)?;

    lookup_plane(
        src_data,
        (src_start, src_strides.0, src_strides.1),
        table,
        plane,
        dst_data,
        (dst_start, dst_strides.0, dst_strides.1),
    )
}

/// Map one band, `(start, pixel stride, scanline stride)` for each side.
fn lookup_plane<S: Sample, D: Sample, T: Sample>(
    src: &[S],
    (src_start, src_ps, src_ls): (usize, usize, usize),
    table: &[D],
    plane: &Plane,
    dst: &mut [T],
    (dst_start, dst_ps, dst_ls): (usize, usize, usize),
) -> Result<()> {
    for row in 0..plane.height {
        let src_line = src_start + row * src_ls;
        let dst_line = dst_start + row * dst_ls;
        for col in 0..plane.width {
            let value = src[src_line + col * src_ps].to_i32();
            let idx = i64::from(value) - i64::from(plane.offset);
            let entry = usize::try_from(idx)
                .ok()
                .and_then(|idx| table.get(idx))
                .ok_or(RasterError::IndexOutOfBounds {
                    band: plane.band,
                    value: i64::from(value),
                })?;
            dst[dst_line + col * dst_ps] = entry.cast();
        }
    }

    Ok(())
}

fn nearest<T: Sample>(bands: &[Vec<T>], entries: usize, pixel: &[f32]) -> usize {
    let distance = |idx: usize| -> f32 {
        bands
            .iter()
            .zip(pixel)
            .map(|(band, &p)| {
                let delta = p - band[idx].to_f32();
                delta * delta
            })
            .sum()
    };

    let mut index = 0;
    let mut min = distance(0);
    for idx in 1..entries {
        let d = distance(idx);
        if d < min {
            min = d;
            index = idx;
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DataBuffer;
    use crate::layout::factory::{create_banded, create_binary, create_interleaved};

    #[test]
    fn lookup_applies_offset() {
        let table = LookupTable::new(vec![vec![5u8, 6, 7]], 10).unwrap();
        assert_eq!(table.lookup(0, 10), Some(5));
        assert_eq!(table.lookup(0, 12), Some(7));
        assert_eq!(table.lookup(0, 9), None);
        assert_eq!(table.lookup(0, 13), None);
        assert_eq!(table.lookup(1, 10), None);
        assert_eq!(table.lookup_f64(0, 11), Some(6.0));
    }

    #[test]
    fn ushort_tables_are_unsigned() {
        let table = LookupTable::new(vec![vec![0xffffu16]], 0).unwrap();
        assert_eq!(table.lookup(0, 0), Some(65535));
        let table = LookupTable::new(vec![vec![-1i16]], 0).unwrap();
        assert_eq!(table.lookup(0, 0), Some(-1));
        assert_eq!(table.data_type(), DataType::Short);
    }

    #[test]
    fn construction_checks() {
        assert!(LookupTable::new(Vec::<Vec<u8>>::new(), 0).is_err());
        assert!(LookupTable::new(vec![Vec::<u8>::new()], 0).is_err());
        assert!(LookupTable::new(vec![vec![1u8, 2], vec![1]], 0).is_err());
        assert!(LookupTable::with_offsets(vec![vec![1u8]], vec![0, 1]).is_err());
    }

    #[test]
    fn dest_bands_and_layout() {
        let table = LookupTable::new(vec![vec![0i32; 4]; 3], 0).unwrap();
        assert_eq!(table.dest_num_bands(1), 3);
        assert_eq!(table.dest_num_bands(2), 2);

        let src = create_banded(DataType::Byte, 4, 4, 1, None, None).unwrap();
        let dst = table.dest_layout(&src, 2, 2).unwrap();
        assert_eq!(dst.data_type(), DataType::Int);
        assert_eq!(dst.num_bands(), 3);
        assert!(dst.is_banded());

        let float = create_interleaved(DataType::Float, 4, 4, 1).unwrap();
        assert!(table.dest_layout(&float, 4, 4).is_err());
    }

    #[test]
    fn signed_source_sign_extends() {
        let layout = create_interleaved(DataType::Short, 2, 1, 1).unwrap();
        let buffer = DataBuffer::from_vec(vec![-2i16, 1]);
        let raster = Raster::new(layout, buffer, (0, 0)).unwrap();
        let table = LookupTable::new(vec![vec![100u16, 101, 102, 103]], -2).unwrap();
        let out = table.lookup_raster(&raster, None).unwrap();
        assert_eq!(out.layout().data_type(), DataType::UShort);
        assert_eq!(out.buffer().bank::<u16>(0), Some(&[100, 103][..]));
    }

    #[test]
    fn out_of_range_sample() {
        let layout = create_interleaved(DataType::UShort, 2, 1, 1).unwrap();
        let buffer = DataBuffer::from_vec(vec![0u16, 0xffff]);
        let raster = Raster::new(layout, buffer, (0, 0)).unwrap();
        let table = LookupTable::new(vec![vec![1u8; 256]], 0).unwrap();
        let err = table.lookup_raster(&raster, None).unwrap_err();
        assert_eq!(
            err,
            RasterError::IndexOutOfBounds {
                band: 0,
                value: 65535
            }
        );
    }

    #[test]
    fn region_is_clipped() {
        let layout = create_interleaved(DataType::Byte, 4, 4, 1).unwrap();
        let raster = Raster::create_writable(layout, (0, 0));
        let table = LookupTable::new(vec![vec![9u8]], 0).unwrap();
        let out = table
            .lookup_raster(&raster, Some(Rect::new(2, 3, 10, 10)))
            .unwrap();
        assert_eq!(out.bounds(), Rect::new(2, 3, 2, 1));
        assert_eq!(out.buffer().bank::<u8>(0), Some(&[9, 9][..]));
        assert!(table
            .lookup_raster(&raster, Some(Rect::new(8, 8, 1, 1)))
            .is_err());
    }

    #[test]
    fn binary_source() {
        let layout = create_binary(DataType::Byte, 4, 1, 0).unwrap();
        let buffer = DataBuffer::from_vec(vec![0b1001_0000u8]);
        let raster = Raster::new(layout, buffer, (0, 0)).unwrap();
        let table = LookupTable::new(vec![vec![0u8, 255]], 0).unwrap();
        let out = table.lookup_raster(&raster, None).unwrap();
        assert_eq!(out.buffer().bank::<u8>(0), Some(&[255, 0, 0, 255][..]));
    }

    #[test]
    fn float_source_rejected() {
        let layout = create_interleaved(DataType::Double, 2, 2, 1).unwrap();
        let raster = Raster::create_writable(layout, (0, 0));
        let table = LookupTable::new(vec![vec![0u8]], 0).unwrap();
        let err = table.lookup_raster(&raster, None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn nearest_entry_ties_keep_first() {
        let table = LookupTable::with_offsets(
            vec![vec![0u8, 10, 10, 200], vec![0, 10, 10, 200]],
            vec![3, 0],
        )
        .unwrap();
        assert_eq!(table.find_nearest_entry(&[9.0, 11.0]), Ok(1 + 3));
        assert_eq!(table.find_nearest_entry(&[255.0, 255.0]), Ok(3 + 3));
        assert!(table.find_nearest_entry(&[1.0]).is_err());
    }

    #[test]
    fn window_level_ramp() {
        let table = LookupTable::window_level(100.0, 50.0, -10, 110).unwrap();
        assert_eq!(table.offset(0), Some(-10));
        assert_eq!(table.offset(1), None);
        assert_eq!(table.num_entries(), 121);
        assert_eq!(table.lookup(0, -10), Some(0));
        assert_eq!(table.lookup(0, 0), Some(0));
        assert_eq!(table.lookup(0, 50), Some(127));
        assert_eq!(table.lookup(0, 100), Some(255));
        assert_eq!(table.lookup(0, 110), Some(255));
    }

    #[test]
    fn palette_table() {
        let palette = Palette::new(vec![1, 2], vec![3, 4], vec![5, 6]).unwrap();
        let table = LookupTable::from_palette(&palette).unwrap();
        assert_eq!(table.num_bands(), 3);
        assert_eq!(table.lookup(2, 1), Some(6));
    }
}

// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use crate::buffer::DataBuffer;
use crate::error::{RasterError, Result};
use crate::layout::{Rect, SampleLayout};
use crate::sample::{dispatch_sample, Sample};

/// A layout paired with a buffer that fits it, placed at an origin.
///
/// The buffer is validated against the layout on construction, all indices derived from the
/// layout within the bounds address existing elements.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    layout: SampleLayout,
    buffer: DataBuffer,
    min_x: i32,
    min_y: i32,
}

/// Where the samples of one band go in a plain array.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Strided {
    pub start: usize,
    pub pixel_stride: usize,
    pub scanline_stride: usize,
}

impl Strided {
    /// Band `band` of `num_bands` interleaved samples in rows of `width` pixels.
    pub fn interleaved(band: usize, num_bands: usize, width: usize) -> Self {
        Strided {
            start: band,
            pixel_stride: num_bands,
            scanline_stride: num_bands * width,
        }
    }

    pub fn index(&self, col: usize, row: usize) -> usize {
        self.start + row * self.scanline_stride + col * self.pixel_stride
    }
}

impl Raster {
    pub fn new(layout: SampleLayout, buffer: DataBuffer, origin: (i32, i32)) -> Result<Self> {
        if layout.data_type() != buffer.data_type() {
            return Err(RasterError::FormatMismatch(
                "buffer type differs from the layout type",
            ));
        }

        if buffer.num_banks() < layout.num_banks() {
            return Err(RasterError::InvalidArgument(
                "buffer has fewer banks than the layout references",
            ));
        }

        let size = layout.buffer_size();
        if layout
            .bank_indices()
            .iter()
            .any(|&bank| buffer.bank_size(bank) < size)
        {
            return Err(RasterError::InvalidArgument("bank too small for the layout"));
        }

        Ok(Raster {
            layout,
            buffer,
            min_x: origin.0,
            min_y: origin.1,
        })
    }

    /// A raster with a zeroed buffer.
    pub fn create_writable(layout: SampleLayout, origin: (i32, i32)) -> Self {
        let buffer = layout.create_buffer();
        Raster {
            layout,
            buffer,
            min_x: origin.0,
            min_y: origin.1,
        }
    }

    pub fn layout(&self) -> &SampleLayout {
        &self.layout
    }

    pub fn buffer(&self) -> &DataBuffer {
        &self.buffer
    }

    /// Mutable access to the samples, the layout itself stays fixed.
    pub fn buffer_mut(&mut self) -> &mut DataBuffer {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> DataBuffer {
        self.buffer
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    pub fn height(&self) -> usize {
        self.layout.height()
    }

    pub fn num_bands(&self) -> usize {
        self.layout.num_bands()
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.width(), self.height())
    }

    /// Fail unless `region` lies within the bounds.
    pub fn check_region(&self, region: &Rect) -> Result<()> {
        let bounds = self.bounds();
        if bounds.contains(region) {
            Ok(())
        } else {
            Err(RasterError::RegionOutOfBounds {
                region: *region,
                bounds,
            })
        }
    }

    /// Element index, within the bank, of the first sample of a band in a region.
    pub(crate) fn band_start(&self, region: &Rect, band: usize) -> usize {
        let bank = self.layout.bank_indices()[band];
        let (x, y) = self.local(region);
        self.buffer.offset(bank) + self.layout.sample_offset(x, y, band)
    }

    /// Element index, relative to a bank's offset, at which the region's first pixel starts.
    pub(crate) fn pixel_start(&self, region: &Rect) -> usize {
        let (x, y) = self.local(region);
        self.layout.offset(x, y)
    }

    fn local(&self, region: &Rect) -> (usize, usize) {
        let x = i64::from(region.x) - i64::from(self.min_x);
        let y = i64::from(region.y) - i64::from(self.min_y);
        (x as usize, y as usize)
    }

    /// Read all bands of a region as interleaved samples.
    pub fn pixels<T: Sample>(&self, region: Rect) -> Result<Vec<T>> {
        self.check_region(&region)?;
        let bands = self.num_bands();
        let mut out = vec![T::default(); region.width * region.height * bands];
        for band in 0..bands {
            let plane = Strided::interleaved(band, bands, region.width);
            self.read_band(&region, band, &mut out, plane)?;
        }
        Ok(out)
    }

    /// Write all bands of a region from interleaved samples.
    pub fn set_pixels<T: Sample>(&mut self, region: Rect, samples: &[T]) -> Result<()> {
        self.check_region(&region)?;
        let bands = self.num_bands();
        if samples.len() < region.width * region.height * bands {
            return Err(RasterError::InvalidArgument(
                "fewer samples than the region holds",
            ));
        }
        for band in 0..bands {
            let plane = Strided::interleaved(band, bands, region.width);
            self.write_band(&region, band, samples, plane)?;
        }
        Ok(())
    }

    /// Read one sample.
    pub fn sample<T: Sample>(&self, x: i32, y: i32, band: usize) -> Result<T> {
        if band >= self.num_bands() {
            return Err(RasterError::InvalidArgument("band index out of range"));
        }
        let mut out = [T::default()];
        let plane = Strided::interleaved(0, 1, 1);
        self.read_band(&Rect::new(x, y, 1, 1), band, &mut out, plane)?;
        Ok(out[0])
    }

    pub fn set_sample<T: Sample>(&mut self, x: i32, y: i32, band: usize, value: T) -> Result<()> {
        if band >= self.num_bands() {
            return Err(RasterError::InvalidArgument("band index out of range"));
        }
        let plane = Strided::interleaved(0, 1, 1);
        self.write_band(&Rect::new(x, y, 1, 1), band, &[value], plane)
    }

    /// Copy one band of a region into `out`, converting each sample.
    pub(crate) fn read_band<T: Sample>(
        &self,
        region: &Rect,
        band: usize,
        out: &mut [T],
        plane: Strided,
    ) -> Result<()> {
        self.check_region(region)?;
        dispatch_sample!(self.layout.data_type(), S => self.read_band_as::<S, T>(region, band, out, plane))
    }

    /// Copy one band of a region from `samples`, converting each sample.
    pub(crate) fn write_band<T: Sample>(
        &mut self,
        region: &Rect,
        band: usize,
        samples: &[T],
        plane: Strided,
    ) -> Result<()> {
        self.check_region(region)?;
        dispatch_sample!(self.layout.data_type(), S => self.write_band_as::<S, T>(region, band, samples, plane))
    }

    fn read_band_as<S: Sample, T: Sample>(
        &self,
        region: &Rect,
        band: usize,
        out: &mut [T],
        plane: Strided,
    ) -> Result<()> {
        let bank = self.layout.bank_indices()[band];
        let data = self
            .buffer
            .bank::<S>(bank)
            .ok_or(RasterError::FormatMismatch("bank type differs from the layout"))?;
        let (x0, y0) = self.local(region);

        if self.layout.is_binary() {
            let bits = S::DATA_TYPE.bits() as usize;
            let base = self.buffer.offset(bank);
            for row in 0..region.height {
                for col in 0..region.width {
                    let elem = base + self.layout.offset(x0 + col, y0 + row);
                    let shift = bits - 1 - self.layout.bit_offset(x0 + col);
                    let bit = (data[elem].to_i32() >> shift) & 1;
                    out[plane.index(col, row)] = T::from_i32(bit);
                }
            }
            return Ok(());
        }

        let start = self.band_start(region, band);
        let ps = self.layout.pixel_stride();
        let ls = self.layout.scanline_stride();
        for row in 0..region.height {
            let line = start + row * ls;
            for col in 0..region.width {
                out[plane.index(col, row)] = data[line + col * ps].cast();
            }
        }

        Ok(())
    }

    fn write_band_as<S: Sample, T: Sample>(
        &mut self,
        region: &Rect,
        band: usize,
        samples: &[T],
        plane: Strided,
    ) -> Result<()> {
        let bank = self.layout.bank_indices()[band];
        let (x0, y0) = self.local(region);
        let start = self.band_start(region, band);
        let base = self.buffer.offset(bank);
        let layout = &self.layout;
        let data = self
            .buffer
            .bank_mut::<S>(bank)
            .ok_or(RasterError::FormatMismatch("bank type differs from the layout"))?;

        if layout.is_binary() {
            let bits = S::DATA_TYPE.bits() as usize;
            for row in 0..region.height {
                for col in 0..region.width {
                    let elem = base + layout.offset(x0 + col, y0 + row);
                    let mask = 1i32 << (bits - 1 - layout.bit_offset(x0 + col));
                    let unit = data[elem].to_i32();
                    let value = if samples[plane.index(col, row)].to_i32() & 1 != 0 {
                        unit | mask
                    } else {
                        unit & !mask
                    };
                    data[elem] = S::from_i32(value);
                }
            }
            return Ok(());
        }

        let ps = layout.pixel_stride();
        let ls = layout.scanline_stride();
        for row in 0..region.height {
            let line = start + row * ls;
            for col in 0..region.width {
                data[line + col * ps] = samples[plane.index(col, row)].cast();
            }
        }

        Ok(())
    }
}

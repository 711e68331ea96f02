// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! # Raster
//!
//! Layout independent access to in-memory raster samples.
//!
//! Samples may be banded, pixel-interleaved with arbitrary strides, or bit-packed, in any of six
//! primitive types. A `Raster` pairs such a `SampleLayout` with its `DataBuffer`. Operators do not
//! touch the layout directly. They request a `FormatTag` per participating raster, obtain a
//! `RasterAccessor` for the region they work on, and read or write canonical per-band arrays.
//!
//! ## Usage
//!
//! Mapping a 16-bit image through a window/level table into bytes:
//!
//! ```
//! use image_raster::{factory, DataBuffer, DataType, LookupTable, Raster};
//!
//! let layout = factory::create_interleaved(DataType::UShort, 4, 1, 1)?;
//! let buffer = DataBuffer::from_vec(vec![0u16, 1000, 2000, 4095]);
//! let raster = Raster::new(layout, buffer, (0, 0))?;
//!
//! let table = LookupTable::window_level(2000.0, 1000.0, 0, 4095)?;
//! let bytes = table.lookup_raster(&raster, None)?;
//!
//! assert_eq!(bytes.buffer().bank::<u8>(0), Some(&[0, 127, 255, 255][..]));
//! # Ok::<(), image_raster::RasterError>(())
//! ```
// No module needs `unsafe`, all reinterpretation goes through `bytemuck`.
#![deny(unsafe_code)]

mod accessor;
pub mod binary;
mod buffer;
mod error;
pub mod layout;
mod lookup;
mod palette;
mod raster;
mod sample;
mod tag;

pub use self::accessor::RasterAccessor;
pub use self::buffer::DataBuffer;
pub use self::error::{ErrorKind, RasterError, Result};
pub use self::layout::{factory, Packing, Rect, SampleLayout};
pub use self::lookup::{LookupTable, TableData, TableSample};
pub use self::palette::{ColorModel, Palette};
pub use self::raster::Raster;
pub use self::sample::{BandData, DataType, Sample, SampleVec};
pub use self::tag::{
    find_compatible_tag, find_compatible_tags, find_compatible_tags_with, CopyMode, Expansion,
    FormatTag, ImageFormat, TagOptions,
};

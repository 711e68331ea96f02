// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use thiserror::Error;

use crate::layout::Rect;

/// Errors raised by layout construction, region access, packing and table lookups.
///
/// All errors are raised synchronously to the caller. Operations that build into freshly
/// allocated buffers leave no observable partial state behind when they fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// A parameter was malformed, e.g. a zero dimension or mismatched array lengths.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// A requested region does not lie within the raster bounds.
    #[error("region {region} outside of the raster bounds {bounds}")]
    RegionOutOfBounds { region: Rect, bounds: Rect },
    /// A value indexed outside of a table or palette.
    #[error("value {value} out of range of band {band}")]
    IndexOutOfBounds { band: usize, value: i64 },
    /// The data type is not handled by the operation.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(&'static str),
    /// Types or sizes of the involved objects disagree.
    #[error("format mismatch: {0}")]
    FormatMismatch(&'static str),
}

/// The coarse classification of a `RasterError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfBounds,
    UnsupportedFormat,
    FormatMismatch,
}

impl RasterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RasterError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RasterError::RegionOutOfBounds { .. } | RasterError::IndexOutOfBounds { .. } => {
                ErrorKind::OutOfBounds
            }
            RasterError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            RasterError::FormatMismatch(_) => ErrorKind::FormatMismatch,
        }
    }
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_group_bounds_errors() {
        let rect = Rect::new(0, 0, 1, 1);
        let region = RasterError::RegionOutOfBounds {
            region: rect,
            bounds: rect,
        };
        let index = RasterError::IndexOutOfBounds { band: 0, value: 7 };
        assert_eq!(region.kind(), ErrorKind::OutOfBounds);
        assert_eq!(index.kind(), ErrorKind::OutOfBounds);
        assert_eq!(
            RasterError::InvalidArgument("x").kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn messages_name_the_region() {
        let err = RasterError::RegionOutOfBounds {
            region: Rect::new(2, 3, 4, 5),
            bounds: Rect::new(0, 0, 4, 4),
        };
        assert_eq!(
            err.to_string(),
            "region [x=2, y=3, 4x5] outside of the raster bounds [x=0, y=0, 4x4]"
        );
    }
}

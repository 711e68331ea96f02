// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Primitive sample types and their type-erased containers.
use core::fmt;

use crate::error::{RasterError, Result};

/// The primitive type of the samples stored in a buffer.
///
/// Variants are ordered by width. Promotion of several types to a common working type picks the
/// maximum under this ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    Byte,
    UShort,
    Short,
    Int,
    Float,
    Double,
}

impl DataType {
    /// Map the classic numeric data buffer type codes, `0` for bytes through `5` for doubles.
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => DataType::Byte,
            1 => DataType::UShort,
            2 => DataType::Short,
            3 => DataType::Int,
            4 => DataType::Float,
            5 => DataType::Double,
            _ => return Err(RasterError::UnsupportedFormat("unknown data type code")),
        })
    }

    pub const fn code(self) -> i32 {
        self as i32
    }

    /// The storage size of a single sample, in bits.
    pub const fn bits(self) -> u32 {
        match self {
            DataType::Byte => 8,
            DataType::UShort | DataType::Short => 16,
            DataType::Int | DataType::Float => 32,
            DataType::Double => 64,
        }
    }

    /// Byte, unsigned short, short and int.
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::UShort | DataType::Short | DataType::Int
        )
    }

    pub const fn is_float(self) -> bool {
        !self.is_integral()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DataType::Byte => "byte",
            DataType::UShort => "ushort",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Double => "double",
        };
        f.write_str(name)
    }
}

/// Run an expression with a type alias bound to the primitive of a `DataType`.
///
/// ```ignore
/// dispatch_sample!(data_type, T => buffer.bank::<T>(0).map(<[T]>::len))
/// ```
macro_rules! dispatch_sample {
    ($ty:expr, $T:ident => $body:expr) => {
        match $ty {
            $crate::sample::DataType::Byte => {
                type $T = u8;
                $body
            }
            $crate::sample::DataType::UShort => {
                type $T = u16;
                $body
            }
            $crate::sample::DataType::Short => {
                type $T = i16;
                $body
            }
            $crate::sample::DataType::Int => {
                type $T = i32;
                $body
            }
            $crate::sample::DataType::Float => {
                type $T = f32;
                $body
            }
            $crate::sample::DataType::Double => {
                type $T = f64;
                $body
            }
        }
    };
}

/// Like `dispatch_sample!` but only over the integral types, with an explicit fallback.
macro_rules! dispatch_integral {
    ($ty:expr, $T:ident => $body:expr, _ => $otherwise:expr) => {
        match $ty {
            $crate::sample::DataType::Byte => {
                type $T = u8;
                $body
            }
            $crate::sample::DataType::UShort => {
                type $T = u16;
                $body
            }
            $crate::sample::DataType::Short => {
                type $T = i16;
                $body
            }
            $crate::sample::DataType::Int => {
                type $T = i32;
                $body
            }
            $crate::sample::DataType::Float | $crate::sample::DataType::Double => $otherwise,
        }
    };
}

pub(crate) use dispatch_integral;
pub(crate) use dispatch_sample;

/// A primitive that can be stored as a raster sample.
///
/// Conversions follow raster conventions: integers read as `i32` are masked (unsigned) or
/// sign-extended (signed), floats truncate toward zero. Storing narrows by wrapping to the
/// storage width; floats stored into integers truncate to `i32` first.
pub trait Sample:
    bytemuck::Pod + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    const DATA_TYPE: DataType;

    fn to_i32(self) -> i32;
    fn to_f32(self) -> f32;
    fn to_f64(self) -> f64;

    fn from_i32(val: i32) -> Self;
    fn from_f32(val: f32) -> Self;
    fn from_f64(val: f64) -> Self;

    /// Convert into another sample type.
    fn cast<T: Sample>(self) -> T {
        if Self::DATA_TYPE.is_float() {
            T::from_f64(self.to_f64())
        } else {
            T::from_i32(self.to_i32())
        }
    }

    fn slice(vec: &SampleVec) -> Option<&[Self]>;
    fn slice_mut(vec: &mut SampleVec) -> Option<&mut [Self]>;
    fn band(data: BandData<'_>) -> Option<&[Self]>;
    fn into_sample_vec(vec: Vec<Self>) -> SampleVec;
}

macro_rules! integral_sample {
    ($($ty:ty = $variant:ident),*) => {
        $(
            impl Sample for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn to_i32(self) -> i32 {
                    i32::from(self)
                }

                fn to_f32(self) -> f32 {
                    self as f32
                }

                fn to_f64(self) -> f64 {
                    f64::from(self)
                }

                fn from_i32(val: i32) -> Self {
                    val as $ty
                }

                fn from_f32(val: f32) -> Self {
                    (val as i32) as $ty
                }

                fn from_f64(val: f64) -> Self {
                    (val as i32) as $ty
                }

                sample_containers!($ty = $variant);
            }
        )*
    };
}

macro_rules! float_sample {
    ($($ty:ty = $variant:ident),*) => {
        $(
            impl Sample for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn to_i32(self) -> i32 {
                    self as i32
                }

                fn to_f32(self) -> f32 {
                    self as f32
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_i32(val: i32) -> Self {
                    val as $ty
                }

                fn from_f32(val: f32) -> Self {
                    val as $ty
                }

                fn from_f64(val: f64) -> Self {
                    val as $ty
                }

                sample_containers!($ty = $variant);
            }
        )*
    };
}

macro_rules! sample_containers {
    ($ty:ty = $variant:ident) => {
        fn slice(vec: &SampleVec) -> Option<&[Self]> {
            match vec {
                SampleVec::$variant(data) => Some(data.as_slice()),
                _ => None,
            }
        }

        fn slice_mut(vec: &mut SampleVec) -> Option<&mut [Self]> {
            match vec {
                SampleVec::$variant(data) => Some(data.as_mut_slice()),
                _ => None,
            }
        }

        fn band(data: BandData<'_>) -> Option<&[Self]> {
            match data {
                BandData::$variant(data) => Some(data),
                _ => None,
            }
        }

        fn into_sample_vec(vec: Vec<Self>) -> SampleVec {
            SampleVec::$variant(vec)
        }
    };
}

integral_sample!(u8 = Byte, u16 = UShort, i16 = Short, i32 = Int);
float_sample!(f32 = Float, f64 = Double);

/// An owned, homogeneous array of samples.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleVec {
    Byte(Vec<u8>),
    UShort(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

/// A borrowed, homogeneous array of samples, with its type kept at runtime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BandData<'data> {
    Byte(&'data [u8]),
    UShort(&'data [u16]),
    Short(&'data [i16]),
    Int(&'data [i32]),
    Float(&'data [f32]),
    Double(&'data [f64]),
}

macro_rules! each_variant {
    ($value:expr, $data:ident => $body:expr) => {
        match $value {
            Self::Byte($data) => $body,
            Self::UShort($data) => $body,
            Self::Short($data) => $body,
            Self::Int($data) => $body,
            Self::Float($data) => $body,
            Self::Double($data) => $body,
        }
    };
}

impl SampleVec {
    /// An array of `len` zero samples.
    pub fn zeroed(data_type: DataType, len: usize) -> Self {
        dispatch_sample!(data_type, T => T::into_sample_vec(vec![T::default(); len]))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            SampleVec::Byte(_) => DataType::Byte,
            SampleVec::UShort(_) => DataType::UShort,
            SampleVec::Short(_) => DataType::Short,
            SampleVec::Int(_) => DataType::Int,
            SampleVec::Float(_) => DataType::Float,
            SampleVec::Double(_) => DataType::Double,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice<T: Sample>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    pub fn as_mut_slice<T: Sample>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    pub fn as_band_data(&self) -> BandData<'_> {
        match self {
            SampleVec::Byte(data) => BandData::Byte(data),
            SampleVec::UShort(data) => BandData::UShort(data),
            SampleVec::Short(data) => BandData::Short(data),
            SampleVec::Int(data) => BandData::Int(data),
            SampleVec::Float(data) => BandData::Float(data),
            SampleVec::Double(data) => BandData::Double(data),
        }
    }

    /// View the samples as native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        each_variant!(self, data => bytemuck::cast_slice(data))
    }

    /// The sample at `idx`, as `i32`.
    pub fn get_i32(&self, idx: usize) -> Option<i32> {
        each_variant!(self, data => data.get(idx).map(|v| v.to_i32()))
    }

    /// The sample at `idx`, as `f64`.
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        each_variant!(self, data => data.get(idx).map(|v| v.to_f64()))
    }
}

impl<'data> BandData<'data> {
    pub fn data_type(&self) -> DataType {
        match self {
            BandData::Byte(_) => DataType::Byte,
            BandData::UShort(_) => DataType::UShort,
            BandData::Short(_) => DataType::Short,
            BandData::Int(_) => DataType::Int,
            BandData::Float(_) => DataType::Float,
            BandData::Double(_) => DataType::Double,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_i32(&self, idx: usize) -> Option<i32> {
        each_variant!(self, data => data.get(idx).map(|v| v.to_i32()))
    }

    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        each_variant!(self, data => data.get(idx).map(|v| v.to_f64()))
    }

    pub fn as_bytes(&self) -> &'data [u8] {
        each_variant!(*self, data => bytemuck::cast_slice(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        for code in 0..6 {
            assert_eq!(DataType::from_code(code).map(DataType::code), Ok(code));
        }
        assert!(DataType::from_code(6).is_err());
        assert!(DataType::from_code(-1).is_err());
    }

    #[test]
    fn promotion_order() {
        assert!(DataType::Byte < DataType::UShort);
        assert!(DataType::UShort < DataType::Short);
        assert!(DataType::Int < DataType::Float);
        assert_eq!(
            [DataType::Short, DataType::Double, DataType::Int]
                .into_iter()
                .max(),
            Some(DataType::Double)
        );
    }

    #[test]
    fn integer_reads_mask_or_extend() {
        assert_eq!(0xffu8.to_i32(), 255);
        assert_eq!(0xffffu16.to_i32(), 65535);
        assert_eq!((-1i16).to_i32(), -1);
        assert_eq!((-1.75f32).to_i32(), -1);
        assert_eq!(f64::NAN.to_i32(), 0);
    }

    #[test]
    fn narrowing_wraps() {
        assert_eq!(u8::from_i32(300), 44);
        assert_eq!(i16::from_i32(40000), -25536);
        assert_eq!(u16::from_f32(65537.0), 1);
        assert_eq!(300i32.cast::<u8>(), 44);
        assert_eq!(2.9f64.cast::<u8>(), 2);
        assert_eq!(200u8.cast::<f32>(), 200.0);
    }

    #[test]
    fn sample_vec_views() {
        let vec = SampleVec::zeroed(DataType::UShort, 4);
        assert_eq!(vec.len(), 4);
        assert_eq!(vec.as_bytes().len(), 8);
        assert!(vec.as_slice::<u16>().is_some());
        assert!(vec.as_slice::<i16>().is_none());
        assert_eq!(vec.as_band_data().data_type(), DataType::UShort);
    }
}

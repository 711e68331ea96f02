// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use crate::error::{RasterError, Result};
use crate::sample::{BandData, DataType, Sample, SampleVec};

/// A set of sample banks sharing one data type.
///
/// Each bank carries an element offset at which its data begins. Layouts address samples
/// relative to that offset.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBuffer {
    data_type: DataType,
    banks: Vec<SampleVec>,
    offsets: Vec<usize>,
}

impl DataBuffer {
    /// Wrap banks with zero offsets.
    pub fn new(banks: Vec<SampleVec>) -> Result<Self> {
        let offsets = vec![0; banks.len()];
        Self::with_offsets(banks, offsets)
    }

    pub fn with_offsets(banks: Vec<SampleVec>, offsets: Vec<usize>) -> Result<Self> {
        let data_type = match banks.first() {
            Some(bank) => bank.data_type(),
            None => return Err(RasterError::InvalidArgument("buffer without banks")),
        };

        if banks.iter().any(|bank| bank.data_type() != data_type) {
            return Err(RasterError::FormatMismatch("banks of differing data types"));
        }

        if offsets.len() != banks.len() {
            return Err(RasterError::InvalidArgument(
                "bank offsets and banks differ in length",
            ));
        }

        if banks.iter().zip(&offsets).any(|(bank, &off)| off > bank.len()) {
            return Err(RasterError::InvalidArgument("bank offset beyond its data"));
        }

        Ok(DataBuffer {
            data_type,
            banks,
            offsets,
        })
    }

    /// A buffer with a single bank.
    pub fn from_vec<T: Sample>(data: Vec<T>) -> Self {
        DataBuffer {
            data_type: T::DATA_TYPE,
            banks: vec![T::into_sample_vec(data)],
            offsets: vec![0],
        }
    }

    pub fn from_banks<T: Sample>(banks: Vec<Vec<T>>) -> Result<Self> {
        Self::new(banks.into_iter().map(T::into_sample_vec).collect())
    }

    /// Zero-initialized banks of equal size.
    pub fn zeroed(data_type: DataType, num_banks: usize, size: usize) -> Self {
        DataBuffer {
            data_type,
            banks: (0..num_banks)
                .map(|_| SampleVec::zeroed(data_type, size))
                .collect(),
            offsets: vec![0; num_banks],
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn num_banks(&self) -> usize {
        self.banks.len()
    }

    pub fn offset(&self, bank: usize) -> usize {
        self.offsets.get(bank).copied().unwrap_or(0)
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The number of addressable elements of a bank, past its offset.
    pub fn bank_size(&self, bank: usize) -> usize {
        match self.banks.get(bank) {
            Some(data) => data.len() - self.offset(bank),
            None => 0,
        }
    }

    pub fn bank<T: Sample>(&self, bank: usize) -> Option<&[T]> {
        self.banks.get(bank)?.as_slice()
    }

    pub fn bank_mut<T: Sample>(&mut self, bank: usize) -> Option<&mut [T]> {
        self.banks.get_mut(bank)?.as_mut_slice()
    }

    pub fn bank_data(&self, bank: usize) -> Option<BandData<'_>> {
        self.banks.get(bank).map(SampleVec::as_band_data)
    }

    pub fn bank_bytes(&self, bank: usize) -> Option<&[u8]> {
        self.banks.get(bank).map(SampleVec::as_bytes)
    }

    pub fn banks(&self) -> &[SampleVec] {
        &self.banks
    }

    pub fn into_banks(self) -> Vec<SampleVec> {
        self.banks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_banks_are_rejected() {
        let banks = vec![
            SampleVec::zeroed(DataType::Byte, 4),
            SampleVec::zeroed(DataType::Short, 4),
        ];
        assert_eq!(
            DataBuffer::new(banks).unwrap_err().kind(),
            crate::ErrorKind::FormatMismatch
        );
        assert!(DataBuffer::new(vec![]).is_err());
    }

    #[test]
    fn typed_access() {
        let mut buffer = DataBuffer::from_banks(vec![vec![1u16, 2], vec![3, 4]]).unwrap();
        assert_eq!(buffer.data_type(), DataType::UShort);
        assert_eq!(buffer.bank::<u16>(1), Some(&[3, 4][..]));
        assert!(buffer.bank::<u8>(0).is_none());
        buffer.bank_mut::<u16>(0).unwrap()[1] = 9;
        assert_eq!(buffer.bank_bytes(0).map(<[u8]>::len), Some(4));
        assert_eq!(buffer.bank::<u16>(0), Some(&[1, 9][..]));
    }

    #[test]
    fn offsets_shrink_bank_size() {
        let banks = vec![SampleVec::zeroed(DataType::Int, 10)];
        let buffer = DataBuffer::with_offsets(banks, vec![3]).unwrap();
        assert_eq!(buffer.bank_size(0), 7);
        assert_eq!(buffer.offset(0), 3);
    }
}

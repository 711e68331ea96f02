// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
use crate::error::{RasterError, Result};

/// An index color palette with 8-bit components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Palette {
    reds: Vec<u8>,
    greens: Vec<u8>,
    blues: Vec<u8>,
    alphas: Option<Vec<u8>>,
}

/// How the samples of an image are interpreted as color.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorModel {
    /// Each band is a color or alpha component.
    Component,
    /// A single band indexes into a palette.
    Indexed(Palette),
}

impl Palette {
    pub fn new(reds: Vec<u8>, greens: Vec<u8>, blues: Vec<u8>) -> Result<Self> {
        Self::build(reds, greens, blues, None)
    }

    pub fn with_alpha(reds: Vec<u8>, greens: Vec<u8>, blues: Vec<u8>, alphas: Vec<u8>) -> Result<Self> {
        Self::build(reds, greens, blues, Some(alphas))
    }

    fn build(
        reds: Vec<u8>,
        greens: Vec<u8>,
        blues: Vec<u8>,
        alphas: Option<Vec<u8>>,
    ) -> Result<Self> {
        if reds.is_empty() {
            return Err(RasterError::InvalidArgument("palette without entries"));
        }

        let size = reds.len();
        let alpha_ok = alphas.as_ref().map_or(true, |a| a.len() == size);
        if greens.len() != size || blues.len() != size || !alpha_ok {
            return Err(RasterError::InvalidArgument(
                "palette components differ in length",
            ));
        }

        Ok(Palette {
            reds,
            greens,
            blues,
            alphas,
        })
    }

    /// The number of entries.
    pub fn map_size(&self) -> usize {
        self.reds.len()
    }

    pub fn has_alpha(&self) -> bool {
        self.alphas.is_some()
    }

    /// Three components, or four with alpha.
    pub fn num_components(&self) -> usize {
        if self.has_alpha() {
            4
        } else {
            3
        }
    }

    /// Component `0` is red, then green, blue and alpha.
    pub fn component(&self, idx: usize) -> Option<&[u8]> {
        match idx {
            0 => Some(&self.reds),
            1 => Some(&self.greens),
            2 => Some(&self.blues),
            3 => self.alphas.as_deref(),
            _ => None,
        }
    }

    pub fn entry(&self, idx: usize) -> Option<[u8; 4]> {
        let alpha = match &self.alphas {
            Some(alphas) => *alphas.get(idx)?,
            None => 0xff,
        };
        Some([
            *self.reds.get(idx)?,
            self.greens[idx],
            self.blues[idx],
            alpha,
        ])
    }
}

impl ColorModel {
    pub fn palette(&self) -> Option<&Palette> {
        match self {
            ColorModel::Indexed(palette) => Some(palette),
            ColorModel::Component => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, ColorModel::Indexed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_must_agree() {
        assert!(Palette::new(vec![0, 1], vec![0], vec![0, 1]).is_err());
        assert!(Palette::new(vec![], vec![], vec![]).is_err());
        assert!(Palette::with_alpha(vec![0], vec![0], vec![0], vec![0, 0]).is_err());
    }

    #[test]
    fn entries() {
        let palette = Palette::new(vec![1, 2], vec![3, 4], vec![5, 6]).unwrap();
        assert_eq!(palette.num_components(), 3);
        assert_eq!(palette.entry(1), Some([2, 4, 6, 0xff]));
        assert_eq!(palette.entry(2), None);
        assert_eq!(palette.component(3), None);

        let palette = Palette::with_alpha(vec![1], vec![2], vec![3], vec![4]).unwrap();
        assert_eq!(palette.num_components(), 4);
        assert_eq!(palette.component(3), Some(&[4][..]));
    }
}

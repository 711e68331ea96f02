// Distributed under The MIT License (MIT)
//
// Copyright (c) 2019, 2020 The `image-rs` developers
//! Choosing a common working format for a set of source layouts and one destination.
//!
//! Before an operator runs, each participating raster gets a `FormatTag`. It says in which data
//! type samples are presented, whether the raster's own banks can be handed out directly, and
//! whether palette indices are to be expanded into color components.
use crate::layout::SampleLayout;
use crate::palette::ColorModel;
use crate::sample::DataType;

/// Whether an accessor views the raster's banks or a canonical copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CopyMode {
    Uncopied,
    Copied,
}

/// Whether palette indices are replaced by palette components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expansion {
    Default,
    Expanded,
    Unexpanded,
}

/// The working format of one raster for one operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatTag {
    pub data_type: DataType,
    pub copy: CopyMode,
    pub expansion: Expansion,
    pub pixel_sequential: bool,
    pub num_bands: usize,
    pub pixel_stride: usize,
    pub band_offsets: Vec<usize>,
    pub bank_indices: Vec<usize>,
}

/// Adjustments to the tag selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagOptions {
    /// Never let an accessor view the raster's own banks.
    pub force_copy: bool,
    /// Expand indexed sources into their palette components for non-indexed destinations.
    pub expand_indexed: bool,
}

/// A layout with the color interpretation of its samples, if known.
#[derive(Clone, Copy, Debug)]
pub struct ImageFormat<'a> {
    pub layout: &'a SampleLayout,
    pub color_model: Option<&'a ColorModel>,
}

impl Default for TagOptions {
    fn default() -> Self {
        TagOptions {
            force_copy: false,
            expand_indexed: true,
        }
    }
}

impl<'a> ImageFormat<'a> {
    pub fn new(layout: &'a SampleLayout) -> Self {
        ImageFormat {
            layout,
            color_model: None,
        }
    }

    pub fn with_color_model(layout: &'a SampleLayout, color_model: &'a ColorModel) -> Self {
        ImageFormat {
            layout,
            color_model: Some(color_model),
        }
    }

    fn is_indexed(&self) -> bool {
        self.color_model.map_or(false, ColorModel::is_indexed)
    }

    fn is_component(&self) -> bool {
        matches!(self.color_model, Some(ColorModel::Component))
    }
}

impl FormatTag {
    /// The tag for `layout` presented as `data_type`.
    ///
    /// Uncopied tags carry the layout's own band geometry. Copied tags describe the canonical
    /// interleaved arrays an accessor allocates.
    pub fn new(
        layout: &SampleLayout,
        data_type: DataType,
        copy: CopyMode,
        expansion: Expansion,
    ) -> Self {
        let num_bands = layout.num_bands();
        match copy {
            CopyMode::Uncopied => FormatTag {
                data_type,
                copy,
                expansion,
                pixel_sequential: layout.is_pixel_sequential(),
                num_bands,
                pixel_stride: layout.pixel_stride(),
                band_offsets: layout.band_offsets().to_vec(),
                bank_indices: layout.bank_indices().to_vec(),
            },
            CopyMode::Copied => FormatTag {
                data_type,
                copy,
                expansion,
                pixel_sequential: true,
                num_bands,
                pixel_stride: num_bands,
                band_offsets: (0..num_bands).collect(),
                bank_indices: vec![0; num_bands],
            },
        }
    }

    pub fn is_copied(&self) -> bool {
        self.copy == CopyMode::Copied
    }

    /// Whether an accessor for `layout` works on unpacked bits.
    ///
    /// Only unexpanded byte copies of a binary layout qualify.
    pub fn is_binary_for(&self, layout: &SampleLayout) -> bool {
        self.is_copied()
            && self.data_type == DataType::Byte
            && self.expansion == Expansion::Unexpanded
            && layout.is_binary()
    }
}

fn default_type(dst: &SampleLayout, sources: impl Iterator<Item = (DataType, bool)>) -> DataType {
    let mut data_type = dst.data_type();
    if dst.is_binary() {
        data_type = DataType::Byte;
    } else if data_type < DataType::Int {
        data_type = DataType::Int;
    }

    for (src_type, src_binary) in sources {
        if !(src_binary && dst.is_binary()) && src_type > data_type {
            data_type = src_type;
        }
    }

    data_type
}

fn copy_mode<'s>(
    options: &TagOptions,
    dst: &SampleLayout,
    mut sources: impl Iterator<Item = &'s SampleLayout>,
) -> CopyMode {
    let shares_type =
        !dst.is_binary() && sources.all(|src| !src.is_binary() && src.data_type() == dst.data_type());
    if shares_type && !options.force_copy {
        CopyMode::Uncopied
    } else {
        CopyMode::Copied
    }
}

/// One tag per source, then one for the destination.
pub fn find_compatible_tags(sources: &[ImageFormat], dst: &ImageFormat) -> Vec<FormatTag> {
    find_compatible_tags_with(&TagOptions::default(), sources, dst)
}

/// Like `find_compatible_tags` with explicit options.
pub fn find_compatible_tags_with(
    options: &TagOptions,
    sources: &[ImageFormat],
    dst: &ImageFormat,
) -> Vec<FormatTag> {
    let layouts = || sources.iter().map(|src| src.layout);
    let data_type = default_type(
        dst.layout,
        layouts().map(|l| (l.data_type(), l.is_binary())),
    );
    let copy = copy_mode(options, dst.layout, layouts());

    let work_type = match copy {
        CopyMode::Uncopied => dst.layout.data_type(),
        CopyMode::Copied => data_type,
    };

    log::debug!(
        "format tags for {} sources: {} {:?}",
        sources.len(),
        work_type,
        copy
    );

    let mut tags: Vec<FormatTag> = sources
        .iter()
        .map(|src| {
            let expansion = if src.is_indexed() {
                if dst.is_indexed() || !options.expand_indexed {
                    Expansion::Unexpanded
                } else {
                    Expansion::Expanded
                }
            } else if src.is_component() || (src.layout.is_binary() && dst.layout.is_binary()) {
                Expansion::Unexpanded
            } else {
                Expansion::Default
            };
            FormatTag::new(src.layout, work_type, copy, expansion)
        })
        .collect();

    tags.push(FormatTag::new(
        dst.layout,
        work_type,
        copy,
        Expansion::Unexpanded,
    ));
    tags
}

/// Tags from layouts alone; nothing is ever expanded.
pub fn find_compatible_tag(sources: &[&SampleLayout], dst: &SampleLayout) -> FormatTag {
    let data_type = default_type(dst, sources.iter().map(|l| (l.data_type(), l.is_binary())));
    let copy = copy_mode(&TagOptions::default(), dst, sources.iter().copied());
    let work_type = match copy {
        CopyMode::Uncopied => dst.data_type(),
        CopyMode::Copied => data_type,
    };
    FormatTag::new(dst, work_type, copy, Expansion::Unexpanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::factory::{create_banded, create_binary, create_interleaved};
    use crate::palette::Palette;

    fn layout(data_type: DataType) -> SampleLayout {
        create_interleaved(data_type, 4, 4, 3).unwrap()
    }

    #[test]
    fn same_type_is_uncopied() {
        let src = layout(DataType::Byte);
        let dst = layout(DataType::Byte);
        let tags = find_compatible_tags(&[ImageFormat::new(&src)], &ImageFormat::new(&dst));
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].copy, CopyMode::Uncopied);
        assert_eq!(tags[0].data_type, DataType::Byte);
        assert_eq!(tags[0].band_offsets, vec![2, 1, 0]);
        assert_eq!(tags[1].expansion, Expansion::Unexpanded);
    }

    #[test]
    fn mixed_types_promote_to_int() {
        let src = layout(DataType::UShort);
        let dst = layout(DataType::Byte);
        let tags = find_compatible_tags(&[ImageFormat::new(&src)], &ImageFormat::new(&dst));
        assert!(tags.iter().all(|t| t.copy == CopyMode::Copied));
        assert!(tags.iter().all(|t| t.data_type == DataType::Int));
        assert_eq!(tags[0].band_offsets, vec![0, 1, 2]);
        assert_eq!(tags[0].expansion, Expansion::Default);
    }

    #[test]
    fn wider_source_wins() {
        let src = layout(DataType::Double);
        let other = layout(DataType::Short);
        let dst = layout(DataType::Short);
        let sources = [ImageFormat::new(&src), ImageFormat::new(&other)];
        let tags = find_compatible_tags(&sources, &ImageFormat::new(&dst));
        assert!(tags.iter().all(|t| t.data_type == DataType::Double));
    }

    #[test]
    fn binary_pair_stays_bytes() {
        let src = create_binary(DataType::Int, 9, 2, 0).unwrap();
        let dst = create_binary(DataType::Byte, 9, 2, 3).unwrap();
        let tags = find_compatible_tags(&[ImageFormat::new(&src)], &ImageFormat::new(&dst));
        assert_eq!(tags[0].data_type, DataType::Byte);
        assert_eq!(tags[0].copy, CopyMode::Copied);
        assert_eq!(tags[0].expansion, Expansion::Unexpanded);
        assert!(tags[1].is_binary_for(&dst));
    }

    #[test]
    fn expanded_bytes_are_not_binary() {
        let binary = create_binary(DataType::Byte, 8, 1, 0).unwrap();
        let copy = |expansion| FormatTag::new(&binary, DataType::Byte, CopyMode::Copied, expansion);
        assert!(copy(Expansion::Unexpanded).is_binary_for(&binary));
        assert!(!copy(Expansion::Default).is_binary_for(&binary));
        assert!(!copy(Expansion::Expanded).is_binary_for(&binary));

        let view = FormatTag::new(
            &binary,
            DataType::Byte,
            CopyMode::Uncopied,
            Expansion::Unexpanded,
        );
        assert!(!view.is_binary_for(&binary));
    }

    #[test]
    fn indexed_expansion() {
        let palette = Palette::new(vec![0; 4], vec![0; 4], vec![0; 4]).unwrap();
        let indexed = ColorModel::Indexed(palette);
        let src = create_banded(DataType::Byte, 4, 4, 1, None, None).unwrap();
        let dst = layout(DataType::Byte);

        let source = [ImageFormat::with_color_model(&src, &indexed)];
        let tags = find_compatible_tags(&source, &ImageFormat::new(&dst));
        assert_eq!(tags[0].expansion, Expansion::Expanded);

        let indexed_dst = ImageFormat::with_color_model(&dst, &indexed);
        let tags = find_compatible_tags(&source, &indexed_dst);
        assert_eq!(tags[0].expansion, Expansion::Unexpanded);

        let options = TagOptions {
            expand_indexed: false,
            ..TagOptions::default()
        };
        let tags = find_compatible_tags_with(&options, &source, &ImageFormat::new(&dst));
        assert_eq!(tags[0].expansion, Expansion::Unexpanded);
    }

    #[test]
    fn forced_copy() {
        let src = layout(DataType::Float);
        let options = TagOptions {
            force_copy: true,
            ..TagOptions::default()
        };
        let tags = find_compatible_tags_with(
            &options,
            &[ImageFormat::new(&src)],
            &ImageFormat::new(&src),
        );
        assert_eq!(tags[0].copy, CopyMode::Copied);
        assert_eq!(tags[0].data_type, DataType::Float);
    }

    #[test]
    fn layout_only_tag() {
        let src = layout(DataType::Short);
        let dst = layout(DataType::Short);
        let tag = find_compatible_tag(&[&src], &dst);
        assert_eq!(tag.copy, CopyMode::Uncopied);
        assert_eq!(tag.data_type, DataType::Short);
        assert_eq!(tag.expansion, Expansion::Unexpanded);

        let binary = create_binary(DataType::Byte, 4, 4, 0).unwrap();
        let tag = find_compatible_tag(&[&binary], &dst);
        assert_eq!(tag.copy, CopyMode::Copied);
        assert_eq!(tag.data_type, DataType::Int);
    }
}

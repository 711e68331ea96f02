use image_raster::{
    factory, find_compatible_tags, DataBuffer, DataType, ImageFormat, LookupTable, Palette, Raster,
    RasterAccessor, Rect,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn single_band_source_fills_every_band() {
    init();
    let src_layout = factory::create_interleaved(DataType::Byte, 4, 1, 1).unwrap();
    let src = Raster::new(src_layout, DataBuffer::from_vec(vec![0u8, 1, 2, 3]), (0, 0)).unwrap();
    let dst_layout = factory::create_interleaved(DataType::Byte, 4, 1, 3).unwrap();
    let mut dst = Raster::create_writable(dst_layout, (0, 0));

    let tags = find_compatible_tags(
        &[ImageFormat::new(src.layout())],
        &ImageFormat::new(dst.layout()),
    );
    let table = LookupTable::new(vec![vec![10u8, 20, 30, 40]], 0).unwrap();

    let region = src.bounds();
    let src_acc = RasterAccessor::new(&src, region, &tags[0], None).unwrap();
    let mut dst_acc = RasterAccessor::new_mut(&mut dst, region, &tags[1], None).unwrap();
    assert!(!dst_acc.is_data_copy());
    table.apply_to(&src_acc, &mut dst_acc).unwrap();
    dst_acc.write_back().unwrap();
    drop(dst_acc);

    assert_eq!(
        dst.pixels::<u8>(region).unwrap(),
        [10, 10, 10, 20, 20, 20, 30, 30, 30, 40, 40, 40]
    );
}

#[test]
fn apply_matches_lookup() {
    init();
    let layout = factory::create_banded(DataType::UShort, 6, 5, 2, None, None).unwrap();
    let mut src = Raster::create_writable(layout, (3, -1));
    let bounds = src.bounds();
    let samples: Vec<u16> = (0..60).map(|i| (i * 29 % 64) as u16).collect();
    src.set_pixels(bounds, &samples).unwrap();

    let bands = vec![
        (0..64).map(|v| v * 3 - 100).collect::<Vec<i32>>(),
        (0..64).map(|v| 7 * v).collect(),
    ];
    let table = LookupTable::new(bands, 0).unwrap();
    let region = Rect::new(4, 0, 4, 3);
    let out = table.lookup_raster(&src, Some(region)).unwrap();

    assert_eq!(out.bounds(), region);
    assert_eq!(out.layout().data_type(), DataType::Int);
    assert!(out.layout().is_banded());

    for y in region.y..region.y + region.height as i32 {
        for x in region.x..region.x + region.width as i32 {
            for band in 0..2 {
                let value = src.sample::<i32>(x, y, band).unwrap();
                let expected = table.lookup(band, value);
                assert_eq!(out.sample::<i32>(x, y, band).ok(), expected);
            }
        }
    }
}

#[test]
fn failed_lookup_leaves_copies_unwritten() {
    init();
    let src_layout = factory::create_interleaved(DataType::Short, 2, 1, 1).unwrap();
    let src = Raster::new(src_layout, DataBuffer::from_vec(vec![1i16, 9]), (0, 0)).unwrap();
    let dst_layout = factory::create_interleaved(DataType::Byte, 2, 1, 1).unwrap();
    let mut dst = Raster::create_writable(dst_layout, (0, 0));
    let table = LookupTable::new(vec![vec![5u8, 6, 7]], 0).unwrap();

    let region = src.bounds();
    let tags = find_compatible_tags(
        &[ImageFormat::new(src.layout())],
        &ImageFormat::new(dst.layout()),
    );
    let src_acc = RasterAccessor::new(&src, region, &tags[0], None).unwrap();
    let dst_tag = image_raster::FormatTag::new(
        dst.layout(),
        DataType::Byte,
        image_raster::CopyMode::Copied,
        image_raster::Expansion::Unexpanded,
    );
    let mut dst_acc = RasterAccessor::new_mut(&mut dst, region, &dst_tag, None).unwrap();

    let err = table.apply_to(&src_acc, &mut dst_acc).unwrap_err();
    assert_eq!(err.kind(), image_raster::ErrorKind::OutOfBounds);
    drop(dst_acc);

    assert_eq!(dst.pixels::<u8>(region).unwrap(), [0, 0]);
}

#[test]
fn entries_convert_to_the_working_type() {
    init();
    let src_layout = factory::create_interleaved(DataType::UShort, 4, 1, 1).unwrap();
    let src = Raster::new(src_layout, DataBuffer::from_vec(vec![3u16, 2, 1, 0]), (0, 0)).unwrap();
    let dst_layout = factory::create_interleaved(DataType::Byte, 4, 1, 1).unwrap();
    let mut dst = Raster::create_writable(dst_layout, (0, 0));
    let table = LookupTable::new(vec![vec![0u16, 255, 256, 1000]], 0).unwrap();

    let tags = find_compatible_tags(
        &[ImageFormat::new(src.layout())],
        &ImageFormat::new(dst.layout()),
    );
    assert_eq!(tags[1].data_type, DataType::Int);

    let region = src.bounds();
    let src_acc = RasterAccessor::new(&src, region, &tags[0], None).unwrap();
    let mut dst_acc = RasterAccessor::new_mut(&mut dst, region, &tags[1], None).unwrap();
    table.apply_to(&src_acc, &mut dst_acc).unwrap();
    assert_eq!(dst_acc.band::<i32>(0), Some(&[1000, 256, 255, 0][..]));

    dst_acc.clamp_data_arrays().unwrap();
    dst_acc.write_back().unwrap();
    drop(dst_acc);

    assert_eq!(dst.pixels::<u8>(region).unwrap(), [255, 255, 255, 0]);
}

#[test]
fn nearest_entry_of_a_palette() {
    let palette = Palette::new(
        vec![0, 255, 0, 128],
        vec![0, 0, 255, 128],
        vec![0, 0, 0, 128],
    )
    .unwrap();
    let table = LookupTable::from_palette(&palette).unwrap();

    for idx in 0..palette.map_size() {
        let [r, g, b, _] = palette.entry(idx).unwrap();
        let pixel = [f32::from(r), f32::from(g), f32::from(b)];
        assert_eq!(table.find_nearest_entry(&pixel), Ok(idx as i32));
    }

    assert_eq!(table.find_nearest_entry(&[200.0, 30.0, 10.0]), Ok(1));
}

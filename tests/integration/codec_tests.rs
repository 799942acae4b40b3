//! Decoding and encoding through the TIFF backend.
//!
//! Files are built in memory with [`TiffBuilder`] so every layout (strips,
//! tiles, both byte orders, BigTIFF) can be exercised without fixtures, and
//! the `image` crate serves as an independent TIFF implementation for
//! cross-checks.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};

use tiff_intensity::{
    codec, decode_bytes, encode_to_vec, BlockReader, ContainerError, MemoryRangeReader,
    Photometric, RasterBuffer, RasterError, TagStore, TiffError, TiffSource, TiffTag,
};

use super::test_utils::*;

// =============================================================================
// Strip decoding
// =============================================================================

#[test]
fn test_decode_strips_little_endian() {
    let scanlines = pattern_scanlines(6, 7, 1);
    let data = TiffBuilder::new()
        .image(6, 7, 1, 1)
        .strips(3, split_strips(&scanlines, 3))
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_eq!(raster.width(), 6);
    assert_eq!(raster.length(), 7);
    assert_eq!(raster.channels(), 1);
    assert_eq!(raster.photometric(), Photometric::MinIsBlack);
    assert_scanlines(&raster, &scanlines);

    // Buffer rows run bottom-up
    assert_eq!(raster.row(0).unwrap(), scanlines[6].as_slice());
    assert_eq!(raster.row(6).unwrap(), scanlines[0].as_slice());
}

#[test]
fn test_pixels_start_with_last_scanline() {
    let scanlines = pattern_scanlines(4, 5, 1);
    let data = TiffBuilder::new()
        .image(4, 5, 1, 1)
        .strips(2, split_strips(&scanlines, 2))
        .build();
    let raster = decode_bytes(data).unwrap();

    let bottom_up: Vec<u8> = scanlines.iter().rev().flatten().copied().collect();
    assert_eq!(raster.pixels(), bottom_up.as_slice());

    let file_order: Vec<u8> = (0..5)
        .flat_map(|y| raster.scanline(y).unwrap().to_vec())
        .collect();
    assert_eq!(file_order, scanlines.concat());
}

#[test]
fn test_decode_strips_big_endian_rgb() {
    let scanlines = pattern_scanlines(4, 5, 3);
    let data = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .image(4, 5, 3, 2)
        .strips(2, split_strips(&scanlines, 2))
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_eq!(raster.channels(), 3);
    assert_eq!(raster.photometric(), Photometric::Rgb);
    assert_scanlines(&raster, &scanlines);
}

#[test]
fn test_decode_without_rows_per_strip_is_one_strip() {
    let scanlines = pattern_scanlines(3, 4, 1);
    let data = TiffBuilder::new()
        .image(3, 4, 1, 0)
        .strips(4, vec![scanlines.concat()])
        .without(TAG_ROWS_PER_STRIP)
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_eq!(raster.photometric(), Photometric::MinIsWhite);
    assert_scanlines(&raster, &scanlines);
}

#[test]
fn test_decode_bigtiff_strips() {
    let scanlines = pattern_scanlines(5, 6, 1);
    let data = TiffBuilder::new()
        .with_bigtiff(true)
        .with_byte_order(ByteOrderType::BigEndian)
        .image(5, 6, 1, 1)
        .strips(4, split_strips(&scanlines, 4))
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_scanlines(&raster, &scanlines);
}

#[test]
fn test_short_strip_is_zero_padded() {
    let scanlines = pattern_scanlines(3, 4, 1);
    let mut strips = split_strips(&scanlines, 2);
    // Second strip only carries its first row
    strips[1].truncate(3);

    let data = TiffBuilder::new()
        .image(3, 4, 1, 1)
        .strips(2, strips)
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_eq!(raster.scanline(2).unwrap(), scanlines[2].as_slice());
    assert_eq!(raster.scanline(3).unwrap(), &[0, 0, 0]);
}

#[test]
fn test_extra_strips_are_ignored() {
    let scanlines = pattern_scanlines(2, 3, 1);
    let mut strips = split_strips(&scanlines, 2);
    strips.push(vec![0xEE; 4]);

    let data = TiffBuilder::new()
        .image(2, 3, 1, 1)
        .strips(2, strips)
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_scanlines(&raster, &scanlines);
}

#[test]
fn test_missing_strips_rejected() {
    let scanlines = pattern_scanlines(2, 6, 1);
    let mut strips = split_strips(&scanlines, 2);
    strips.pop();

    let data = TiffBuilder::new()
        .image(2, 6, 1, 1)
        .strips(2, strips)
        .build();

    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::InvalidTagValue { .. })
    ));
}

// =============================================================================
// Tile decoding
// =============================================================================

#[test]
fn test_decode_tiles_clips_edges() {
    // 5x3 RGB in 4x2 tiles: the right and bottom tiles overhang
    let scanlines = pattern_scanlines(5, 3, 3);
    let tiles = split_tiles(&scanlines, 3, 4, 2, 0xFF);
    assert_eq!(tiles.len(), 4);

    let data = TiffBuilder::new()
        .image(5, 3, 3, 2)
        .tiles(4, 2, tiles)
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_eq!(raster.width(), 5);
    assert_eq!(raster.length(), 3);
    assert_scanlines(&raster, &scanlines);
}

#[test]
fn test_decode_bigtiff_tiles_big_endian() {
    let scanlines = pattern_scanlines(7, 9, 1);
    let tiles = split_tiles(&scanlines, 1, 4, 4, 0x55);

    let data = TiffBuilder::new()
        .with_bigtiff(true)
        .with_byte_order(ByteOrderType::BigEndian)
        .image(7, 9, 1, 1)
        .tiles(4, 4, tiles)
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_scanlines(&raster, &scanlines);
}

#[test]
fn test_tiled_source_reports_layout() {
    let scanlines = pattern_scanlines(5, 3, 3);
    let data = TiffBuilder::new()
        .image(5, 3, 3, 2)
        .tiles(4, 2, split_tiles(&scanlines, 3, 4, 2, 0))
        .build();

    let source = TiffSource::open(MemoryRangeReader::new(data, "tiled")).unwrap();
    assert!(source.is_tiled());
    assert_eq!(source.strip_count(), 0);
    assert_eq!(source.tile_byte_size(), 4 * 2 * 3);
    assert_eq!(source.get_tag(TiffTag::TileWidth), Some(4));
    assert_eq!(source.get_tag(TiffTag::SamplesPerPixel), Some(3));

    // Tile containing pixel (4, 2) is the last one
    let mut buf = vec![0u8; source.tile_byte_size()];
    let read = source.read_tile(4, 2, &mut buf).unwrap();
    assert_eq!(read, 24);
    assert_eq!(&buf[..3], &scanlines[2][12..15]);
}

// =============================================================================
// Rejected containers
// =============================================================================

fn gray_strip_builder() -> TiffBuilder {
    let scanlines = pattern_scanlines(2, 2, 1);
    TiffBuilder::new()
        .image(2, 2, 1, 1)
        .strips(2, vec![scanlines.concat()])
}

#[test]
fn test_compressed_rejected() {
    let data = gray_strip_builder().short(TAG_COMPRESSION, &[5]).build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::UnsupportedCompression(_))
    ));
}

#[test]
fn test_separate_planes_rejected() {
    let data = gray_strip_builder()
        .short(TAG_PLANAR_CONFIGURATION, &[2])
        .build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::UnsupportedLayout(_))
    ));
}

#[test]
fn test_missing_photometric_rejected() {
    let data = gray_strip_builder().without(TAG_PHOTOMETRIC).build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::MissingTag("PhotometricInterpretation"))
    ));
}

#[test]
fn test_palette_photometric_rejected() {
    let data = gray_strip_builder().short(TAG_PHOTOMETRIC, &[3]).build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::InvalidTagValue { .. })
    ));
}

#[test]
fn test_sub_byte_samples_rejected() {
    let data = gray_strip_builder()
        .short(TAG_BITS_PER_SAMPLE, &[4])
        .build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::UnsupportedLayout(_))
    ));
}

#[test]
fn test_huge_tile_dimensions_rejected() {
    let data = TiffBuilder::new()
        .image(16, 16, 1, 1)
        .tiles(0xFFFF_FFF0, 0xFFFF_FFF0, vec![vec![0; 256]])
        .build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::InvalidTagValue {
            tag: "TileWidth/TileLength",
            ..
        })
    ));
}

#[test]
fn test_huge_strip_geometry_rejected() {
    let data = TiffBuilder::new()
        .image(0x8000_0000, 0x8000_0000, 3, 2)
        .strips(0x8000_0000, vec![vec![0; 48]])
        .build();
    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Raster(RasterError::TooLarge {
            width: 0x8000_0000,
            length: 0x8000_0000,
            channels: 3,
            ..
        })
    ));
}

#[test]
fn test_huge_bigtiff_entry_count_rejected() {
    let mut data = b"II".to_vec();
    data.extend(43u16.to_le_bytes());
    data.extend(8u16.to_le_bytes());
    data.extend(0u16.to_le_bytes());
    data.extend(16u64.to_le_bytes());
    data.extend(u64::MAX.to_le_bytes()); // entry count
    data.extend([0u8; 32]);

    let err = decode_bytes(data).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::Format(TiffError::TooManyEntries(u64::MAX))
    ));
}

#[test]
fn test_sixteen_bit_samples_decode() {
    let data = TiffBuilder::new()
        .image(2, 2, 1, 1)
        .short(TAG_BITS_PER_SAMPLE, &[16])
        .strips(2, vec![vec![1, 2, 3, 4, 5, 6, 7, 8]])
        .build();

    let raster = decode_bytes(data).unwrap();
    assert_eq!(raster.bit_depth(), 16);
    assert_eq!(raster.row_bytes(), 4);
    assert_eq!(raster.scanline(0).unwrap(), &[1, 2, 3, 4]);
    assert_eq!(raster.scanline(1).unwrap(), &[5, 6, 7, 8]);
}

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_encode_path_round_trip_multiple_strips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.tif");

    // 300-byte scanlines give 27 rows per strip
    let raster = gray_raster(300, 100, |x, row| ((x + 3 * row) % 256) as u8);
    codec::encode(&raster, &path).unwrap();

    let source = codec::open(&path).unwrap();
    assert!(!source.is_tiled());
    assert_eq!(source.get_tag(TiffTag::RowsPerStrip), Some(27));
    assert_eq!(source.strip_count(), 4);

    assert_eq!(codec::decode(&path).unwrap(), raster);
}

#[test]
fn test_encode_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.tif");
    std::fs::write(&path, vec![0xAB; 4096]).unwrap();

    let raster = gray_raster(3, 3, |x, row| (x * 10 + row) as u8);
    codec::encode(&raster, &path).unwrap();
    assert_eq!(codec::decode(&path).unwrap(), raster);
}

#[test]
fn test_rgb_round_trip_through_merge() {
    let red = gray_raster(4, 3, |x, _| x as u8);
    let green = gray_raster(4, 3, |_, row| row as u8);
    let blue = gray_raster(4, 3, |x, row| (x * row) as u8);

    let rgb = tiff_intensity::merge_planes(&red, &green, &blue).unwrap();
    let decoded = decode_bytes(encode_to_vec(&rgb).unwrap()).unwrap();
    assert_eq!(decoded, rgb);
    assert_eq!(decoded.photometric(), Photometric::Rgb);
}

// =============================================================================
// Cross-checks against the image crate
// =============================================================================

#[test]
fn test_written_file_decodes_in_image_crate() {
    let pixels: Vec<u8> = (0..7 * 5 * 3).map(|i| (i * 3 % 256) as u8).collect();
    let raster = RasterBuffer::from_pixels(7, 5, 3, 8, Photometric::Rgb, pixels).unwrap();

    let bytes = encode_to_vec(&raster).unwrap();
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Tiff)
        .unwrap()
        .to_rgb8();

    assert_eq!(image.dimensions(), (7, 5));
    let row_bytes = raster.row_bytes();
    for y in 0..5u32 {
        let start = y as usize * row_bytes;
        assert_eq!(
            &image.as_raw()[start..start + row_bytes],
            raster.scanline(y).unwrap(),
            "row {}",
            y
        );
    }
}

#[test]
fn test_image_crate_file_decodes() {
    let image = RgbImage::from_fn(6, 4, |x, y| image::Rgb([x as u8 * 40, y as u8 * 60, 7]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Tiff)
        .unwrap();

    let raster = decode_bytes(bytes).unwrap();
    assert_eq!(raster.width(), 6);
    assert_eq!(raster.length(), 4);
    assert_eq!(raster.channels(), 3);
    for y in 0..4u32 {
        let start = y as usize * 18;
        assert_eq!(raster.scanline(y).unwrap(), &image.as_raw()[start..start + 18]);
    }
}

//! Transforms applied to decoded files and written back out.

use tiff_intensity::{
    apply_all, codec, decode_bytes, encode_to_vec, merge_planes, CurveSegment, Photometric,
    RasterBuffer, RasterError, Transform, TransformError,
};

use super::test_utils::*;

fn ramp_file() -> Vec<u8> {
    // 16x16 gray ramp holding every byte value once
    let scanlines: Vec<Vec<u8>> = (0..16u32)
        .map(|y| (0..16u32).map(|x| (y * 16 + x) as u8).collect())
        .collect();
    TiffBuilder::new()
        .image(16, 16, 1, 1)
        .strips(5, split_strips(&scanlines, 5))
        .build()
}

// =============================================================================
// Single transforms on decoded files
// =============================================================================

#[test]
fn test_negate_decoded_file() {
    let mut raster = decode_bytes(ramp_file()).unwrap();
    raster.negate().unwrap();

    assert_eq!(raster.scanline(0).unwrap()[0], 255);
    assert_eq!(raster.scanline(15).unwrap()[15], 0);

    let histogram = raster.histogram();
    assert_eq!(histogram.total(), 256);
    assert!(histogram.bins().iter().all(|&count| count == 1));
}

#[test]
fn test_threshold_decoded_file() {
    let mut raster = decode_bytes(ramp_file()).unwrap();
    raster.threshold(128).unwrap();

    let histogram = raster.histogram();
    assert_eq!(histogram[0u8], 128);
    assert_eq!(histogram[255u8], 128);
    assert_eq!(histogram.summary().occupied_bins, 2);
}

#[test]
fn test_curves_scenario() {
    let mut raster = gray_raster(3, 1, |x, _| [0, 47, 255][x as usize]);
    raster
        .curves(&[
            CurveSegment::new(0, 0, 47, 176),
            CurveSegment::new(47, 176, 255, 255),
        ])
        .unwrap();
    assert_eq!(raster.pixels(), &[0, 176, 255]);
}

#[test]
fn test_equalize_is_idempotent_on_two_levels() {
    let mut raster = gray_raster(10, 10, |x, _| if x < 5 { 127 } else { 254 });
    let original = raster.clone();

    raster.equalize().unwrap();
    assert_eq!(raster, original);
}

#[test]
fn test_gamma_keeps_extremes() {
    let mut raster = decode_bytes(ramp_file()).unwrap();
    raster.gamma_correct(2.2).unwrap();

    let histogram = raster.histogram();
    assert_eq!(histogram.min_value(), Some(0));
    assert_eq!(histogram.max_value(), Some(255));
    // Brightening gamma raises the mean
    assert!(histogram.mean().unwrap() > 127.5);
}

// =============================================================================
// Pipelines
// =============================================================================

#[test]
fn test_pipeline_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.tif");
    let output = dir.path().join("out.tif");

    let original = gray_raster(20, 12, |x, row| (x * 12 + row) as u8);
    codec::encode(&original, &input).unwrap();

    let mut raster = codec::decode(&input).unwrap();
    apply_all(
        &mut raster,
        &[
            Transform::Negate,
            Transform::Threshold {
                lower: 64,
                upper: 192,
            },
        ],
    )
    .unwrap();
    codec::encode(&raster, &output).unwrap();

    let written = codec::decode(&output).unwrap();
    assert_eq!(written, raster);
    for (before, after) in original.pixels().iter().zip(written.pixels()) {
        let negated = 255 - before;
        let expected = if negated < 64 {
            0
        } else if negated >= 192 {
            255
        } else {
            negated
        };
        assert_eq!(*after, expected);
    }
}

#[test]
fn test_pipeline_rejects_before_touching_pixels() {
    let mut raster = decode_bytes(ramp_file()).unwrap();
    let original = raster.clone();

    let result = apply_all(
        &mut raster,
        &[
            Transform::Negate,
            Transform::Curves(vec![CurveSegment::new(200, 0, 100, 255)]),
        ],
    );
    assert!(matches!(
        result,
        Err(TransformError::InvalidParameter { name: "curve", .. })
    ));
    assert_eq!(raster, original);
}

#[test]
fn test_transforms_reject_sixteen_bit_files() {
    let data = TiffBuilder::new()
        .image(2, 1, 1, 1)
        .short(TAG_BITS_PER_SAMPLE, &[16])
        .strips(1, vec![vec![0, 1, 2, 3]])
        .build();
    let mut raster = decode_bytes(data).unwrap();

    assert_eq!(
        apply_all(&mut raster, &[Transform::Equalize]),
        Err(TransformError::UnsupportedBitDepth(16))
    );
}

// =============================================================================
// Plane merging
// =============================================================================

#[test]
fn test_merge_decoded_planes() {
    let planes: Vec<RasterBuffer> = (0..3u32)
        .map(|c| gray_raster(5, 4, move |x, row| (x + row * 5 + c * 100) as u8))
        .collect();
    let files: Vec<Vec<u8>> = planes.iter().map(|p| encode_to_vec(p).unwrap()).collect();
    let decoded: Vec<RasterBuffer> = files.into_iter().map(|f| decode_bytes(f).unwrap()).collect();

    let rgb = merge_planes(&decoded[0], &decoded[1], &decoded[2]).unwrap();
    assert_eq!(rgb.channels(), 3);
    assert_eq!(rgb.photometric(), Photometric::Rgb);
    // Pixel 7 is (x=2, row=1)
    assert_eq!(&rgb.pixels()[21..24], &[7, 107, 207]);

    let mut inverted = rgb.clone();
    inverted.negate().unwrap();
    assert_eq!(&inverted.pixels()[21..24], &[248, 148, 48]);
}

#[test]
fn test_merge_mismatched_planes() {
    let red = gray_raster(4, 4, |_, _| 1);
    let green = gray_raster(4, 4, |_, _| 2);
    let blue = gray_raster(4, 3, |_, _| 3);

    let err = merge_planes(&red, &green, &blue).unwrap_err();
    assert!(matches!(
        err,
        RasterError::GeometryMismatch { plane: "blue", .. }
    ));
}

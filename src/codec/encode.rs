//! Scanline encoding from a [`RasterBuffer`].

use tracing::debug;

use crate::container::ScanlineWriter;
use crate::error::ContainerError;
use crate::format::tiff::{TiffTag, ORIENTATION_TOP_LEFT, PLANAR_CONFIG_CONTIGUOUS};
use crate::raster::RasterBuffer;

/// Write `raster` through `writer` as a top-left, interleaved, stripped image.
///
/// Scanline `y` is taken from buffer row `length - y - 1`. The first failed
/// write aborts the encode.
pub fn encode_scanlines<W: ScanlineWriter + ?Sized>(
    raster: &RasterBuffer,
    writer: &mut W,
) -> Result<(), ContainerError> {
    let row_bytes = raster.row_bytes();
    let rows_per_strip = writer.default_strip_rows(row_bytes);

    writer.set_tag(TiffTag::ImageWidth, raster.width());
    writer.set_tag(TiffTag::ImageLength, raster.length());
    writer.set_tag(TiffTag::SamplesPerPixel, raster.channels());
    writer.set_tag(TiffTag::BitsPerSample, raster.bit_depth());
    writer.set_tag(TiffTag::Orientation, ORIENTATION_TOP_LEFT);
    writer.set_tag(TiffTag::PlanarConfiguration, PLANAR_CONFIG_CONTIGUOUS);
    writer.set_tag(
        TiffTag::PhotometricInterpretation,
        raster.photometric().tag_value(),
    );
    writer.set_tag(TiffTag::RowsPerStrip, rows_per_strip);

    debug!(
        width = raster.width(),
        length = raster.length(),
        channels = raster.channels(),
        rows_per_strip,
        "Encoding scanlines"
    );

    let length = raster.length();
    for y in 0..length {
        let Some(row) = raster.row(length - y - 1) else {
            break;
        };
        writer
            .write_scanline(y, row)
            .map_err(|source| ContainerError::ScanlineWrite { row: y, source })?;
    }

    Ok(())
}

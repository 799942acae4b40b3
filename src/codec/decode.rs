//! Strip and tile decoding into a [`RasterBuffer`].
//!
//! Container row `r` is stored at buffer row `length - 1 - r`, so buffer
//! rows run bottom-up and [`RasterBuffer::scanline`] reads them back in
//! container order. Callers reading [`RasterBuffer::pixels`] directly see
//! the last scanline first.

use tracing::{debug, warn};

use crate::container::BlockReader;
use crate::error::{ContainerError, TiffError};
use crate::format::tiff::TiffTag;
use crate::raster::{Photometric, RasterBuffer, MAX_RASTER_BYTES};

/// Geometry and encoding read from the tag store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    width: u32,
    length: u32,
    channels: u32,
    bit_depth: u32,
    photometric: Photometric,
}

impl Geometry {
    fn read<B: BlockReader + ?Sized>(reader: &B) -> Result<Self, TiffError> {
        let width = required(reader, TiffTag::ImageWidth)?;
        let length = required(reader, TiffTag::ImageLength)?;
        let channels = reader.get_tag(TiffTag::SamplesPerPixel).unwrap_or(1);
        let bit_depth = reader.get_tag(TiffTag::BitsPerSample).unwrap_or(1);

        if bit_depth == 0 || bit_depth % 8 != 0 {
            return Err(TiffError::UnsupportedLayout(format!(
                "{}-bit samples (only whole-byte samples are supported)",
                bit_depth
            )));
        }

        let raw = required(reader, TiffTag::PhotometricInterpretation)?;
        let photometric = Photometric::from_tag(raw).ok_or_else(|| TiffError::InvalidTagValue {
            tag: TiffTag::PhotometricInterpretation.name(),
            message: format!("unsupported interpretation {}", raw),
        })?;

        Ok(Self {
            width,
            length,
            channels,
            bit_depth,
            photometric,
        })
    }

    fn allocate(&self) -> Result<RasterBuffer, ContainerError> {
        Ok(RasterBuffer::new(
            self.width,
            self.length,
            self.channels,
            self.bit_depth,
            self.photometric,
        )?)
    }
}

fn required<B: BlockReader + ?Sized>(reader: &B, tag: TiffTag) -> Result<u32, TiffError> {
    reader.get_tag(tag).ok_or(TiffError::MissingTag(tag.name()))
}

/// Read one block into `scratch`, zero-filling whatever the reader did not
/// deliver.
fn read_block(
    index: u32,
    expected: usize,
    scratch: &mut [u8],
    read: impl FnOnce(&mut [u8]) -> Result<usize, crate::error::IoError>,
) -> Result<(), ContainerError> {
    let got = read(scratch).map_err(|source| ContainerError::BlockRead { index, source })?;
    if got < expected {
        warn!(
            block = index,
            bytes = got,
            expected, "Block shorter than its rows, padding with zeros"
        );
    }
    let start = got.min(scratch.len());
    scratch[start..].fill(0);
    Ok(())
}

/// Zeroed buffer for one block, refusing sizes a raster could never hold.
fn scratch_buffer(len: usize, tag: &'static str) -> Result<Vec<u8>, ContainerError> {
    let too_large = || TiffError::InvalidTagValue {
        tag,
        message: format!("block of {} bytes is too large", len),
    };
    if len as u64 > MAX_RASTER_BYTES {
        return Err(too_large().into());
    }
    let mut scratch = Vec::new();
    scratch.try_reserve_exact(len).map_err(|_| too_large())?;
    scratch.resize(len, 0);
    Ok(scratch)
}

/// Largest tile extent accepted for an image extent: the extent rounded up
/// to a multiple of 16.
fn tile_limit(extent: u32) -> u32 {
    extent.max(1).div_ceil(16).saturating_mul(16)
}

// =============================================================================
// Strips
// =============================================================================

/// Decode a strip-organized image.
///
/// Every strip holds RowsPerStrip rows except the last, which holds
/// `length - (length / rows_per_strip) * rows_per_strip` rows when that is
/// non-zero.
pub fn decode_strips<B: BlockReader + ?Sized>(reader: &B) -> Result<RasterBuffer, ContainerError> {
    let geometry = Geometry::read(reader)?;
    let mut raster = geometry.allocate()?;
    let length = geometry.length;
    let row_bytes = raster.row_bytes();

    let rows_per_strip = reader
        .get_tag(TiffTag::RowsPerStrip)
        .unwrap_or(length)
        .min(length);
    if rows_per_strip == 0 {
        if length == 0 {
            return Ok(raster);
        }
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::RowsPerStrip.name(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    let strip_count = reader.strip_count();
    let needed = length.div_ceil(rows_per_strip);
    if strip_count > needed {
        warn!(strip_count, needed, "More strips than rows, ignoring the extra strips");
    } else if strip_count < needed {
        warn!(strip_count, needed, "Fewer strips than rows, missing rows stay zero");
    }

    let last_strip_rows = length - (length / rows_per_strip) * rows_per_strip;
    let strip_bytes = rows_per_strip as usize * row_bytes;
    let mut scratch = scratch_buffer(
        reader.strip_byte_size().max(strip_bytes),
        TiffTag::StripByteCounts.name(),
    )?;

    debug!(
        width = geometry.width,
        length,
        channels = geometry.channels,
        rows_per_strip,
        strip_count,
        "Decoding strips"
    );

    for strip in 0..strip_count.min(needed) {
        let rows = if strip == needed - 1 && last_strip_rows != 0 {
            last_strip_rows
        } else {
            rows_per_strip
        };

        read_block(strip, rows as usize * row_bytes, &mut scratch, |buf| {
            reader.read_strip(strip, buf)
        })?;

        let first_row = strip * rows_per_strip;
        for (r, src) in scratch.chunks_exact(row_bytes.max(1)).take(rows as usize).enumerate() {
            if let Some(dst) = raster.scanline_mut(first_row + r as u32) {
                dst.copy_from_slice(&src[..row_bytes]);
            }
        }
    }

    Ok(raster)
}

// =============================================================================
// Tiles
// =============================================================================

/// Decode a tile-organized image.
///
/// Tiles on the right and bottom edges extend past the image; their extra
/// columns and rows are dropped.
pub fn decode_tiles<B: BlockReader + ?Sized>(reader: &B) -> Result<RasterBuffer, ContainerError> {
    let geometry = Geometry::read(reader)?;
    let mut raster = geometry.allocate()?;

    let tile_width = required(reader, TiffTag::TileWidth)?;
    let tile_length = required(reader, TiffTag::TileLength)?;
    let invalid_tiles = || TiffError::InvalidTagValue {
        tag: "TileWidth/TileLength",
        message: format!(
            "tile dimensions {}x{} are invalid for a {}x{} image",
            tile_width, tile_length, geometry.width, geometry.length
        ),
    };
    if tile_width == 0
        || tile_length == 0
        || tile_width > tile_limit(geometry.width)
        || tile_length > tile_limit(geometry.length)
    {
        return Err(invalid_tiles().into());
    }

    let pixel_bytes = geometry.channels as usize * raster.bytes_per_sample();
    let tile_row_bytes = (tile_width as usize)
        .checked_mul(pixel_bytes)
        .ok_or_else(invalid_tiles)?;
    let tile_bytes = tile_row_bytes
        .checked_mul(tile_length as usize)
        .ok_or_else(invalid_tiles)?;
    let mut scratch = scratch_buffer(
        reader.tile_byte_size().max(tile_bytes),
        "TileWidth/TileLength",
    )?;
    let tiles_across = geometry.width.div_ceil(tile_width);

    debug!(
        width = geometry.width,
        length = geometry.length,
        channels = geometry.channels,
        tile_width,
        tile_length,
        "Decoding tiles"
    );

    for y in (0..geometry.length).step_by(tile_length as usize) {
        for x in (0..geometry.width).step_by(tile_width as usize) {
            let index = (y / tile_length) * tiles_across + x / tile_width;
            read_block(index, tile_bytes, &mut scratch, |buf| {
                reader.read_tile(x, y, buf)
            })?;

            let cols = tile_width.min(geometry.width - x) as usize;
            let rows = tile_length.min(geometry.length - y);
            let dst_start = x as usize * pixel_bytes;
            let span = cols * pixel_bytes;

            for ty in 0..rows {
                let src_start = ty as usize * tile_row_bytes;
                if let Some(dst) = raster.scanline_mut(y + ty) {
                    dst[dst_start..dst_start + span]
                        .copy_from_slice(&scratch[src_start..src_start + span]);
                }
            }
        }
    }

    Ok(raster)
}

/// Decode strips or tiles, whichever the reader holds.
pub fn decode_blocks<B: BlockReader + ?Sized>(reader: &B) -> Result<RasterBuffer, ContainerError> {
    if reader.is_tiled() {
        decode_tiles(reader)
    } else {
        decode_strips(reader)
    }
}

// =============================================================================
// Tests
// =============================================================================

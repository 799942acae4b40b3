//! Conversion between stored TIFF blocks and [`RasterBuffer`]s.
//!
//! The block-level functions work against the [`container`](crate::container)
//! traits. The path-level [`decode`] and [`encode`] wire them to
//! [`TiffSource`] and [`TiffWriter`].
//!
//! # Row order
//!
//! Containers store the top row first. A decoded raster holds rows
//! bottom-up, and [`encode_scanlines`] writes buffer row `length - y - 1` as
//! scanline `y`, so `decode(encode(raster)) == raster`.

mod decode;
mod encode;

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::container::TiffSource;
use crate::error::ContainerError;
use crate::format::tiff::TiffWriter;
use crate::io::{FileRangeReader, MemoryRangeReader};
use crate::raster::RasterBuffer;

pub use decode::{decode_blocks, decode_strips, decode_tiles};
pub use encode::encode_scanlines;

/// Open the TIFF file at `path` for block reading.
///
/// # Errors
/// - `Open` if the file is missing or unreadable
/// - `Format` if it is not a decodable baseline TIFF
pub fn open(path: impl AsRef<Path>) -> Result<TiffSource<FileRangeReader>, ContainerError> {
    let path = path.as_ref();
    let reader = FileRangeReader::open(path).map_err(|source| ContainerError::Open {
        path: path.display().to_string(),
        source,
    })?;
    Ok(TiffSource::open(reader)?)
}

/// Decode the first image of the TIFF file at `path`.
///
/// # Errors
/// - `Open` if the file is missing or unreadable
/// - `Format` if it is not a decodable baseline TIFF
/// - `BlockRead` if a strip or tile cannot be read
pub fn decode(path: impl AsRef<Path>) -> Result<RasterBuffer, ContainerError> {
    let path = path.as_ref();
    let source = open(path)?;
    let raster = decode_blocks(&source)?;
    debug!(
        path = %path.display(),
        width = raster.width(),
        length = raster.length(),
        channels = raster.channels(),
        "Decoded"
    );
    Ok(raster)
}

/// Encode `raster` as an uncompressed TIFF at `path`, replacing any file
/// already there.
///
/// # Errors
/// - `Open` if the file cannot be created
/// - `ScanlineWrite` on the first failed scanline
/// - `Finish` if the strip tables or IFD cannot be written
pub fn encode(raster: &RasterBuffer, path: impl AsRef<Path>) -> Result<(), ContainerError> {
    let path = path.as_ref();
    let mut writer = TiffWriter::create(path).map_err(|source| ContainerError::Open {
        path: path.display().to_string(),
        source,
    })?;

    encode_scanlines(raster, &mut writer)?;
    writer.finish().map_err(|source| ContainerError::Finish {
        path: path.display().to_string(),
        source,
    })?;

    debug!(path = %path.display(), "Encoded");
    Ok(())
}

/// Decode a TIFF held in memory.
pub fn decode_bytes(data: impl Into<Bytes>) -> Result<RasterBuffer, ContainerError> {
    let source = TiffSource::open(MemoryRangeReader::new(data, "memory"))?;
    decode_blocks(&source)
}

/// Encode `raster` into an in-memory TIFF.
pub fn encode_to_vec(raster: &RasterBuffer) -> Result<Vec<u8>, ContainerError> {
    let finish_error = |source| ContainerError::Finish {
        path: "memory".to_string(),
        source,
    };

    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), "memory").map_err(finish_error)?;
    encode_scanlines(raster, &mut writer)?;
    Ok(writer.finish().map_err(finish_error)?.into_inner())
}

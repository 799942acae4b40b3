//! # TIFF Intensity
//!
//! Decode strip- or tile-organized TIFF images into a flat raster, apply
//! pointwise intensity transforms, and write the result back out.
//!
//! ## Features
//!
//! - **Strip and tile decoding**: assembles stored blocks into one contiguous
//!   [`RasterBuffer`], clipping tiles that overhang the image edge
//! - **Lossless round trip**: `decode(encode(raster)) == raster`
//! - **Plane merging**: three single-channel planes into one RGB raster
//! - **Intensity transforms**: negate, threshold, gamma, histogram
//!   equalization and piecewise-linear curves, all as 256-entry lookup tables
//! - **Baseline TIFF backend**: classic and BigTIFF reading in either byte
//!   order, uncompressed little-endian writing
//!
//! ## Architecture
//!
//! - [`io`] - synchronous range readers over files and memory
//! - [`mod@format`] - TIFF header/IFD parsing, validation and the writer
//! - [`container`] - tag store, block reader and scanline writer traits
//! - [`raster`] - raster buffer, plane merging and histograms
//! - [`codec`] - block assembly into rasters and scanline encoding
//! - [`transform`] - lookup-table intensity transforms
//! - [`config`] - CLI types
//!
//! ## Row order
//!
//! A decoded [`RasterBuffer`] stores its rows bottom-up: [`RasterBuffer::pixels`]
//! and [`RasterBuffer::row`]`(0)` start with the last scanline of the file.
//! Use [`RasterBuffer::scanline`] to read rows in file order. Encoding
//! flips them back, so `decode(encode(raster)) == raster`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tiff_intensity::{codec, Transform};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut raster = codec::decode("scan.tif")?;
//!     tiff_intensity::apply_all(&mut raster, &[Transform::Gamma(2.2), Transform::Equalize])?;
//!     codec::encode(&raster, "scan-adjusted.tif")?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod io;
pub mod raster;
pub mod transform;

// Re-export commonly used types
pub use codec::{decode, decode_blocks, decode_bytes, encode, encode_scanlines, encode_to_vec};
pub use config::{ApplyConfig, Cli, Command, InfoConfig, MergeConfig, ThresholdRange};
pub use container::{BlockReader, ScanlineWriter, TagStore, TiffSource};
pub use error::{ContainerError, IoError, RasterError, TiffError, TransformError};
pub use format::tiff::{
    ByteOrder, Compression, FieldType, Ifd, IfdEntry, TiffHeader, TiffTag, TiffWriter,
    ValidationError, ValidationResult,
};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use raster::{merge_planes, Histogram, HistogramSummary, Photometric, RasterBuffer};
pub use transform::{apply_all, CurveSegment, Lut, Transform};

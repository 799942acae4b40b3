//! Baseline TIFF reading and writing.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets, BigTIFF 64-bit ones.
//!   Both are read; the writer always produces little-endian classic TIFF.
//!
//! - **IFD (Image File Directory)**: tag entries describing one image and pointing at its
//!   strips or tiles. Only the first IFD is decoded.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod parser;
mod tags;
mod validation;
mod values;
mod writer;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{
    Compression, FieldType, TiffTag, ORIENTATION_TOP_LEFT, PLANAR_CONFIG_CONTIGUOUS,
    PLANAR_CONFIG_SEPARATE,
};
pub use validation::{check_compression, validate_ifd, ValidationError, ValidationResult};
pub use values::{parse_u64_array, ValueReader};
pub use writer::{TiffWriter, STRIP_SIZE_DEFAULT};

//! Container access seen by the codec.
//!
//! The codec never touches file structure directly. It reads geometry from a
//! [`TagStore`], pulls encoded strips or tiles through a [`BlockReader`], and
//! emits decoded rows to a [`ScanlineWriter`]:
//!
//! ```text
//! ┌──────────────┐  get_tag / read_strip / read_tile  ┌───────────────┐
//! │  TiffSource  │ ─────────────────────────────────▶ │               │
//! │ (RangeReader)│                                    │    codec      │
//! └──────────────┘                                    │ decode/encode │
//! ┌──────────────┐    set_tag / write_scanline        │               │
//! │  TiffWriter  │ ◀───────────────────────────────── │               │
//! └──────────────┘                                    └───────────────┘
//! ```
//!
//! Tests substitute in-memory implementations of these traits to exercise
//! the block arithmetic without building files.

mod source;

pub use source::TiffSource;

use crate::error::IoError;
use crate::format::tiff::TiffTag;

// =============================================================================
// Traits
// =============================================================================

/// Read access to integer-valued tags.
pub trait TagStore {
    /// Value of `tag`, with TIFF defaults applied for tags that have them.
    ///
    /// Returns `None` when the tag is absent and has no default.
    fn get_tag(&self, tag: TiffTag) -> Option<u32>;
}

/// Reads encoded strips or tiles of one image.
pub trait BlockReader: TagStore {
    /// Whether the image is organized in tiles rather than strips.
    fn is_tiled(&self) -> bool;

    /// Number of strips in the image.
    fn strip_count(&self) -> u32;

    /// Size in bytes of a full strip (RowsPerStrip decoded scanlines).
    fn strip_byte_size(&self) -> usize;

    /// Size in bytes of one decoded tile.
    fn tile_byte_size(&self) -> usize;

    /// Read strip `index` into `buf`, returning the number of bytes copied.
    fn read_strip(&self, index: u32, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Read the tile containing pixel `(x, y)` into `buf`, returning the
    /// number of bytes copied.
    fn read_tile(&self, x: u32, y: u32, buf: &mut [u8]) -> Result<usize, IoError>;
}

/// Accepts tags and decoded scanlines for a new image.
pub trait ScanlineWriter {
    /// Record a tag value. Tags must be set before the first scanline.
    fn set_tag(&mut self, tag: TiffTag, value: u32);

    /// Preferred RowsPerStrip for scanlines of `scanline_bytes` bytes.
    fn default_strip_rows(&self, scanline_bytes: usize) -> u32;

    /// Write scanline `row` (0 = top of the stored image).
    fn write_scanline(&mut self, row: u32, bytes: &[u8]) -> Result<(), IoError>;
}

//! Container formats.
//!
//! Only baseline TIFF is implemented: uncompressed, interleaved samples,
//! organized in strips or tiles.

pub mod tiff;

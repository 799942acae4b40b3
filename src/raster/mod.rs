//! In-memory rasters.
//!
//! A [`RasterBuffer`] owns one contiguous, row-major, channel-interleaved
//! byte buffer together with its geometry. It is produced by the codec or by
//! [`merge_planes`], rewritten in place by intensity transforms, and read by
//! [`Histogram`].

mod buffer;
mod histogram;

pub use buffer::{merge_planes, Photometric, RasterBuffer, MAX_RASTER_BYTES};
pub use histogram::{Histogram, HistogramSummary, BINS};

//! In-place intensity transforms on [`RasterBuffer`].
//!
//! Each transform validates its arguments, builds one [`Lut`] and maps every
//! sample of the flat buffer through it. Parameter errors are raised before
//! any sample changes. An empty raster is left untouched.

use tracing::debug;

use crate::error::TransformError;
use crate::raster::{Histogram, RasterBuffer};

use super::curve::CurveSegment;
use super::lut::Lut;

/// Sample depth the transforms operate on.
const TRANSFORM_BIT_DEPTH: u32 = 8;

impl RasterBuffer {
    /// Map every sample through `lut`.
    ///
    /// # Errors
    /// `UnsupportedBitDepth` for rasters that are not 8 bits per sample.
    pub fn apply_lut(&mut self, lut: &Lut) -> Result<(), TransformError> {
        if self.is_empty() {
            return Ok(());
        }
        if self.bit_depth() != TRANSFORM_BIT_DEPTH {
            return Err(TransformError::UnsupportedBitDepth(self.bit_depth()));
        }
        lut.apply(self.pixels_mut());
        Ok(())
    }

    /// `x -> 255 - x`
    pub fn negate(&mut self) -> Result<(), TransformError> {
        self.apply_lut(&Lut::negate())
    }

    /// Binary threshold: values below `value` become 0, the rest 255.
    pub fn threshold(&mut self, value: u8) -> Result<(), TransformError> {
        self.threshold_range(value, value)
    }

    /// Values below `lower` become 0, values at or above `upper` become 255.
    pub fn threshold_range(&mut self, lower: u8, upper: u8) -> Result<(), TransformError> {
        let lut = Lut::threshold(lower, upper)?;
        self.apply_lut(&lut)
    }

    /// Gamma correction, `x -> round(255 * (x / 255) ^ (1 / gamma))`.
    pub fn gamma_correct(&mut self, gamma: f64) -> Result<(), TransformError> {
        let lut = Lut::gamma(gamma)?;
        self.apply_lut(&lut)
    }

    /// Histogram equalization of the current contents. See [`Lut::equalize`].
    pub fn equalize(&mut self) -> Result<(), TransformError> {
        let histogram = self.histogram();
        let lut = Lut::equalize(&histogram);
        debug!(
            samples = histogram.total(),
            first_empty_bin = ?histogram.first_empty_bin(),
            "Equalizing"
        );
        self.apply_lut(&lut)
    }

    /// Piecewise-linear curves. See [`Lut::curves`].
    pub fn curves(&mut self, segments: &[CurveSegment]) -> Result<(), TransformError> {
        let lut = Lut::curves(segments)?;
        self.apply_lut(&lut)
    }

    /// 256-bin histogram of every sample.
    pub fn histogram(&self) -> Histogram {
        Histogram::of(self)
    }
}

//! 256-entry lookup tables.
//!
//! Every intensity transform is a total map from byte values to byte
//! values. Each is built once per call as a [`Lut`] and applied to every
//! sample.

use std::ops::Index;

use crate::error::TransformError;
use crate::raster::{Histogram, BINS};

use super::curve::CurveSegment;

/// A total mapping from each byte value to an output byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lut([u8; BINS]);

impl Default for Lut {
    fn default() -> Self {
        Self::identity()
    }
}

impl Lut {
    pub fn identity() -> Self {
        Self::from_fn(|x| x)
    }

    /// Build a table by evaluating `f` at every byte value.
    pub fn from_fn(mut f: impl FnMut(u8) -> u8) -> Self {
        let mut table = [0u8; BINS];
        for (x, entry) in table.iter_mut().enumerate() {
            *entry = f(x as u8);
        }
        Self(table)
    }

    /// `x -> 255 - x`
    pub fn negate() -> Self {
        Self::from_fn(|x| u8::MAX - x)
    }

    /// Values below `lower` become 0, values at or above `upper` become 255,
    /// the rest pass through.
    ///
    /// With `lower == upper` this is a binary threshold.
    pub fn threshold(lower: u8, upper: u8) -> Result<Self, TransformError> {
        if lower > upper {
            return Err(TransformError::InvalidParameter {
                name: "threshold",
                message: format!("lower bound {} exceeds upper bound {}", lower, upper),
            });
        }

        Ok(Self::from_fn(|x| {
            if x < lower {
                u8::MIN
            } else if x >= upper {
                u8::MAX
            } else {
                x
            }
        }))
    }

    /// `x -> round(255 * (x / 255) ^ (1 / gamma))`
    pub fn gamma(gamma: f64) -> Result<Self, TransformError> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(TransformError::InvalidParameter {
                name: "gamma",
                message: format!("must be a finite positive number, got {}", gamma),
            });
        }

        let exponent = 1.0 / gamma;
        Ok(Self::from_fn(|x| {
            let max = u8::MAX as f64;
            ((x as f64 / max).powf(exponent) * max)
                .round()
                .clamp(0.0, max) as u8
        }))
    }

    /// Cumulative-histogram equalization.
    ///
    /// Locates the first empty bin `i0` (bin 0 when every bin is occupied),
    /// scales by `254 / (total - hist[i0])` and maps each `i > i0` to the
    /// rounded, scaled sum of bins `i0 + 1 ..= i`. Values up to and
    /// including `i0` map to 0.
    pub fn equalize(histogram: &Histogram) -> Self {
        let mut table = [0u8; BINS];
        let first = histogram.first_empty_bin().unwrap_or(0);

        let denominator = histogram.total() - histogram[first];
        if denominator == 0 {
            return Self(table);
        }
        let scale = (u8::MAX as f32 - 1.0) / denominator as f32;

        let mut sum = 0u64;
        for i in first + 1..BINS {
            sum += histogram[i];
            table[i] = (sum as f32 * scale).round().clamp(0.0, u8::MAX as f32) as u8;
        }
        Self(table)
    }

    /// Piecewise-linear map through `segments`.
    ///
    /// Each segment fills the half-open range `begin_x..end_x`; later
    /// segments overwrite earlier ones where they overlap. A segment ending
    /// at 255 also sets entry 255 to its `end_y`, since no half-open range
    /// reaches it. Values no segment covers map to 0. An empty list means
    /// the identity segment (0,0)-(255,255).
    pub fn curves(segments: &[CurveSegment]) -> Result<Self, TransformError> {
        for segment in segments {
            segment.validate()?;
        }

        let segments = if segments.is_empty() {
            std::slice::from_ref(&CurveSegment::IDENTITY)
        } else {
            segments
        };

        let mut table = [0u8; BINS];
        for segment in segments {
            for x in segment.begin_x..segment.end_x {
                table[x as usize] = segment.value_at(x);
            }
            if segment.end_x == u8::MAX {
                table[BINS - 1] = segment.end_y;
            }
        }
        Ok(Self(table))
    }

    #[inline]
    pub fn get(&self, value: u8) -> u8 {
        self.0[value as usize]
    }

    pub fn as_array(&self) -> &[u8; BINS] {
        &self.0
    }

    /// Map every sample in place.
    pub fn apply(&self, samples: &mut [u8]) {
        for sample in samples {
            *sample = self.0[*sample as usize];
        }
    }

    /// `self` followed by `next`.
    pub fn then(&self, next: &Lut) -> Lut {
        Self::from_fn(|x| next.get(self.get(x)))
    }
}

impl Index<u8> for Lut {
    type Output = u8;

    fn index(&self, value: u8) -> &u8 {
        &self.0[value as usize]
    }
}

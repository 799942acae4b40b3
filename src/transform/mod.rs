//! Pointwise intensity transforms.
//!
//! Transforms are methods on [`RasterBuffer`] backed by [`Lut`]s:
//!
//! | Method | Map |
//! |---|---|
//! | `negate` | `255 - x` |
//! | `threshold` / `threshold_range` | 0 below `lower`, 255 at or above `upper` |
//! | `gamma_correct` | `round(255 * (x/255)^(1/gamma))` |
//! | `equalize` | cumulative histogram from the first empty bin |
//! | `curves` | piecewise-linear through [`CurveSegment`]s |
//!
//! [`Transform`] names one step so a sequence can be configured and run.

mod curve;
mod intensity;
mod lut;

pub use curve::CurveSegment;
pub use lut::Lut;

use tracing::debug;

use crate::error::TransformError;
use crate::raster::RasterBuffer;

/// One configured transform step.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Negate,
    Threshold { lower: u8, upper: u8 },
    Gamma(f64),
    Curves(Vec<CurveSegment>),
    Equalize,
}

impl Transform {
    /// Check parameters without touching any raster.
    pub fn validate(&self) -> Result<(), TransformError> {
        match self {
            Transform::Negate | Transform::Equalize => Ok(()),
            Transform::Threshold { lower, upper } => Lut::threshold(*lower, *upper).map(drop),
            Transform::Gamma(gamma) => Lut::gamma(*gamma).map(drop),
            Transform::Curves(segments) => Lut::curves(segments).map(drop),
        }
    }

    pub fn apply(&self, raster: &mut RasterBuffer) -> Result<(), TransformError> {
        match self {
            Transform::Negate => raster.negate(),
            Transform::Threshold { lower, upper } => raster.threshold_range(*lower, *upper),
            Transform::Gamma(gamma) => raster.gamma_correct(*gamma),
            Transform::Curves(segments) => raster.curves(segments),
            Transform::Equalize => raster.equalize(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::Negate => "negate",
            Transform::Threshold { .. } => "threshold",
            Transform::Gamma(_) => "gamma",
            Transform::Curves(_) => "curves",
            Transform::Equalize => "equalize",
        }
    }
}

/// Validate every step, then apply them in order.
///
/// Nothing is modified if any step has invalid parameters.
pub fn apply_all(raster: &mut RasterBuffer, transforms: &[Transform]) -> Result<(), TransformError> {
    for transform in transforms {
        transform.validate()?;
    }
    for transform in transforms {
        debug!(transform = transform.name(), "Applying transform");
        transform.apply(raster)?;
    }
    Ok(())
}

//! Piecewise-linear curve segments.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::TransformError;

/// One piece of a piecewise-linear intensity map, from `(begin_x, begin_y)`
/// to `(end_x, end_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurveSegment {
    pub begin_x: u8,
    pub begin_y: u8,
    pub end_x: u8,
    pub end_y: u8,
}

impl CurveSegment {
    /// The straight line from (0, 0) to (255, 255).
    pub const IDENTITY: CurveSegment = CurveSegment::new(0, 0, 255, 255);

    pub const fn new(begin_x: u8, begin_y: u8, end_x: u8, end_y: u8) -> Self {
        Self {
            begin_x,
            begin_y,
            end_x,
            end_y,
        }
    }

    /// Reject segments that run backwards along x.
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.begin_x > self.end_x {
            return Err(TransformError::InvalidParameter {
                name: "curve",
                message: format!(
                    "segment {} has begin_x {} after end_x {}",
                    self, self.begin_x, self.end_x
                ),
            });
        }
        Ok(())
    }

    /// Output for `x` in `begin_x..=end_x`.
    ///
    /// Points before `end_x` use the integer slope
    /// `(x - begin_x) * (end_y - begin_y) / (1 + end_x - begin_x)`, truncated
    /// toward zero; `end_x` maps to `end_y` exactly. [`Lut::curves`] only
    /// reads `end_x` for segments ending at 255.
    ///
    /// [`Lut::curves`]: super::Lut::curves
    pub fn value_at(&self, x: u8) -> u8 {
        if x == self.end_x {
            return self.end_y;
        }
        let dx = x as i32 - self.begin_x as i32;
        let rise = self.end_y as i32 - self.begin_y as i32;
        let run = 1 + self.end_x as i32 - self.begin_x as i32;
        (self.begin_y as i32 + dx * rise / run).clamp(0, 255) as u8
    }
}

impl fmt::Display for CurveSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.begin_x, self.begin_y, self.end_x, self.end_y
        )
    }
}

impl FromStr for CurveSegment {
    type Err = String;

    /// Parse `begin_x,begin_y,end_x,end_y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u8>()
                    .map_err(|e| format!("invalid curve value '{}': {}", part.trim(), e))
            })
            .collect::<Result<Vec<u8>, String>>()?;

        match values[..] {
            [begin_x, begin_y, end_x, end_y] => Ok(Self::new(begin_x, begin_y, end_x, end_y)),
            _ => Err(format!(
                "expected 4 comma-separated values (bx,by,ex,ey), got {}",
                values.len()
            )),
        }
    }
}

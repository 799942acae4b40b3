//! Flat, row-major, channel-interleaved pixel storage.

use serde::Serialize;

use crate::error::RasterError;

// =============================================================================
// Photometric
// =============================================================================

/// How sample values map to visual intensity or color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Photometric {
    /// 0 is white
    MinIsWhite,
    /// 0 is black
    #[default]
    MinIsBlack,
    /// Interleaved red, green, blue
    Rgb,
    /// Luma plus two chroma components
    YCbCr,
}

impl Photometric {
    /// Map a PhotometricInterpretation tag value.
    ///
    /// Returns `None` for interpretations the raster does not model
    /// (palette, mask, CMYK, CIELab, ...).
    pub fn from_tag(value: u32) -> Option<Self> {
        match value {
            0 => Some(Photometric::MinIsWhite),
            1 => Some(Photometric::MinIsBlack),
            2 => Some(Photometric::Rgb),
            6 => Some(Photometric::YCbCr),
            _ => None,
        }
    }

    /// PhotometricInterpretation tag value.
    pub const fn tag_value(self) -> u32 {
        match self {
            Photometric::MinIsWhite => 0,
            Photometric::MinIsBlack => 1,
            Photometric::Rgb => 2,
            Photometric::YCbCr => 6,
        }
    }
}

// =============================================================================
// RasterBuffer
// =============================================================================

/// Largest pixel buffer a raster may declare (4 GiB).
pub const MAX_RASTER_BYTES: u64 = 4 << 30;

/// An image held as one contiguous byte buffer.
///
/// Rows are stored bottom-up: buffer row 0 is the last scanline of the
/// stored image. [`RasterBuffer::scanline`] addresses rows top-down, in the
/// order the container stores them.
///
/// `pixels.len()` always equals
/// `width * length * channels * bytes_per_sample`. Cloning copies the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    length: u32,
    channels: u32,
    bit_depth: u32,
    photometric: Photometric,
    pixels: Vec<u8>,
}

impl Default for RasterBuffer {
    fn default() -> Self {
        Self {
            width: 0,
            length: 0,
            channels: 1,
            bit_depth: 8,
            photometric: Photometric::MinIsBlack,
            pixels: Vec::new(),
        }
    }
}

impl RasterBuffer {
    /// Allocate a zero-filled raster.
    pub fn new(
        width: u32,
        length: u32,
        channels: u32,
        bit_depth: u32,
        photometric: Photometric,
    ) -> Result<Self, RasterError> {
        let size = byte_size(width, length, channels, bit_depth)?;
        let too_large = RasterError::TooLarge {
            width,
            length,
            channels,
            bit_depth,
        };
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(size).map_err(|_| too_large)?;
        pixels.resize(size, 0);
        Ok(Self {
            width,
            length,
            channels,
            bit_depth,
            photometric,
            pixels,
        })
    }

    /// Wrap existing pixels, which must be bottom-up rows of exactly the
    /// geometry's byte size.
    pub fn from_pixels(
        width: u32,
        length: u32,
        channels: u32,
        bit_depth: u32,
        photometric: Photometric,
        pixels: Vec<u8>,
    ) -> Result<Self, RasterError> {
        let expected = byte_size(width, length, channels, bit_depth)?;
        if pixels.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            length,
            channels,
            bit_depth,
            photometric,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Row count.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Bits per sample.
    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    pub fn photometric(&self) -> Photometric {
        self.photometric
    }

    pub fn set_photometric(&mut self, photometric: Photometric) {
        self.photometric = photometric;
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.bit_depth.div_ceil(8) as usize
    }

    /// Bytes in one row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.channels as usize * self.bytes_per_sample()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Buffer row `row` (0 = bottom of the image), or `None` past the end.
    pub fn row(&self, row: u32) -> Option<&[u8]> {
        if row >= self.length {
            return None;
        }
        let start = row as usize * self.row_bytes();
        Some(&self.pixels[start..start + self.row_bytes()])
    }

    pub fn row_mut(&mut self, row: u32) -> Option<&mut [u8]> {
        if row >= self.length {
            return None;
        }
        let row_bytes = self.row_bytes();
        let start = row as usize * row_bytes;
        Some(&mut self.pixels[start..start + row_bytes])
    }

    /// Scanline `y` in container order (0 = top of the stored image).
    pub fn scanline(&self, y: u32) -> Option<&[u8]> {
        if y >= self.length {
            return None;
        }
        self.row(self.length - 1 - y)
    }

    pub(crate) fn scanline_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.length {
            return None;
        }
        self.row_mut(self.length - 1 - y)
    }
}

fn byte_size(width: u32, length: u32, channels: u32, bit_depth: u32) -> Result<usize, RasterError> {
    (width as u64)
        .checked_mul(length as u64)
        .and_then(|v| v.checked_mul(channels as u64))
        .and_then(|v| v.checked_mul(bit_depth.div_ceil(8) as u64))
        .filter(|&v| v <= MAX_RASTER_BYTES)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or(RasterError::TooLarge {
            width,
            length,
            channels,
            bit_depth,
        })
}

// =============================================================================
// Plane merge
// =============================================================================

/// Interleave three single-channel planes into one RGB raster.
///
/// Sample `i` of each plane lands at samples `3i`, `3i+1`, `3i+2`.
///
/// # Errors
/// `GeometryMismatch` if the planes differ in width, length or bit depth,
/// or if any plane has more than one channel.
pub fn merge_planes(
    red: &RasterBuffer,
    green: &RasterBuffer,
    blue: &RasterBuffer,
) -> Result<RasterBuffer, RasterError> {
    let describe = |r: &RasterBuffer| {
        format!(
            "{}x{}, {} channel(s), {} bits",
            r.width, r.length, r.channels, r.bit_depth
        )
    };
    let expected = |r: &RasterBuffer| {
        format!("{}x{}, 1 channel(s), {} bits", r.width, r.length, r.bit_depth)
    };

    for (plane, raster) in [("red", red), ("green", green), ("blue", blue)] {
        if raster.channels != 1
            || raster.width != red.width
            || raster.length != red.length
            || raster.bit_depth != red.bit_depth
        {
            return Err(RasterError::GeometryMismatch {
                plane,
                expected: expected(red),
                actual: describe(raster),
            });
        }
    }

    let sample = red.bytes_per_sample().max(1);
    let mut pixels = Vec::with_capacity(red.pixels.len() * 3);
    for ((r, g), b) in red
        .pixels
        .chunks_exact(sample)
        .zip(green.pixels.chunks_exact(sample))
        .zip(blue.pixels.chunks_exact(sample))
    {
        pixels.extend_from_slice(r);
        pixels.extend_from_slice(g);
        pixels.extend_from_slice(b);
    }

    RasterBuffer::from_pixels(
        red.width,
        red.length,
        3,
        red.bit_depth,
        Photometric::Rgb,
        pixels,
    )
}

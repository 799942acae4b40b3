//! Baseline TIFF validation.
//!
//! The decoder reads uncompressed, chunky (interleaved) images organized
//! either in strips or in tiles. Anything outside that subset is rejected
//! when the container is opened, before any block is read.

use crate::error::TiffError;

use super::parser::{ByteOrder, Ifd};
use super::tags::{Compression, TiffTag, PLANAR_CONFIG_CONTIGUOUS, PLANAR_CONFIG_SEPARATE};

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of validating an IFD: fatal errors plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// First error as a [`TiffError`], or `Ok(())` when valid.
    pub fn into_result(self) -> Result<(), TiffError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

/// A reason an IFD cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Compression other than None
    UnsupportedCompression { compression: u16, name: String },

    /// Samples are stored in separate planes
    SeparatePlanes,

    /// Image width or length is missing
    MissingGeometry { missing: Vec<&'static str> },

    /// Neither a complete strip layout nor a complete tile layout
    MissingBlockTags { missing: Vec<&'static str> },

    /// Tile dimensions are zero
    InvalidTileDimensions { tile_width: u32, tile_length: u32 },
}

impl From<ValidationError> for TiffError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::UnsupportedCompression { name, .. } => {
                TiffError::UnsupportedCompression(name)
            }
            ValidationError::SeparatePlanes => TiffError::UnsupportedLayout(
                "separate sample planes (PlanarConfiguration = 2)".to_string(),
            ),
            ValidationError::MissingGeometry { missing }
            | ValidationError::MissingBlockTags { missing } => {
                TiffError::MissingTag(missing.first().copied().unwrap_or("StripOffsets"))
            }
            ValidationError::InvalidTileDimensions {
                tile_width,
                tile_length,
            } => TiffError::InvalidTagValue {
                tag: "TileWidth/TileLength",
                message: format!("tile dimensions {}x{} are invalid", tile_width, tile_length),
            },
        }
    }
}

// =============================================================================
// IFD Validation
// =============================================================================

/// Validate that an IFD describes an image the decoder can read.
///
/// Checks compression, planar configuration, required geometry tags and
/// that either the strip or the tile tag set is complete. Absent
/// Compression and PlanarConfiguration tags take their TIFF defaults.
pub fn validate_ifd(ifd: &Ifd, byte_order: ByteOrder) -> ValidationResult {
    let mut result = ValidationResult::default();

    if let Some(error) = check_compression(ifd, byte_order) {
        result.add_error(error);
    }

    match ifd.inline_value(TiffTag::PlanarConfiguration, byte_order) {
        None | Some(PLANAR_CONFIG_CONTIGUOUS) => {}
        Some(PLANAR_CONFIG_SEPARATE) => result.add_error(ValidationError::SeparatePlanes),
        Some(other) => result.add_warning(format!(
            "Unknown PlanarConfiguration {}, assuming contiguous",
            other
        )),
    }

    let missing = missing_tags(ifd, &[TiffTag::ImageWidth, TiffTag::ImageLength]);
    if !missing.is_empty() {
        result.add_error(ValidationError::MissingGeometry { missing });
    }

    if ifd.is_tiled() {
        let missing = missing_tags(ifd, &[TiffTag::TileByteCounts]);
        if !missing.is_empty() {
            result.add_error(ValidationError::MissingBlockTags { missing });
        }
        check_tile_dimensions(ifd, byte_order, &mut result);
    } else {
        let missing = missing_tags(ifd, &[TiffTag::StripOffsets, TiffTag::StripByteCounts]);
        if !missing.is_empty() {
            result.add_error(ValidationError::MissingBlockTags { missing });
        }
        if ifd.has_tag(TiffTag::TileWidth) || ifd.has_tag(TiffTag::TileOffsets) {
            result.add_warning("Incomplete tile tags ignored, reading strips".to_string());
        }
    }

    result
}

/// Returns an error if the IFD's compression is not decodable.
pub fn check_compression(ifd: &Ifd, byte_order: ByteOrder) -> Option<ValidationError> {
    let value = ifd.inline_value(TiffTag::Compression, byte_order)?;
    let value = u16::try_from(value).unwrap_or(u16::MAX);

    match Compression::from_u16(value) {
        Some(compression) if compression.is_supported() => None,
        Some(compression) => Some(ValidationError::UnsupportedCompression {
            compression: value,
            name: compression.name().to_string(),
        }),
        None => Some(ValidationError::UnsupportedCompression {
            compression: value,
            name: format!("Unknown ({})", value),
        }),
    }
}

fn missing_tags(ifd: &Ifd, tags: &[TiffTag]) -> Vec<&'static str> {
    tags.iter()
        .filter(|tag| !ifd.has_tag(**tag))
        .map(|tag| tag.name())
        .collect()
}

fn check_tile_dimensions(ifd: &Ifd, byte_order: ByteOrder, result: &mut ValidationResult) {
    let (Some(tile_width), Some(tile_length)) = (
        ifd.inline_value(TiffTag::TileWidth, byte_order),
        ifd.inline_value(TiffTag::TileLength, byte_order),
    ) else {
        return;
    };

    if tile_width == 0 || tile_length == 0 {
        result.add_error(ValidationError::InvalidTileDimensions {
            tile_width,
            tile_length,
        });
    } else if tile_width % 16 != 0 || tile_length % 16 != 0 {
        result.add_warning(format!(
            "Tile dimensions ({}x{}) are not multiples of 16",
            tile_width, tile_length
        ));
    }
}

// =============================================================================
// Tests
// =============================================================================

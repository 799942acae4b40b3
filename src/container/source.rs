//! Baseline TIFF block source.
//!
//! [`TiffSource`] parses the header and first IFD once, validates that the
//! image is decodable, resolves the geometry tags and loads the strip or tile
//! tables. Blocks are then fetched one at a time through the range reader.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{IoError, TiffError};
use crate::format::tiff::{
    validate_ifd, Ifd, IfdEntry, TiffHeader, TiffTag, ValueReader, BIGTIFF_HEADER_SIZE,
    ORIENTATION_TOP_LEFT, PLANAR_CONFIG_CONTIGUOUS,
};
use crate::io::RangeReader;

use super::{BlockReader, TagStore};

/// Scalar tags resolved at open time.
const SCALAR_TAGS: [TiffTag; 10] = [
    TiffTag::ImageWidth,
    TiffTag::ImageLength,
    TiffTag::Compression,
    TiffTag::PhotometricInterpretation,
    TiffTag::Orientation,
    TiffTag::SamplesPerPixel,
    TiffTag::RowsPerStrip,
    TiffTag::PlanarConfiguration,
    TiffTag::TileWidth,
    TiffTag::TileLength,
];

// =============================================================================
// Block layout
// =============================================================================

/// Where the encoded blocks of the image live.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockLayout {
    Strips {
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    },
    Tiles {
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
        tiles_across: u32,
    },
}

impl BlockLayout {
    fn tables(&self) -> (&[u64], &[u64]) {
        match self {
            BlockLayout::Strips {
                offsets,
                byte_counts,
            }
            | BlockLayout::Tiles {
                offsets,
                byte_counts,
                ..
            } => (offsets, byte_counts),
        }
    }
}

// =============================================================================
// TiffSource
// =============================================================================

/// Tag store and block reader over the first image of a TIFF file.
#[derive(Debug)]
pub struct TiffSource<R: RangeReader> {
    reader: R,
    header: TiffHeader,
    tags: BTreeMap<TiffTag, u32>,
    layout: BlockLayout,
    warnings: Vec<String>,
}

impl<R: RangeReader> TiffSource<R> {
    /// Parse and validate the container behind `reader`.
    ///
    /// # Errors
    /// - header and IFD errors from the parser
    /// - `UnsupportedCompression` / `UnsupportedLayout` for images outside
    ///   the uncompressed, interleaved, whole-byte-sample subset
    /// - `InvalidTagValue` when the block tables don't cover the image
    pub fn open(reader: R) -> Result<Self, TiffError> {
        let header_len = BIGTIFF_HEADER_SIZE.min(reader.size() as usize);
        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifd = read_ifd(&reader, &header, header.first_ifd_offset)?;
        if ifd.next_ifd_offset != 0 {
            debug!(
                source = reader.identifier(),
                "Additional IFDs present, decoding the first image only"
            );
        }

        let validation = validate_ifd(&ifd, header.byte_order);
        let warnings = validation.warnings.clone();
        validation.into_result()?;
        for warning in &warnings {
            warn!(source = reader.identifier(), "{}", warning);
        }

        let values = ValueReader::new(&reader, &header);
        let tags = resolve_tags(&ifd, &values)?;
        let layout = load_layout(&ifd, &values, &tags)?;

        debug!(
            source = reader.identifier(),
            bigtiff = header.is_bigtiff,
            byte_order = ?header.byte_order,
            width = tags.get(&TiffTag::ImageWidth).copied().unwrap_or(0),
            length = tags.get(&TiffTag::ImageLength).copied().unwrap_or(0),
            tiled = matches!(layout, BlockLayout::Tiles { .. }),
            "Opened TIFF"
        );

        Ok(Self {
            reader,
            header,
            tags,
            layout,
            warnings,
        })
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// Non-fatal validation warnings raised at open.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    /// Bytes in one decoded scanline, saturating at `usize::MAX`.
    fn scanline_bytes(&self) -> usize {
        self.pixel_bytes()
            .saturating_mul(self.tag_or(TiffTag::ImageWidth, 0) as usize)
    }

    fn pixel_bytes(&self) -> usize {
        let samples = self.tag_or(TiffTag::SamplesPerPixel, 1) as usize;
        let bits = self.tag_or(TiffTag::BitsPerSample, 8) as usize;
        samples.saturating_mul(bits.div_ceil(8))
    }

    fn tag_or(&self, tag: TiffTag, default: u32) -> u32 {
        self.tags.get(&tag).copied().unwrap_or(default)
    }

    /// Copy block `index` into `buf`.
    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<usize, IoError> {
        let (offsets, byte_counts) = self.layout.tables();
        let (Some(&offset), Some(&byte_count)) = (offsets.get(index), byte_counts.get(index))
        else {
            return Err(IoError::Read(format!(
                "{}: block {} out of range ({} blocks)",
                self.reader.identifier(),
                index,
                offsets.len()
            )));
        };

        let len = (byte_count as usize).min(buf.len());
        let bytes = self.reader.read_exact_at(offset, len)?;
        buf[..len].copy_from_slice(&bytes);
        Ok(len)
    }
}

impl<R: RangeReader> TagStore for TiffSource<R> {
    fn get_tag(&self, tag: TiffTag) -> Option<u32> {
        self.tags.get(&tag).copied()
    }
}

impl<R: RangeReader> BlockReader for TiffSource<R> {
    fn is_tiled(&self) -> bool {
        matches!(self.layout, BlockLayout::Tiles { .. })
    }

    fn strip_count(&self) -> u32 {
        match &self.layout {
            BlockLayout::Strips { offsets, .. } => offsets.len() as u32,
            BlockLayout::Tiles { .. } => 0,
        }
    }

    fn strip_byte_size(&self) -> usize {
        let length = self.tag_or(TiffTag::ImageLength, 0);
        let rows = self.tag_or(TiffTag::RowsPerStrip, length).min(length);
        (rows as usize).saturating_mul(self.scanline_bytes())
    }

    fn tile_byte_size(&self) -> usize {
        let tile_width = self.tag_or(TiffTag::TileWidth, 0) as usize;
        let tile_length = self.tag_or(TiffTag::TileLength, 0) as usize;
        tile_width
            .saturating_mul(tile_length)
            .saturating_mul(self.pixel_bytes())
    }

    fn read_strip(&self, index: u32, buf: &mut [u8]) -> Result<usize, IoError> {
        if self.is_tiled() {
            return Err(IoError::Read(format!(
                "{}: image is tiled, no strip {}",
                self.reader.identifier(),
                index
            )));
        }
        self.read_block(index as usize, buf)
    }

    fn read_tile(&self, x: u32, y: u32, buf: &mut [u8]) -> Result<usize, IoError> {
        let BlockLayout::Tiles { tiles_across, .. } = self.layout else {
            return Err(IoError::Read(format!(
                "{}: image is stripped, no tile at ({}, {})",
                self.reader.identifier(),
                x,
                y
            )));
        };

        let tile_width = self.tag_or(TiffTag::TileWidth, 1).max(1);
        let tile_length = self.tag_or(TiffTag::TileLength, 1).max(1);
        let index = (y / tile_length) as usize * tiles_across as usize + (x / tile_width) as usize;
        self.read_block(index, buf)
    }
}

// =============================================================================
// Open helpers
// =============================================================================

fn read_ifd<R: RangeReader>(
    reader: &R,
    header: &TiffHeader,
    offset: u64,
) -> Result<Ifd, TiffError> {
    let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
    let entry_count = if header.is_bigtiff {
        header.byte_order.read_u64(&count_bytes)
    } else {
        header.byte_order.read_u16(&count_bytes) as u64
    };

    let ifd_size = Ifd::calculate_size(entry_count, header)?;
    let ifd_bytes = reader.read_exact_at(offset, ifd_size)?;
    Ifd::parse(&ifd_bytes, header)
}

/// Resolve scalar tags and apply the TIFF defaults.
fn resolve_tags<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
) -> Result<BTreeMap<TiffTag, u32>, TiffError> {
    let mut tags = BTreeMap::new();

    for tag in SCALAR_TAGS {
        if let Some(entry) = ifd.get_entry_by_tag(tag) {
            tags.insert(tag, values.read_u32(entry)?);
        }
    }

    let length = tags.get(&TiffTag::ImageLength).copied().unwrap_or(0);
    tags.entry(TiffTag::SamplesPerPixel).or_insert(1);
    tags.entry(TiffTag::RowsPerStrip).or_insert(length);
    tags.entry(TiffTag::Orientation).or_insert(ORIENTATION_TOP_LEFT);
    tags.entry(TiffTag::PlanarConfiguration)
        .or_insert(PLANAR_CONFIG_CONTIGUOUS);
    tags.entry(TiffTag::Compression).or_insert(1);

    let bits = match ifd.get_entry_by_tag(TiffTag::BitsPerSample) {
        Some(entry) => bits_per_sample(entry, values)?,
        None => 1,
    };
    if bits == 0 || bits % 8 != 0 {
        return Err(TiffError::UnsupportedLayout(format!(
            "{}-bit samples (only whole-byte samples are supported)",
            bits
        )));
    }
    tags.insert(TiffTag::BitsPerSample, bits);

    if tags.get(&TiffTag::SamplesPerPixel) == Some(&0) {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::SamplesPerPixel.name(),
            message: "must be at least 1".to_string(),
        });
    }

    if let Some(&orientation) = tags.get(&TiffTag::Orientation) {
        if orientation != ORIENTATION_TOP_LEFT {
            warn!(orientation, "Non top-left orientation, rows are read as stored");
        }
    }

    Ok(tags)
}

/// First BitsPerSample value; per-sample depths must agree.
fn bits_per_sample<R: RangeReader>(
    entry: &IfdEntry,
    values: &ValueReader<'_, R>,
) -> Result<u32, TiffError> {
    let depths = values.read_u32_array(entry)?;
    let Some(&first) = depths.first() else {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::BitsPerSample.name(),
            message: "no values".to_string(),
        });
    };

    if depths.iter().any(|&d| d != first) {
        return Err(TiffError::UnsupportedLayout(format!(
            "mixed bit depths {:?}",
            depths
        )));
    }
    Ok(first)
}

/// Load the strip or tile tables and check they cover the image.
fn load_layout<R: RangeReader>(
    ifd: &Ifd,
    values: &ValueReader<'_, R>,
    tags: &BTreeMap<TiffTag, u32>,
) -> Result<BlockLayout, TiffError> {
    let tag = |t: TiffTag| tags.get(&t).copied().unwrap_or(0);
    let width = tag(TiffTag::ImageWidth);
    let length = tag(TiffTag::ImageLength);

    let (offsets_tag, counts_tag, expected, tiles_across) = if ifd.is_tiled() {
        let (tile_width, tile_length) = (tag(TiffTag::TileWidth), tag(TiffTag::TileLength));
        let across = width.div_ceil(tile_width.max(1));
        let down = length.div_ceil(tile_length.max(1));
        (
            TiffTag::TileOffsets,
            TiffTag::TileByteCounts,
            across as u64 * down as u64,
            Some(across),
        )
    } else {
        let rows_per_strip = tag(TiffTag::RowsPerStrip);
        if rows_per_strip == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::RowsPerStrip.name(),
                message: "must be at least 1".to_string(),
            });
        }
        (
            TiffTag::StripOffsets,
            TiffTag::StripByteCounts,
            length.div_ceil(rows_per_strip) as u64,
            None,
        )
    };

    let read_table = |t: TiffTag| -> Result<Vec<u64>, TiffError> {
        let entry = ifd
            .get_entry_by_tag(t)
            .ok_or(TiffError::MissingTag(t.name()))?;
        let table = values.read_u64_array(entry)?;
        if (table.len() as u64) < expected {
            return Err(TiffError::InvalidTagValue {
                tag: t.name(),
                message: format!("{} entries for {} blocks", table.len(), expected),
            });
        }
        Ok(table)
    };

    let mut offsets = read_table(offsets_tag)?;
    let mut byte_counts = read_table(counts_tag)?;
    if offsets.len() as u64 > expected {
        warn!(
            blocks = offsets.len(),
            expected, "More blocks than the image needs, ignoring the rest"
        );
    }
    offsets.truncate(expected as usize);
    byte_counts.truncate(expected as usize);

    Ok(match tiles_across {
        Some(tiles_across) => BlockLayout::Tiles {
            offsets,
            byte_counts,
            tiles_across,
        },
        None => BlockLayout::Strips {
            offsets,
            byte_counts,
        },
    })
}

// =============================================================================
// Tests
// =============================================================================

//! Test utilities for integration tests.
//!
//! Provides an in-memory TIFF builder that lays out strip or tile data in
//! either byte order, classic or BigTIFF, and helpers for building the
//! scanlines and rasters the tests compare against.

use tiff_intensity::{Photometric, RasterBuffer};

// =============================================================================
// Tag values
// =============================================================================

pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_BITS_PER_SAMPLE: u16 = 258;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_PHOTOMETRIC: u16 = 262;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub const TAG_ROWS_PER_STRIP: u16 = 278;
pub const TAG_STRIP_BYTE_COUNTS: u16 = 279;
pub const TAG_PLANAR_CONFIGURATION: u16 = 284;
pub const TAG_TILE_WIDTH: u16 = 322;
pub const TAG_TILE_LENGTH: u16 = 323;
pub const TAG_TILE_OFFSETS: u16 = 324;
pub const TAG_TILE_BYTE_COUNTS: u16 = 325;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_LONG8: u16 = 16;

// =============================================================================
// TIFF File Builder
// =============================================================================

#[derive(Clone, Copy, Debug)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockKind {
    Strips,
    Tiles,
}

struct Entry {
    tag: u16,
    field_type: u16,
    values: Vec<u64>,
}

/// Builder for single-image test TIFF files.
///
/// Layout: header, block data, out-of-line tag values, IFD.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    entries: Vec<Entry>,
    blocks: Vec<Vec<u8>>,
    block_kind: BlockKind,
    byte_count_override: Option<Vec<u64>>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            entries: Vec::new(),
            blocks: Vec::new(),
            block_kind: BlockKind::Strips,
            byte_count_override: None,
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn short(mut self, tag: u16, values: &[u16]) -> Self {
        self.set(tag, TYPE_SHORT, values.iter().map(|&v| v as u64).collect());
        self
    }

    pub fn long(mut self, tag: u16, values: &[u32]) -> Self {
        self.set(tag, TYPE_LONG, values.iter().map(|&v| v as u64).collect());
        self
    }

    /// Drop a previously set tag.
    pub fn without(mut self, tag: u16) -> Self {
        self.entries.retain(|e| e.tag != tag);
        self
    }

    /// Standard geometry tags for an uncompressed interleaved image.
    pub fn image(self, width: u32, length: u32, channels: u16, photometric: u16) -> Self {
        self.long(TAG_IMAGE_WIDTH, &[width])
            .long(TAG_IMAGE_LENGTH, &[length])
            .short(TAG_BITS_PER_SAMPLE, &vec![8; channels as usize])
            .short(TAG_COMPRESSION, &[1])
            .short(TAG_PHOTOMETRIC, &[photometric])
            .short(TAG_SAMPLES_PER_PIXEL, &[channels])
            .short(TAG_PLANAR_CONFIGURATION, &[1])
    }

    pub fn strips(mut self, rows_per_strip: u32, strips: Vec<Vec<u8>>) -> Self {
        self = self.long(TAG_ROWS_PER_STRIP, &[rows_per_strip]);
        self.blocks = strips;
        self.block_kind = BlockKind::Strips;
        self
    }

    pub fn tiles(mut self, tile_width: u32, tile_length: u32, tiles: Vec<Vec<u8>>) -> Self {
        self = self
            .long(TAG_TILE_WIDTH, &[tile_width])
            .long(TAG_TILE_LENGTH, &[tile_length]);
        self.blocks = tiles;
        self.block_kind = BlockKind::Tiles;
        self
    }

    /// Record these byte counts instead of the real block sizes.
    pub fn with_byte_counts(mut self, counts: &[u64]) -> Self {
        self.byte_count_override = Some(counts.to_vec());
        self
    }

    /// Build the TIFF file data.
    pub fn build(mut self) -> Vec<u8> {
        let header_size = if self.is_bigtiff { 16 } else { 8 };
        let inline_size = if self.is_bigtiff { 8 } else { 4 };
        let mut data = Vec::new();

        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        if self.is_bigtiff {
            self.put(&mut data, 43, 2);
            self.put(&mut data, 8, 2);
            self.put(&mut data, 0, 2);
            self.put(&mut data, 0, 8);
        } else {
            self.put(&mut data, 42, 2);
            self.put(&mut data, 0, 4);
        }
        assert_eq!(data.len(), header_size);

        // Block data
        let mut offsets = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            offsets.push(data.len() as u64);
            data.extend_from_slice(block);
        }
        let counts = self
            .byte_count_override
            .clone()
            .unwrap_or_else(|| self.blocks.iter().map(|b| b.len() as u64).collect());

        let (offsets_tag, counts_tag) = match self.block_kind {
            BlockKind::Strips => (TAG_STRIP_OFFSETS, TAG_STRIP_BYTE_COUNTS),
            BlockKind::Tiles => (TAG_TILE_OFFSETS, TAG_TILE_BYTE_COUNTS),
        };
        let offset_type = if self.is_bigtiff { TYPE_LONG8 } else { TYPE_LONG };

        let mut entries = std::mem::take(&mut self.entries);
        if !offsets.is_empty() {
            entries.push(Entry {
                tag: offsets_tag,
                field_type: offset_type,
                values: offsets,
            });
            entries.push(Entry {
                tag: counts_tag,
                field_type: offset_type,
                values: counts,
            });
        }
        entries.sort_by_key(|e| e.tag);

        // Out-of-line values
        let mut value_fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            let mut bytes = Vec::new();
            for &value in &entry.values {
                self.put(&mut bytes, value, type_size(entry.field_type));
            }
            if bytes.len() > inline_size {
                if data.len() % 2 == 1 {
                    data.push(0);
                }
                let offset = data.len() as u64;
                data.extend_from_slice(&bytes);
                let mut field = Vec::new();
                self.put(&mut field, offset, inline_size);
                value_fields.push(field);
            } else {
                bytes.resize(inline_size, 0);
                value_fields.push(bytes);
            }
        }

        // IFD
        if data.len() % 2 == 1 {
            data.push(0);
        }
        let ifd_offset = data.len() as u64;
        if self.is_bigtiff {
            self.put(&mut data, entries.len() as u64, 8);
        } else {
            self.put(&mut data, entries.len() as u64, 2);
        }
        for (entry, field) in entries.iter().zip(&value_fields) {
            self.put(&mut data, entry.tag as u64, 2);
            self.put(&mut data, entry.field_type as u64, 2);
            self.put(&mut data, entry.values.len() as u64, inline_size);
            data.extend_from_slice(field);
        }
        self.put(&mut data, 0, inline_size);

        // Patch the first-IFD offset
        let mut patch = Vec::new();
        self.put(&mut patch, ifd_offset, inline_size);
        let at = if self.is_bigtiff { 8 } else { 4 };
        data[at..at + inline_size].copy_from_slice(&patch);

        data
    }

    fn set(&mut self, tag: u16, field_type: u16, values: Vec<u64>) {
        self.entries.retain(|e| e.tag != tag);
        self.entries.push(Entry {
            tag,
            field_type,
            values,
        });
    }

    /// Append the low `size` bytes of `value` in this builder's byte order.
    fn put(&self, data: &mut Vec<u8>, value: u64, size: usize) {
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(&value.to_le_bytes()[..size]),
            ByteOrderType::BigEndian => data.extend_from_slice(&value.to_be_bytes()[8 - size..]),
        }
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn type_size(field_type: u16) -> usize {
    match field_type {
        TYPE_SHORT => 2,
        TYPE_LONG => 4,
        TYPE_LONG8 => 8,
        other => panic!("builder does not write field type {}", other),
    }
}

// =============================================================================
// Pixel helpers
// =============================================================================

/// Deterministic scanlines: sample `i` of row `y` is `(y * 31 + i * 7) % 251`.
pub fn pattern_scanlines(width: u32, length: u32, channels: u32) -> Vec<Vec<u8>> {
    let row_bytes = (width * channels) as usize;
    (0..length as usize)
        .map(|y| {
            (0..row_bytes)
                .map(|i| ((y * 31 + i * 7) % 251) as u8)
                .collect()
        })
        .collect()
}

/// Group scanlines into strips of `rows_per_strip` rows.
pub fn split_strips(scanlines: &[Vec<u8>], rows_per_strip: usize) -> Vec<Vec<u8>> {
    scanlines
        .chunks(rows_per_strip)
        .map(|rows| rows.concat())
        .collect()
}

/// Cut scanlines into full-size tiles, padding overhang with `pad`.
pub fn split_tiles(
    scanlines: &[Vec<u8>],
    pixel_bytes: usize,
    tile_width: usize,
    tile_length: usize,
    pad: u8,
) -> Vec<Vec<u8>> {
    let length = scanlines.len();
    let width = scanlines.first().map_or(0, |row| row.len() / pixel_bytes);
    let mut tiles = Vec::new();

    for ty in (0..length).step_by(tile_length) {
        for tx in (0..width).step_by(tile_width) {
            let mut tile = Vec::with_capacity(tile_width * tile_length * pixel_bytes);
            for y in ty..ty + tile_length {
                for x in tx..tx + tile_width {
                    if y < length && x < width {
                        let start = x * pixel_bytes;
                        tile.extend_from_slice(&scanlines[y][start..start + pixel_bytes]);
                    } else {
                        tile.extend(std::iter::repeat(pad).take(pixel_bytes));
                    }
                }
            }
            tiles.push(tile);
        }
    }
    tiles
}

/// Assert that `raster` holds `scanlines` in container order.
pub fn assert_scanlines(raster: &RasterBuffer, scanlines: &[Vec<u8>]) {
    assert_eq!(raster.length() as usize, scanlines.len());
    for (y, expected) in scanlines.iter().enumerate() {
        assert_eq!(
            raster.scanline(y as u32).unwrap(),
            expected.as_slice(),
            "scanline {}",
            y
        );
    }
}

/// 8-bit grayscale raster from a pixel generator over (x, buffer row).
pub fn gray_raster(width: u32, length: u32, f: impl Fn(u32, u32) -> u8) -> RasterBuffer {
    let mut pixels = Vec::with_capacity((width * length) as usize);
    for row in 0..length {
        for x in 0..width {
            pixels.push(f(x, row));
        }
    }
    RasterBuffer::from_pixels(width, length, 1, 8, Photometric::MinIsBlack, pixels).unwrap()
}

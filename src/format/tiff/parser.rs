//! TIFF header and IFD parsing.
//!
//! # Header layout
//!
//! ```text
//! Classic TIFF (8 bytes)          BigTIFF (16 bytes)
//! 0-1  byte order (II / MM)       0-1   byte order (II / MM)
//! 2-3  version 42                 2-3   version 43
//! 4-7  first IFD offset (u32)     4-5   offset byte size (8)
//!                                 6-7   reserved
//!                                 8-15  first IFD offset (u64)
//! ```
//!
//! # IFD layout
//!
//! An IFD is an entry count, `count` fixed-size entries, then the offset of
//! the next IFD. Each entry is `tag (u16) | type (u16) | count | value`, where
//! `count` and `value` are 4 bytes wide in classic TIFF and 8 in BigTIFF.
//! Values that fit in the value field are stored inline, larger ones live at
//! the offset the value field holds.

use crate::error::TiffError;

use super::tags::{FieldType, TiffTag};

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

const VERSION_TIFF: u16 = 42;
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) declared by the first two header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first 2 bytes.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 2 bytes.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(leading(bytes)),
            ByteOrder::BigEndian => u16::from_be_bytes(leading(bytes)),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(leading(bytes)),
            ByteOrder::BigEndian => u32::from_be_bytes(leading(bytes)),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(leading(bytes)),
            ByteOrder::BigEndian => u64::from_be_bytes(leading(bytes)),
        }
    }
}

/// The first `N` bytes of `bytes` as an array.
#[inline]
fn leading<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from the first bytes of a file.
    ///
    /// `bytes` should hold up to [`BIGTIFF_HEADER_SIZE`] bytes; 8 are enough
    /// for classic TIFF. `file_size` bounds the first IFD offset.
    ///
    /// # Errors
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    /// - `InvalidBigTiffOffsetSize` if BigTIFF offset size is not 8
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        require_len(bytes, TIFF_HEADER_SIZE)?;

        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let (is_bigtiff, first_ifd_offset) = match byte_order.read_u16(&bytes[2..4]) {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                require_len(bytes, BIGTIFF_HEADER_SIZE)?;
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            version => return Err(TiffError::InvalidVersion(version)),
        };

        // An IFD can never overlap the header itself
        let header_size = if is_bigtiff {
            BIGTIFF_HEADER_SIZE
        } else {
            TIFF_HEADER_SIZE
        } as u64;
        if first_ifd_offset < header_size || first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of an IFD entry: 12 bytes classic, 20 bytes BigTIFF.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of offsets, entry counts and value fields (4 or 8 bytes).
    #[inline]
    pub const fn offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Read an offset-sized value (u32 classic, u64 BigTIFF).
    #[inline]
    fn read_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }
}

fn require_len(bytes: &[u8], required: usize) -> Result<(), TiffError> {
    if bytes.len() < required {
        return Err(TiffError::FileTooSmall {
            required: required as u64,
            actual: bytes.len() as u64,
        });
    }
    Ok(())
}

// =============================================================================
// IfdEntry
// =============================================================================

/// A single IFD entry with its value field kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Numeric tag ID (may be a tag we don't model)
    pub tag_id: u16,

    /// Decoded field type, `None` for types we don't read
    pub field_type: Option<FieldType>,

    /// Raw field type value as stored
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// The 4 (classic) or 8 (BigTIFF) byte value/offset field
    pub value_offset_bytes: Vec<u8>,

    /// Whether the value is stored inside `value_offset_bytes`
    pub is_inline: bool,
}

impl IfdEntry {
    /// Total size of the entry's value in bytes, `None` for unknown types
    /// or a size past `u64::MAX`.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .and_then(|t| (t.size_in_bytes() as u64).checked_mul(self.count))
    }

    /// Interpret the value field as a file offset.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }

    /// First value of an inline integer entry, widened to u64.
    ///
    /// Returns `None` if the value lives at an offset or isn't an integer.
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        if !self.is_inline || self.count == 0 {
            return None;
        }
        let bytes = &self.value_offset_bytes;
        match self.field_type? {
            FieldType::Byte => Some(bytes[0] as u64),
            FieldType::Short => Some(byte_order.read_u16(bytes) as u64),
            FieldType::Long => Some(byte_order.read_u32(bytes) as u64),
            FieldType::Long8 => Some(byte_order.read_u64(bytes)),
            FieldType::Ascii | FieldType::Undefined => None,
        }
    }

    /// First value of an inline integer entry, if it fits in a u32.
    pub fn inline_u32(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u64(byte_order)
            .and_then(|v| u32::try_from(v).ok())
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ifd {
    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD, 0 when this is the last one
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// An IFD without entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Byte size of an IFD with `entry_count` entries, including the count
    /// and next-offset fields.
    ///
    /// # Errors
    /// `TooManyEntries` if the size does not fit in `usize`.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> Result<usize, TiffError> {
        usize::try_from(entry_count)
            .ok()
            .and_then(|count| count.checked_mul(header.ifd_entry_size()))
            .and_then(|entries| entries.checked_add(header.ifd_count_size() + header.offset_size()))
            .ok_or(TiffError::TooManyEntries(entry_count))
    }

    /// Parse an IFD from bytes starting at the entry count field.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let count_size = header.ifd_count_size();
        require_len(bytes, count_size)?;

        let entry_count = if header.is_bigtiff {
            byte_order.read_u64(bytes)
        } else {
            byte_order.read_u16(bytes) as u64
        };
        require_len(bytes, Self::calculate_size(entry_count, header)?)?;

        let entry_size = header.ifd_entry_size();
        let value_size = header.offset_size();
        let mut entries = Vec::with_capacity(entry_count as usize);

        for chunk in bytes[count_size..]
            .chunks_exact(entry_size)
            .take(entry_count as usize)
        {
            let tag_id = byte_order.read_u16(&chunk[0..2]);
            let field_type_raw = byte_order.read_u16(&chunk[2..4]);
            let field_type = FieldType::from_u16(field_type_raw);
            let count = header.read_offset(&chunk[4..4 + value_size]);
            let value_offset_bytes = chunk[4 + value_size..4 + 2 * value_size].to_vec();
            let is_inline = field_type
                .map(|t| t.fits_inline(count, header.is_bigtiff))
                .unwrap_or(false);

            entries.push(IfdEntry {
                tag_id,
                field_type,
                field_type_raw,
                count,
                value_offset_bytes,
                is_inline,
            });
        }

        let next_at = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = header.read_offset(&bytes[next_at..next_at + value_size]);

        Ok(Ifd {
            entries,
            next_ifd_offset,
        })
    }

    /// Look up the entry for a known tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag_id == tag.as_u16())
    }

    /// Whether the IFD carries `tag`.
    pub fn has_tag(&self, tag: TiffTag) -> bool {
        self.get_entry_by_tag(tag).is_some()
    }

    /// Tiled when the tile geometry and tile offsets are present.
    pub fn is_tiled(&self) -> bool {
        self.has_tag(TiffTag::TileWidth)
            && self.has_tag(TiffTag::TileLength)
            && self.has_tag(TiffTag::TileOffsets)
    }

    /// Stripped when strip offsets are present.
    pub fn is_stripped(&self) -> bool {
        self.has_tag(TiffTag::StripOffsets)
    }

    /// Inline single value of `tag`, if present and inline.
    pub fn inline_value(&self, tag: TiffTag, byte_order: ByteOrder) -> Option<u32> {
        self.get_entry_by_tag(tag)?.inline_u32(byte_order)
    }
}

// =============================================================================
// Tests
// =============================================================================

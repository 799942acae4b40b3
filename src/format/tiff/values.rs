//! TIFF tag value reading.
//!
//! Values are stored either inline in the IFD entry or at an offset in the
//! file. Array values (strip/tile offsets and byte counts, per-sample bit
//! depths) are fetched with a single ranged read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values respecting the file's byte order and offset width.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, from the entry itself or the file.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        if entry.field_type.is_none() {
            return Err(TiffError::UnknownFieldType(entry.field_type_raw));
        }
        let size = entry
            .value_byte_size()
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("{} values is too many", entry.count),
            })?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ));
        }

        let offset = entry.value_offset(self.header.byte_order);
        let len = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
            tag: tag_name(entry),
            message: format!("value of {} bytes is too large", size),
        })?;
        Ok(self.reader.read_exact_at(offset, len)?)
    }

    /// Read the single value of a scalar integer entry.
    pub fn read_u32(&self, entry: &IfdEntry) -> Result<u32, TiffError> {
        if let Some(value) = entry.inline_u32(self.header.byte_order) {
            if entry.count == 1 {
                return Ok(value);
            }
        }

        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected a single value, got {}", entry.count),
            });
        }

        let values = self.read_u64_array(entry)?;
        narrow(entry, values[0])
    }

    /// Read every value of an integer entry, widened to u64.
    ///
    /// Accepts BYTE, SHORT, LONG and LONG8 storage.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        parse_u64_array(&bytes, entry.count as usize, field_type, self.byte_order()).ok_or_else(
            || TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected integer values, got {:?}", field_type),
            },
        )
    }

    /// Read every value of an integer entry, each required to fit in a u32.
    pub fn read_u32_array(&self, entry: &IfdEntry) -> Result<Vec<u32>, TiffError> {
        self.read_u64_array(entry)?
            .into_iter()
            .map(|v| narrow(entry, v))
            .collect()
    }
}

fn tag_name(entry: &IfdEntry) -> &'static str {
    TiffTag::from_u16(entry.tag_id)
        .map(TiffTag::name)
        .unwrap_or("unknown")
}

fn narrow(entry: &IfdEntry, value: u64) -> Result<u32, TiffError> {
    u32::try_from(value).map_err(|_| TiffError::InvalidTagValue {
        tag: tag_name(entry),
        message: format!("value {} does not fit in 32 bits", value),
    })
}

/// Decode `count` integers of `field_type` from `bytes`.
///
/// Returns `None` for non-integer field types. Values past the end of
/// `bytes` are dropped.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Option<Vec<u64>> {
    let width = field_type.size_in_bytes();
    let read: fn(ByteOrder, &[u8]) -> u64 = match field_type {
        FieldType::Byte => |_, b| b[0] as u64,
        FieldType::Short => |o, b| o.read_u16(b) as u64,
        FieldType::Long => |o, b| o.read_u32(b) as u64,
        FieldType::Long8 => |o, b| o.read_u64(b),
        FieldType::Ascii | FieldType::Undefined => return None,
    };

    Some(
        bytes
            .chunks_exact(width)
            .take(count)
            .map(|chunk| read(byte_order, chunk))
            .collect(),
    )
}

// =============================================================================
// Tests
// =============================================================================

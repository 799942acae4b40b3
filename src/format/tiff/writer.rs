//! Streaming writer for uncompressed, little-endian classic TIFF.
//!
//! Geometry tags are recorded with `set_tag` before the first scanline.
//! Scanlines are then streamed to the sink in row order, grouped into strips
//! of `RowsPerStrip` rows. [`TiffWriter::finish`] appends the strip tables and
//! the IFD, then patches the first-IFD offset in the header.
//!
//! ```text
//! 0       header (II, 42, first IFD offset patched on finish)
//! 8       strip 0 | strip 1 | ... | strip n-1
//! ...     out-of-line tag values (BitsPerSample, strip tables)
//! ...     IFD
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::container::ScanlineWriter;
use crate::error::IoError;

use super::tags::{Compression, FieldType, TiffTag};

/// Preferred strip size in bytes, used to pick a default RowsPerStrip.
pub const STRIP_SIZE_DEFAULT: usize = 8192;

/// Byte offset of the first-IFD pointer in a classic TIFF header.
const FIRST_IFD_POINTER_OFFSET: u64 = 4;

// =============================================================================
// TiffWriter
// =============================================================================

/// Writes one uncompressed, stripped image to a seekable sink.
pub struct TiffWriter<W: Write + Seek> {
    sink: W,
    identifier: String,
    position: u64,
    tags: BTreeMap<TiffTag, u32>,
    next_row: u32,
    strip_offsets: Vec<u32>,
    strip_byte_counts: Vec<u32>,
}

impl TiffWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();
        let file = File::create(path).map_err(|e| IoError::from_write(e, &identifier))?;
        Self::new(BufWriter::new(file), identifier)
    }
}

impl<W: Write + Seek> TiffWriter<W> {
    /// Wrap `sink` and write the header. The sink must be positioned at 0.
    pub fn new(sink: W, identifier: impl Into<String>) -> Result<Self, IoError> {
        let mut writer = Self {
            sink,
            identifier: identifier.into(),
            position: 0,
            tags: BTreeMap::new(),
            next_row: 0,
            strip_offsets: Vec::new(),
            strip_byte_counts: Vec::new(),
        };

        // "II", 42, first IFD offset placeholder
        writer.write_bytes(&[0x49, 0x49, 0x2A, 0x00, 0, 0, 0, 0])?;
        Ok(writer)
    }

    /// Value recorded for `tag`, if any.
    pub fn tag(&self, tag: TiffTag) -> Option<u32> {
        self.tags.get(&tag).copied()
    }

    /// Number of scanlines written so far.
    pub fn rows_written(&self) -> u32 {
        self.next_row
    }

    /// Write the strip tables and IFD, patch the header and return the sink.
    ///
    /// Fails if fewer scanlines than ImageLength were written.
    pub fn finish(mut self) -> Result<W, IoError> {
        let length = self.tag(TiffTag::ImageLength).unwrap_or(0);
        if self.next_row != length {
            return Err(IoError::Write(format!(
                "{}: {} of {} scanlines written",
                self.identifier, self.next_row, length
            )));
        }

        let mut entries = self.pending_entries();

        // Values larger than the 4-byte value field go before the IFD
        for entry in entries.iter_mut().filter(|e| e.data.len() > 4) {
            self.align()?;
            entry.offset = Some(self.offset32()?);
            let data = std::mem::take(&mut entry.data);
            self.write_bytes(&data)?;
        }

        self.align()?;
        let ifd_offset = self.offset32()?;

        let mut ifd = Vec::with_capacity(2 + entries.len() * 12 + 4);
        ifd.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for entry in &entries {
            ifd.extend_from_slice(&entry.tag.as_u16().to_le_bytes());
            ifd.extend_from_slice(&(entry.field_type as u16).to_le_bytes());
            ifd.extend_from_slice(&entry.count.to_le_bytes());
            match entry.offset {
                Some(offset) => ifd.extend_from_slice(&offset.to_le_bytes()),
                None => {
                    let mut value = [0u8; 4];
                    value[..entry.data.len()].copy_from_slice(&entry.data);
                    ifd.extend_from_slice(&value);
                }
            }
        }
        ifd.extend_from_slice(&0u32.to_le_bytes());
        self.write_bytes(&ifd)?;

        self.seek_to(FIRST_IFD_POINTER_OFFSET)?;
        self.sink
            .write_all(&ifd_offset.to_le_bytes())
            .map_err(|e| IoError::from_write(e, &self.identifier))?;
        self.sink
            .seek(SeekFrom::End(0))
            .map_err(|e| IoError::from_write(e, &self.identifier))?;
        self.sink
            .flush()
            .map_err(|e| IoError::from_write(e, &self.identifier))?;

        debug!(
            path = %self.identifier,
            strips = self.strip_offsets.len(),
            ifd_offset,
            "Finished TIFF"
        );

        Ok(self.sink)
    }

    fn pending_entries(&self) -> Vec<PendingEntry> {
        let samples = self.tag(TiffTag::SamplesPerPixel).unwrap_or(1).max(1);
        let mut entries: Vec<PendingEntry> = self
            .tags
            .iter()
            .filter(|(tag, _)| {
                !matches!(
                    tag,
                    TiffTag::BitsPerSample | TiffTag::StripOffsets | TiffTag::StripByteCounts
                )
            })
            .map(|(&tag, &value)| match tag {
                TiffTag::ImageWidth | TiffTag::ImageLength | TiffTag::RowsPerStrip => {
                    PendingEntry::longs(tag, &[value])
                }
                _ => PendingEntry::shorts(tag, &[value as u16]),
            })
            .collect();

        if !self.tags.contains_key(&TiffTag::Compression) {
            entries.push(PendingEntry::shorts(
                TiffTag::Compression,
                &[Compression::None as u16],
            ));
        }

        let bits = self.tag(TiffTag::BitsPerSample).unwrap_or(8) as u16;
        entries.push(PendingEntry::shorts(
            TiffTag::BitsPerSample,
            &vec![bits; samples as usize],
        ));
        entries.push(PendingEntry::longs(TiffTag::StripOffsets, &self.strip_offsets));
        entries.push(PendingEntry::longs(
            TiffTag::StripByteCounts,
            &self.strip_byte_counts,
        ));

        entries.sort_by_key(|e| e.tag.as_u16());
        entries
    }

    /// Bytes per scanline from the recorded geometry tags.
    fn scanline_bytes(&self) -> Result<usize, IoError> {
        let width = self.tag(TiffTag::ImageWidth).ok_or_else(|| {
            IoError::Write(format!("{}: ImageWidth not set", self.identifier))
        })?;
        let samples = self.tag(TiffTag::SamplesPerPixel).unwrap_or(1);
        let bits = self.tag(TiffTag::BitsPerSample).unwrap_or(8);
        if bits == 0 || bits % 8 != 0 {
            return Err(IoError::Write(format!(
                "{}: cannot write {}-bit samples",
                self.identifier, bits
            )));
        }

        (width as u64)
            .checked_mul(samples as u64)
            .and_then(|v| v.checked_mul(bits as u64 / 8))
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| IoError::Write(format!("{}: scanline too large", self.identifier)))
    }

    fn offset32(&self) -> Result<u32, IoError> {
        u32::try_from(self.position).map_err(|_| {
            IoError::Write(format!(
                "{}: output exceeds the 4 GiB classic TIFF limit",
                self.identifier
            ))
        })
    }

    /// Pad to an even offset; TIFF values and IFDs start on word boundaries.
    fn align(&mut self) -> Result<(), IoError> {
        if self.position % 2 == 1 {
            self.write_bytes(&[0])?;
        }
        Ok(())
    }

    fn seek_to(&mut self, offset: u64) -> Result<(), IoError> {
        self.sink
            .seek(SeekFrom::Start(offset))
            .map_err(|e| IoError::from_write(e, &self.identifier))?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.sink
            .write_all(bytes)
            .map_err(|e| IoError::from_write(e, &self.identifier))?;
        self.position += bytes.len() as u64;
        Ok(())
    }
}

impl<W: Write + Seek> ScanlineWriter for TiffWriter<W> {
    fn set_tag(&mut self, tag: TiffTag, value: u32) {
        if self.next_row > 0 {
            warn!(
                path = %self.identifier,
                tag = tag.name(),
                "Tag set after scanlines were written"
            );
        }
        self.tags.insert(tag, value);
    }

    fn default_strip_rows(&self, scanline_bytes: usize) -> u32 {
        if scanline_bytes == 0 {
            return 1;
        }
        u32::try_from((STRIP_SIZE_DEFAULT / scanline_bytes).max(1)).unwrap_or(u32::MAX)
    }

    fn write_scanline(&mut self, row: u32, bytes: &[u8]) -> Result<(), IoError> {
        if row != self.next_row {
            return Err(IoError::Write(format!(
                "{}: scanline {} out of order, expected {}",
                self.identifier, row, self.next_row
            )));
        }

        let length = self.tag(TiffTag::ImageLength).unwrap_or(0);
        if row >= length {
            return Err(IoError::Write(format!(
                "{}: scanline {} past image length {}",
                self.identifier, row, length
            )));
        }

        let expected = self.scanline_bytes()?;
        if bytes.len() != expected {
            return Err(IoError::Write(format!(
                "{}: scanline {} is {} bytes, expected {}",
                self.identifier,
                row,
                bytes.len(),
                expected
            )));
        }

        let rows_per_strip = self
            .tag(TiffTag::RowsPerStrip)
            .unwrap_or(length)
            .clamp(1, length);
        if row % rows_per_strip == 0 {
            let offset = self.offset32()?;
            self.strip_offsets.push(offset);
            self.strip_byte_counts.push(0);
        }

        self.write_bytes(bytes)?;
        if let Some(count) = self.strip_byte_counts.last_mut() {
            *count = count.saturating_add(bytes.len() as u32);
        }
        self.next_row += 1;
        Ok(())
    }
}

// =============================================================================
// IFD entries
// =============================================================================

struct PendingEntry {
    tag: TiffTag,
    field_type: FieldType,
    count: u32,
    data: Vec<u8>,
    offset: Option<u32>,
}

impl PendingEntry {
    fn shorts(tag: TiffTag, values: &[u16]) -> Self {
        Self {
            tag,
            field_type: FieldType::Short,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            offset: None,
        }
    }

    fn longs(tag: TiffTag, values: &[u32]) -> Self {
        Self {
            tag,
            field_type: FieldType::Long,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            offset: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

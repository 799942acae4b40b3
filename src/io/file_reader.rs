//! Local range readers.
//!
//! [`FileRangeReader`] serves ranges from a file on disk with a seek + read
//! per request. [`MemoryRangeReader`] serves ranges from a buffer already in
//! memory and is what the tests build synthetic containers with.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use super::range_reader::{check_range, RangeReader};
use crate::error::IoError;

// =============================================================================
// FileRangeReader
// =============================================================================

/// Range reader over a local file.
#[derive(Debug)]
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open `path` for ranged reads.
    ///
    /// # Errors
    /// - `NotFound` if the file does not exist
    /// - `Read` if it exists but cannot be opened or stat'ed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();

        let file = File::open(path).map_err(|e| IoError::from_read(e, &identifier))?;
        let size = file
            .metadata()
            .map_err(|e| IoError::from_read(e, &identifier))?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }
}

impl RangeReader for FileRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| IoError::Read(format!("{}: file handle poisoned", self.identifier)))?;

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| IoError::from_read(e, &self.identifier))?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .map_err(|e| IoError::from_read(e, &self.identifier))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// MemoryRangeReader
// =============================================================================

/// Range reader over an in-memory buffer. Reads are zero-copy slices.
#[derive(Debug, Clone)]
pub struct MemoryRangeReader {
    data: Bytes,
    identifier: String,
}

impl MemoryRangeReader {
    /// Wrap `data`; `identifier` is only used in logs and error messages.
    pub fn new(data: impl Into<Bytes>, identifier: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            identifier: identifier.into(),
        }
    }
}

impl RangeReader for MemoryRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.data.len() as u64)?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + len))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

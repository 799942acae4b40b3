use thiserror::Error;

/// I/O errors raised by range readers and scanline sinks
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// File or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reading from the underlying resource failed
    #[error("Read error: {0}")]
    Read(String),

    /// Writing to the underlying sink failed
    #[error("Write error: {0}")]
    Write(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },
}

impl IoError {
    /// Classify a `std::io::Error` raised while reading.
    pub fn from_read(err: std::io::Error, what: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(what.to_string()),
            _ => IoError::Read(format!("{}: {}", what, err)),
        }
    }

    /// Classify a `std::io::Error` raised while writing.
    pub fn from_write(err: std::io::Error, what: &str) -> Self {
        IoError::Write(format!("{}: {}", what, err))
    }
}

/// Errors that can occur when parsing or validating TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// IFD entry count too large to address
    #[error("IFD entry count {0} is too large")]
    TooManyEntries(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type, count or value
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Compression scheme other than uncompressed
    #[error("Unsupported compression: {0} (only uncompressed data is supported)")]
    UnsupportedCompression(String),

    /// Sample layout the raster cannot represent
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors surfaced by the container codec (decode / encode).
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Source missing or unreadable
    #[error("Cannot open container {path}: {source}")]
    Open { path: String, source: IoError },

    /// Required tag absent, unreadable, or describing an unsupported layout
    #[error("Container format error: {0}")]
    Format(#[from] TiffError),

    /// A strip or tile could not be read
    #[error("Failed to read block {index}: {source}")]
    BlockRead { index: u32, source: IoError },

    /// A scanline write failed mid-encode
    #[error("Failed to write scanline {row}: {source}")]
    ScanlineWrite { row: u32, source: IoError },

    /// Strip tables or IFD could not be written after the last scanline
    #[error("Cannot finish container {path}: {source}")]
    Finish { path: String, source: IoError },

    /// Decoded geometry does not describe a valid raster
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
}

/// Errors related to raster construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    /// Channel planes passed to a merge do not share geometry
    #[error("Geometry mismatch: {plane} plane is {actual}, expected {expected}")]
    GeometryMismatch {
        plane: &'static str,
        expected: String,
        actual: String,
    },

    /// Pixel buffer length does not match width * length * channels * bytes per sample
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    /// Geometry whose byte size does not fit in memory
    #[error("Raster too large: {width}x{length} with {channels} channels at {bit_depth} bits")]
    TooLarge {
        width: u32,
        length: u32,
        channels: u32,
        bit_depth: u32,
    },
}

/// Errors raised by intensity transforms before any pixel is touched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Malformed transform argument
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Transforms operate on 8-bit samples only
    #[error("Unsupported bit depth: {0} (intensity transforms require 8 bits per sample)")]
    UnsupportedBitDepth(u32),
}

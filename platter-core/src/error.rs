//! Error types for Platter operations.
//!
//! The CRC engine itself is total and never fails. Everything around it
//! (reading sectors, mapping image files, picking a backend, checking a
//! stored checksum) reports failures through [`PlatterError`].

use std::io;
use thiserror::Error;

/// The main error type for Platter operations.
#[derive(Debug, Error)]
pub enum PlatterError {
    /// I/O error from the underlying file or device.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A sector read fell outside the source.
    #[error("Sector range out of bounds: lba {lba} + {count} exceeds {sector_count} sectors")]
    SectorOutOfRange {
        /// First sector requested.
        lba: u64,
        /// Number of sectors requested.
        count: u64,
        /// Number of sectors the source holds.
        sector_count: u64,
    },

    /// Sector size is zero or otherwise unusable.
    #[error("Invalid sector size: {size}")]
    InvalidSectorSize {
        /// The rejected sector size.
        size: usize,
    },

    /// Image length is not a whole number of sectors.
    #[error("Image length {len} is not a multiple of sector size {sector_size}")]
    InvalidImageLength {
        /// Image length in bytes.
        len: usize,
        /// Sector size in bytes.
        sector_size: usize,
    },

    /// The requested CRC backend cannot run on this CPU.
    #[error("CRC backend not supported on this CPU: {backend}")]
    UnsupportedBackend {
        /// Backend name.
        backend: String,
    },

    /// Configuration value rejected by validation.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// CRC checksum mismatch.
    #[error("CRC mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        /// Expected CRC value.
        expected: u32,
        /// Computed CRC value.
        computed: u32,
    },

    /// A textual checksum could not be parsed.
    #[error("Invalid checksum string: {input}")]
    InvalidChecksum {
        /// The rejected input.
        input: String,
    },
}

/// Result type alias for Platter operations.
pub type Result<T> = std::result::Result<T, PlatterError>;

impl PlatterError {
    /// Create a sector out of range error.
    pub fn sector_out_of_range(lba: u64, count: u64, sector_count: u64) -> Self {
        Self::SectorOutOfRange {
            lba,
            count,
            sector_count,
        }
    }

    /// Create an invalid sector size error.
    pub fn invalid_sector_size(size: usize) -> Self {
        Self::InvalidSectorSize { size }
    }

    /// Create an invalid image length error.
    pub fn invalid_image_length(len: usize, sector_size: usize) -> Self {
        Self::InvalidImageLength { len, sector_size }
    }

    /// Create an unsupported backend error.
    pub fn unsupported_backend(backend: impl Into<String>) -> Self {
        Self::UnsupportedBackend {
            backend: backend.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::CrcMismatch { expected, computed }
    }

    /// Create an invalid checksum string error.
    pub fn invalid_checksum(input: impl Into<String>) -> Self {
        Self::InvalidChecksum {
            input: input.into(),
        }
    }
}

//! # Platter Core
//!
//! CRC-32 engine for the Platter disk-image preservation toolkit.
//!
//! Every image format plugin reports CRC-32 values over sectors, tracks and
//! whole dumps, so this crate is on the hot path of nearly every command.
//! It provides:
//!
//! - [`crc_fold`]: folded CRC-32 over whole 64-byte blocks
//! - [`clmul`]: carry-less multiplication (PCLMULQDQ, PMULL, portable)
//! - [`crc`]: table-driven CRC-32 and the streaming [`Crc32`] hasher
//! - [`dispatch`]: runtime backend selection
//! - [`sector`]: sector-addressed sources and per-sector checksums
//! - [`mmap`]: memory-mapped image files (feature `mmap`)
//! - [`config`]: checksum settings and environment overrides
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Callers                                                 │
//! │     CLI, format plugins, SectorSource helpers           │
//! ├─────────────────────────────────────────────────────────┤
//! │ Streaming                                               │
//! │     Crc32, Crc32Dispatcher (block prefix + table tail)  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Kernels                                                 │
//! │     fold_blocks over CarrylessMultiply, slicing-by-8    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use platter_core::{Crc32, compute_crc32_folded};
//!
//! // Whole-block kernel: 64 zero bytes.
//! assert_eq!(compute_crc32_folded(&[0u8; 64], 64, 0), 0x758D6336);
//!
//! // Streaming, any length.
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod clmul;
pub mod config;
pub mod crc;
pub mod crc_fold;
pub mod dispatch;
pub mod error;
#[cfg(feature = "mmap")]
pub mod mmap;
pub mod sector;

// Re-exports for convenience
pub use config::ChecksumConfig;
pub use crc::Crc32;
pub use crc_fold::{BLOCK_SIZE, compute_crc32_folded};
pub use dispatch::{Backend, BackendPreference, Crc32Dispatcher};
pub use error::{PlatterError, Result};
#[cfg(feature = "mmap")]
pub use mmap::ImageFile;
pub use sector::{MemoryImage, SectorCrc, SectorSource, checksum_sectors, sector_crcs};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ChecksumConfig;
    pub use crate::crc::Crc32;
    pub use crate::crc_fold::compute_crc32_folded;
    pub use crate::dispatch::{Backend, BackendPreference, Crc32Dispatcher};
    pub use crate::error::{PlatterError, Result};
    #[cfg(feature = "mmap")]
    pub use crate::mmap::ImageFile;
    pub use crate::sector::{MemoryImage, SectorSource};
}

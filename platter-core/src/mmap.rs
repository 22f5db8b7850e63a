//! Memory-mapped disk images.
//!
//! [`ImageFile`] maps an image read-only and serves it as a
//! [`SectorSource`]. Dumps of damaged media are often not a whole number of
//! sectors; the trailing partial sector is exposed zero-padded while
//! [`ImageFile::checksum`] covers the exact bytes on disk.
//!
//! # Example
//!
//! ```no_run
//! use platter_core::mmap::ImageFile;
//! use platter_core::sector::SectorSource;
//!
//! let image = ImageFile::open("floppy.img", 512)?;
//! println!("{} sectors", image.sector_count());
//! println!("crc32 {:08x}", image.checksum(platter_core::dispatch::global()));
//! # Ok::<(), platter_core::PlatterError>(())
//! ```
//!
//! # Safety
//!
//! A mapped file that another process truncates or rewrites while mapped
//! changes underneath us. Mappings are read-only, and callers checksumming
//! live devices should copy them first.

use crate::crc::Crc32;
use crate::dispatch::Crc32Dispatcher;
use crate::error::{PlatterError, Result};
use crate::sector::{SectorSource, check_range};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A read-only memory-mapped disk image.
#[derive(Debug)]
pub struct ImageFile {
    path: PathBuf,
    /// `None` for an empty file, which cannot be mapped.
    mmap: Option<Mmap>,
    sector_size: usize,
}

impl ImageFile {
    /// Map the file at `path` with the given sector size.
    ///
    /// # Errors
    ///
    /// Returns [`PlatterError::InvalidSectorSize`] for a zero sector size and
    /// [`PlatterError::Io`] if the file cannot be opened or mapped.
    pub fn open<P: AsRef<Path>>(path: P, sector_size: usize) -> Result<Self> {
        if sector_size == 0 {
            return Err(PlatterError::invalid_sector_size(sector_size));
        }

        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: read-only mapping; concurrent modification is documented
            // as the caller's responsibility.
            Some(unsafe { Mmap::map(&file)? })
        };

        tracing::debug!(path = %path.display(), len, sector_size, "mapped image");
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            sector_size,
        })
    }

    /// Path the image was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exact image contents.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Image length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the image is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the last sector is only partly backed by the file.
    pub fn has_partial_sector(&self) -> bool {
        self.len() % self.sector_size != 0
    }

    /// CRC-32 of the exact image bytes (no padding).
    pub fn checksum(&self, dispatcher: &Crc32Dispatcher) -> u32 {
        let mut crc = Crc32::with_dispatcher(*dispatcher);
        crc.update(self.as_bytes());
        crc.finalize()
    }
}

impl SectorSource for ImageFile {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        self.len().div_ceil(self.sector_size) as u64
    }

    fn read_sector(&self, lba: u64) -> Result<Cow<'_, [u8]>> {
        self.read_sectors(lba, 1)
    }

    fn read_sectors(&self, lba: u64, count: u64) -> Result<Cow<'_, [u8]>> {
        check_range(lba, count, self.sector_count())?;

        // In range, so both fit in usize.
        let start = lba as usize * self.sector_size;
        let end = start + count as usize * self.sector_size;
        let bytes = self.as_bytes();

        if end <= bytes.len() {
            return Ok(Cow::Borrowed(&bytes[start..end]));
        }

        let mut padded = vec![0u8; end - start];
        let available = &bytes[start.min(bytes.len())..];
        padded[..available.len()].copy_from_slice(available);
        Ok(Cow::Owned(padded))
    }
}

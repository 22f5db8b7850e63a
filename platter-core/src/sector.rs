//! Sector-addressed sources and checksums over them.
//!
//! Format plugins read disk images through [`SectorSource`] and report
//! CRC-32 values over what they read. Two helpers cover the usual cases:
//!
//! - [`checksum_sectors`]: one CRC over a contiguous run of sectors
//! - [`sector_crcs`]: one CRC per sector, computed in parallel
//!
//! Every sector CRC is independent, so the parallel variant needs no
//! combine step; results come back in LBA order.

use crate::crc::Crc32;
use crate::dispatch::Crc32Dispatcher;
use crate::error::{PlatterError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::borrow::Cow;

/// Upper bound on bytes requested from a source per streaming step.
const RUN_BYTES: usize = 1024 * 1024;

/// Sector-addressed read access to a disk image.
pub trait SectorSource: Sync {
    /// Bytes per sector.
    fn sector_size(&self) -> usize;

    /// Total number of sectors.
    fn sector_count(&self) -> u64;

    /// Read one sector. The returned slice is exactly `sector_size()` bytes.
    fn read_sector(&self, lba: u64) -> Result<Cow<'_, [u8]>>;

    /// Read `count` consecutive sectors starting at `lba`.
    fn read_sectors(&self, lba: u64, count: u64) -> Result<Cow<'_, [u8]>> {
        check_range(lba, count, self.sector_count())?;
        let capacity = usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(self.sector_size()))
            .ok_or_else(|| PlatterError::sector_out_of_range(lba, count, self.sector_count()))?;

        let mut buf = Vec::with_capacity(capacity);
        for sector in lba..lba + count {
            buf.extend_from_slice(&self.read_sector(sector)?);
        }
        Ok(Cow::Owned(buf))
    }
}

/// Reject ranges that run past the end of the source.
pub fn check_range(lba: u64, count: u64, sector_count: u64) -> Result<()> {
    match lba.checked_add(count) {
        Some(end) if end <= sector_count => Ok(()),
        _ => Err(PlatterError::sector_out_of_range(lba, count, sector_count)),
    }
}

/// Disk image held in memory.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    data: Vec<u8>,
    sector_size: usize,
}

impl MemoryImage {
    /// Wrap `data` as a sequence of `sector_size`-byte sectors.
    ///
    /// # Errors
    ///
    /// Fails if `sector_size` is zero or `data` is not a whole number of
    /// sectors.
    pub fn new(data: Vec<u8>, sector_size: usize) -> Result<Self> {
        if sector_size == 0 {
            return Err(PlatterError::invalid_sector_size(sector_size));
        }
        if data.len() % sector_size != 0 {
            return Err(PlatterError::invalid_image_length(data.len(), sector_size));
        }
        Ok(Self { data, sector_size })
    }

    /// Raw image bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn byte_range(&self, lba: u64, count: u64) -> Result<std::ops::Range<usize>> {
        check_range(lba, count, self.sector_count())?;
        // In range, so both fit in usize.
        let start = lba as usize * self.sector_size;
        let end = start + count as usize * self.sector_size;
        Ok(start..end)
    }
}

impl SectorSource for MemoryImage {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        (self.data.len() / self.sector_size) as u64
    }

    fn read_sector(&self, lba: u64) -> Result<Cow<'_, [u8]>> {
        self.read_sectors(lba, 1)
    }

    fn read_sectors(&self, lba: u64, count: u64) -> Result<Cow<'_, [u8]>> {
        let range = self.byte_range(lba, count)?;
        Ok(Cow::Borrowed(&self.data[range]))
    }
}

/// CRC-32 of a single sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectorCrc {
    /// Logical block address.
    pub lba: u64,
    /// Finalized CRC-32 of the sector contents.
    pub crc: u32,
}

/// CRC-32 over sectors `lba..lba + count`, read in bounded runs.
///
/// # Errors
///
/// Fails if the range runs past the end of the source or a read fails.
pub fn checksum_sectors<S: SectorSource + ?Sized>(
    source: &S,
    dispatcher: &Crc32Dispatcher,
    lba: u64,
    count: u64,
) -> Result<u32> {
    check_range(lba, count, source.sector_count())?;
    let _span = tracing::debug_span!("checksum_sectors", lba, count).entered();

    let run = (RUN_BYTES / source.sector_size().max(1)).max(1) as u64;
    let mut crc = Crc32::with_dispatcher(*dispatcher);
    let end = lba + count;
    let mut next = lba;

    while next < end {
        let n = run.min(end - next);
        crc.update(&source.read_sectors(next, n)?);
        next += n;
    }

    Ok(crc.finalize())
}

/// CRC-32 of a single sector.
///
/// # Errors
///
/// Fails if `lba` is out of range or the read fails.
pub fn sector_crc<S: SectorSource + ?Sized>(
    source: &S,
    dispatcher: &Crc32Dispatcher,
    lba: u64,
) -> Result<SectorCrc> {
    let data = source.read_sector(lba)?;
    let mut crc = Crc32::with_dispatcher(*dispatcher);
    crc.update(&data);
    Ok(SectorCrc {
        lba,
        crc: crc.finalize(),
    })
}

/// One CRC-32 per sector in `lba..lba + count`, in LBA order.
///
/// # Errors
///
/// Fails if the range runs past the end of the source or any read fails.
pub fn sector_crcs<S: SectorSource + ?Sized>(
    source: &S,
    dispatcher: &Crc32Dispatcher,
    lba: u64,
    count: u64,
) -> Result<Vec<SectorCrc>> {
    check_range(lba, count, source.sector_count())?;
    let _span = tracing::debug_span!("sector_crcs", lba, count).entered();

    (lba..lba + count)
        .into_par_iter()
        .map(|sector| sector_crc(source, dispatcher, sector))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(sectors: usize, sector_size: usize) -> MemoryImage {
        let data = (0..sectors * sector_size)
            .map(|i| (i * 7 % 256) as u8)
            .collect();
        MemoryImage::new(data, sector_size).expect("aligned image")
    }

    #[test]
    fn test_memory_image_rejects_bad_geometry() {
        assert!(matches!(
            MemoryImage::new(vec![0; 512], 0),
            Err(PlatterError::InvalidSectorSize { size: 0 })
        ));
        assert!(matches!(
            MemoryImage::new(vec![0; 700], 512),
            Err(PlatterError::InvalidImageLength {
                len: 700,
                sector_size: 512,
            })
        ));
    }

    #[test]
    fn test_read_sector_bounds() {
        let img = image(4, 512);
        assert_eq!(img.sector_count(), 4);
        assert_eq!(img.read_sector(3).expect("last sector").len(), 512);
        assert!(matches!(
            img.read_sector(4),
            Err(PlatterError::SectorOutOfRange {
                lba: 4,
                count: 1,
                sector_count: 4,
            })
        ));
        assert!(img.read_sectors(2, 3).is_err());
        assert!(img.read_sectors(u64::MAX, 2).is_err());
        let empty = img.read_sectors(4, 0).expect("empty read at end");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_read_sectors_borrowed() {
        let img = image(4, 512);
        let data = img.read_sectors(1, 2).expect("in range");
        assert!(matches!(data, Cow::Borrowed(_)));
        assert_eq!(&data[..], &img.as_bytes()[512..1536]);
    }

    #[test]
    fn test_checksum_sectors_matches_concatenation() {
        let img = image(16, 2048);
        let dispatcher = Crc32Dispatcher::new();
        let crc = checksum_sectors(&img, &dispatcher, 3, 9).expect("in range");
        assert_eq!(crc, Crc32::compute(&img.as_bytes()[3 * 2048..12 * 2048]));

        let whole = checksum_sectors(&img, &dispatcher, 0, 16).expect("in range");
        assert_eq!(whole, Crc32::compute(img.as_bytes()));

        assert_eq!(checksum_sectors(&img, &dispatcher, 5, 0).expect("empty"), 0);
    }

    #[test]
    fn test_sector_crcs_in_order() {
        let img = image(33, 512);
        let dispatcher = Crc32Dispatcher::software_only();
        let crcs = sector_crcs(&img, &dispatcher, 1, 32).expect("in range");

        assert_eq!(crcs.len(), 32);
        for (i, entry) in crcs.iter().enumerate() {
            let lba = i as u64 + 1;
            assert_eq!(entry.lba, lba);
            let start = lba as usize * 512;
            let expected = Crc32::compute(&img.as_bytes()[start..start + 512]);
            assert_eq!(entry.crc, expected);
        }
    }

    #[test]
    fn test_sector_crcs_out_of_range() {
        let img = image(2, 512);
        let dispatcher = Crc32Dispatcher::new();
        assert!(sector_crcs(&img, &dispatcher, 1, 2).is_err());
    }

    /// Source that only implements single-sector reads.
    struct Striped;

    impl SectorSource for Striped {
        fn sector_size(&self) -> usize {
            128
        }

        fn sector_count(&self) -> u64 {
            10
        }

        fn read_sector(&self, lba: u64) -> Result<Cow<'_, [u8]>> {
            check_range(lba, 1, self.sector_count())?;
            Ok(Cow::Owned(vec![lba as u8; 128]))
        }
    }

    #[test]
    fn test_default_read_sectors() {
        let data = Striped.read_sectors(2, 3).expect("in range");
        assert_eq!(data.len(), 384);
        assert!(data[..128].iter().all(|&b| b == 2));
        assert!(data[256..].iter().all(|&b| b == 4));
        assert!(Striped.read_sectors(8, 3).is_err());
    }
}

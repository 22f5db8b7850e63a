//! Sectors command implementation.

use crate::utils::{format_crc, load_config};
use platter_core::sector::{SectorSource, sector_crcs};
use platter_core::{BackendPreference, ImageFile, SectorCrc};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SectorReport<'a> {
    image: String,
    sector_size: usize,
    sector_count: u64,
    image_crc32: String,
    sectors: &'a [SectorCrc],
}

pub fn cmd_sectors(
    image: &Path,
    sector_size: Option<usize>,
    start: u64,
    count: Option<u64>,
    backend: Option<BackendPreference>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(backend, None, sector_size)?;
    let dispatcher = config.dispatcher();
    let file = ImageFile::open(image, config.sector_size)?;

    let total = file.sector_count();
    let count = count.unwrap_or_else(|| total.saturating_sub(start));
    let crcs = sector_crcs(&file, &dispatcher, start, count)?;

    if file.has_partial_sector() {
        tracing::warn!(
            len = file.len(),
            sector_size = config.sector_size,
            "image is not a whole number of sectors; last sector is zero-padded"
        );
    }

    if json {
        let report = SectorReport {
            image: image.display().to_string(),
            sector_size: config.sector_size,
            sector_count: total,
            image_crc32: format_crc(file.checksum(&dispatcher)),
            sectors: &crcs,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}: {} sectors of {} bytes, crc32 {}",
        image.display(),
        total,
        config.sector_size,
        format_crc(file.checksum(&dispatcher))
    );
    println!("{:>10}  CRC-32", "LBA");
    println!("{}", "-".repeat(20));
    for entry in &crcs {
        println!("{:>10}  {}", entry.lba, format_crc(entry.crc));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn image(len: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0xE5; len]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_sectors_whole_image() {
        let file = image(4 * 512);
        assert!(cmd_sectors(file.path(), Some(512), 0, None, None, false).is_ok());
        assert!(cmd_sectors(file.path(), Some(512), 1, Some(2), None, true).is_ok());
    }

    #[test]
    fn test_sectors_start_past_end() {
        let file = image(4 * 512);
        // Starting exactly at the end lists nothing.
        assert!(cmd_sectors(file.path(), Some(512), 4, None, None, false).is_ok());
        assert!(cmd_sectors(file.path(), Some(512), 9, None, None, false).is_err());
        assert!(cmd_sectors(file.path(), Some(512), 3, Some(2), None, false).is_err());
    }

    #[test]
    fn test_sectors_zero_sector_size() {
        let file = image(512);
        assert!(cmd_sectors(file.path(), Some(0), 0, None, None, false).is_err());
    }
}

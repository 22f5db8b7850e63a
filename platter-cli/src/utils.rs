//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use platter_core::{BackendPreference, ChecksumConfig, PlatterError, Result};

/// Create a byte-count progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb
}

/// Parse a CRC-32 written in hex, with or without a `0x` prefix.
pub fn parse_crc(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PlatterError::invalid_checksum(input));
    }
    u32::from_str_radix(digits, 16).map_err(|_| PlatterError::invalid_checksum(input))
}

/// Environment settings overlaid with command-line flags, validated.
pub fn load_config(
    backend: Option<BackendPreference>,
    chunk_size: Option<usize>,
    sector_size: Option<usize>,
) -> Result<ChecksumConfig> {
    let mut config = ChecksumConfig::from_env();
    if let Some(backend) = backend {
        config.backend = backend;
    }
    if let Some(chunk_size) = chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(sector_size) = sector_size {
        config.sector_size = sector_size;
    }
    config.validate()?;
    tracing::debug!(?config, "checksum configuration");
    Ok(config)
}

/// Format a CRC-32 the way checksum listings print it.
pub fn format_crc(crc: u32) -> String {
    format!("{:08x}", crc)
}

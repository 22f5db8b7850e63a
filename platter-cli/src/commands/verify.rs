//! Verify command implementation.

use super::checksum::checksum_file;
use crate::utils::{format_crc, load_config, parse_crc};
use indicatif::ProgressBar;
use platter_core::{BackendPreference, PlatterError};
use std::path::Path;

pub fn cmd_verify(
    file: &Path,
    expected: &str,
    backend: Option<BackendPreference>,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = parse_crc(expected)?;
    let config = load_config(backend, None, None)?;
    let dispatcher = config.dispatcher();

    let (computed, bytes) =
        checksum_file(file, &dispatcher, config.chunk_size, &ProgressBar::hidden())?;
    tracing::debug!(bytes, backend = %dispatcher.backend(), "verified {}", file.display());

    if computed != expected {
        return Err(PlatterError::crc_mismatch(expected, computed).into());
    }

    println!("{}: OK ({})", file.display(), format_crc(computed));
    Ok(())
}

//! Checksum configuration (backend choice, read sizes) and env overrides.
//!
//! Environment variables, all optional:
//!
//! - `PLATTER_CRC32_FORCE`: `auto`, `hardware`, `soft-fold`, or `table`
//! - `PLATTER_CHUNK_SIZE`: streaming read size in bytes
//! - `PLATTER_SECTOR_SIZE`: sector size in bytes
//!
//! Unparseable values are ignored with a warning.

use crate::dispatch::{BackendPreference, Crc32Dispatcher};
use crate::error::{PlatterError, Result};
use serde::Deserialize;

/// Default streaming read size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default sector size.
pub const DEFAULT_SECTOR_SIZE: usize = 512;

/// Environment variable forcing the CRC-32 backend.
pub const ENV_FORCE: &str = "PLATTER_CRC32_FORCE";

/// Environment variable overriding the streaming read size.
pub const ENV_CHUNK_SIZE: &str = "PLATTER_CHUNK_SIZE";

/// Environment variable overriding the sector size.
pub const ENV_SECTOR_SIZE: &str = "PLATTER_SECTOR_SIZE";

/// Settings for checksumming files and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChecksumConfig {
    /// Requested CRC-32 backend.
    pub backend: BackendPreference,
    /// Bytes read per streaming step. Must be a non-zero multiple of 64.
    pub chunk_size: usize,
    /// Sector size for sector-addressed sources.
    pub sector_size: usize,
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sector_size: DEFAULT_SECTOR_SIZE,
        }
    }
}

impl ChecksumConfig {
    /// Defaults overlaid with any `PLATTER_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(backend) = env_backend_preference() {
            config.backend = backend;
        }
        if let Some(chunk_size) = env_usize(ENV_CHUNK_SIZE) {
            config.chunk_size = chunk_size;
        }
        if let Some(sector_size) = env_usize(ENV_SECTOR_SIZE) {
            config.sector_size = sector_size;
        }
        config
    }

    /// Check the sizes.
    ///
    /// # Errors
    ///
    /// Returns [`PlatterError::InvalidConfig`] for a zero or non-64-multiple
    /// chunk size, and [`PlatterError::InvalidSectorSize`] for a zero sector
    /// size.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size % 64 != 0 {
            return Err(PlatterError::invalid_config(format!(
                "chunk size {} must be a non-zero multiple of 64",
                self.chunk_size
            )));
        }
        if self.sector_size == 0 {
            return Err(PlatterError::invalid_sector_size(self.sector_size));
        }
        Ok(())
    }

    /// Dispatcher for the configured backend.
    pub fn dispatcher(&self) -> Crc32Dispatcher {
        Crc32Dispatcher::with_preference(self.backend)
    }
}

/// Backend preference from `PLATTER_CRC32_FORCE`, if set and valid.
pub fn env_backend_preference() -> Option<BackendPreference> {
    let value = env_value(ENV_FORCE)?;
    match value.parse() {
        Ok(preference) => Some(preference),
        Err(err) => {
            tracing::warn!(variable = ENV_FORCE, %value, "ignoring override: {err}");
            None
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_owned())
}

fn env_usize(name: &str) -> Option<usize> {
    let value = env_value(name)?;
    match value.parse::<usize>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(variable = name, %value, "ignoring override: {err}");
            None
        }
    }
}

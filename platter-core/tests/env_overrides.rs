//! `PLATTER_*` environment overrides.
//!
//! The process environment is shared by every test in a binary, so this file
//! holds a single test and nothing else reads these variables here.

use platter_core::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_SECTOR_SIZE, ENV_CHUNK_SIZE, ENV_FORCE, ENV_SECTOR_SIZE,
    env_backend_preference,
};
use platter_core::{BackendPreference, ChecksumConfig};

fn set(name: &str, value: &str) {
    // SAFETY: the only test in this binary, so no other thread touches the
    // environment concurrently.
    unsafe { std::env::set_var(name, value) }
}

fn clear(name: &str) {
    // SAFETY: as in `set`.
    unsafe { std::env::remove_var(name) }
}

#[test]
fn test_env_overrides() {
    // Nothing set: defaults.
    for name in [ENV_FORCE, ENV_CHUNK_SIZE, ENV_SECTOR_SIZE] {
        clear(name);
    }
    assert_eq!(env_backend_preference(), None);
    assert_eq!(ChecksumConfig::from_env(), ChecksumConfig::default());

    // Valid values, padded ones trimmed.
    set(ENV_FORCE, " table ");
    set(ENV_CHUNK_SIZE, "4096");
    set(ENV_SECTOR_SIZE, " 2048 ");
    assert_eq!(env_backend_preference(), Some(BackendPreference::Table));
    let config = ChecksumConfig::from_env();
    assert_eq!(config.backend, BackendPreference::Table);
    assert_eq!(config.chunk_size, 4096);
    assert_eq!(config.sector_size, 2048);
    assert_eq!(config.dispatcher().backend(), platter_core::Backend::Table);

    // Aliases go through the same parser as the command line.
    set(ENV_FORCE, "SOFT");
    assert_eq!(env_backend_preference(), Some(BackendPreference::SoftFold));

    // Garbage is ignored and the default kept.
    set(ENV_FORCE, "gpu");
    set(ENV_CHUNK_SIZE, "bogus");
    set(ENV_SECTOR_SIZE, "-512");
    assert_eq!(env_backend_preference(), None);
    let config = ChecksumConfig::from_env();
    assert_eq!(config.backend, BackendPreference::Auto);
    assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(config.sector_size, DEFAULT_SECTOR_SIZE);

    // Blank counts as unset.
    set(ENV_FORCE, "   ");
    assert_eq!(env_backend_preference(), None);

    // Parsed but invalid sizes are left for `validate` to reject.
    set(ENV_CHUNK_SIZE, "100");
    let config = ChecksumConfig::from_env();
    assert_eq!(config.chunk_size, 100);
    assert!(config.validate().is_err());

    for name in [ENV_FORCE, ENV_CHUNK_SIZE, ENV_SECTOR_SIZE] {
        clear(name);
    }
}

//! Runtime backend selection for CRC-32.
//!
//! Backends, fastest first:
//!
//! - [`Backend::Pclmulqdq`]: folding with PCLMULQDQ (x86_64)
//! - [`Backend::Pmull`]: folding with PMULL (aarch64)
//! - [`Backend::SoftFold`]: folding with the portable carry-less multiply
//! - [`Backend::Table`]: slicing-by-8 tables
//!
//! Folding backends only see whole 64-byte blocks. [`Crc32Dispatcher::update`]
//! folds the longest block-aligned prefix, turns the finalized result back into
//! a register, and finishes the remaining bytes with slicing-by-8. Every
//! backend therefore produces the same CRC for every input length.
//!
//! A forced preference is always clamped to what the CPU can run.

use crate::crc::crc32_slice8;
use crate::crc_fold::{self, BLOCK_SIZE};
use crate::error::{PlatterError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A folding kernel: whole 64-byte blocks in, finalized CRC out.
pub type FoldKernel = fn(&[u8], u32) -> u32;

/// Concrete CRC-32 implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// PCLMULQDQ folding (x86_64).
    Pclmulqdq,
    /// PMULL folding (aarch64).
    Pmull,
    /// Portable carry-less multiply folding.
    SoftFold,
    /// Slicing-by-8 lookup tables.
    Table,
}

impl Backend {
    /// All backends, fastest first.
    pub const ALL: [Backend; 4] = [
        Backend::Pclmulqdq,
        Backend::Pmull,
        Backend::SoftFold,
        Backend::Table,
    ];

    /// Short name used in logs, reports, and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Backend::Pclmulqdq => "pclmulqdq",
            Backend::Pmull => "pmull",
            Backend::SoftFold => "soft-fold",
            Backend::Table => "table",
        }
    }

    /// Whether this backend folds 64-byte blocks.
    pub const fn folds(self) -> bool {
        !matches!(self, Backend::Table)
    }

    /// Whether this backend uses a hardware carry-less multiplier.
    pub const fn is_hardware(self) -> bool {
        matches!(self, Backend::Pclmulqdq | Backend::Pmull)
    }

    /// Check whether the running CPU can execute this backend.
    pub fn is_supported(self) -> bool {
        match self {
            Backend::Pclmulqdq => pclmulqdq_supported(),
            Backend::Pmull => pmull_supported(),
            Backend::SoftFold | Backend::Table => true,
        }
    }

    /// Folding kernel for this backend, if it folds and the CPU supports it.
    fn kernel(self) -> Option<FoldKernel> {
        match self {
            #[cfg(target_arch = "x86_64")]
            Backend::Pclmulqdq if pclmulqdq_supported() => Some(fold_pclmulqdq as FoldKernel),
            #[cfg(target_arch = "aarch64")]
            Backend::Pmull if pmull_supported() => Some(fold_pmull as FoldKernel),
            Backend::SoftFold => Some(crc_fold::fold_blocks_soft as FoldKernel),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = PlatterError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlatterError::invalid_config(format!("unknown CRC backend '{s}'")))
    }
}

/// Requested backend, before clamping to CPU capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendPreference {
    /// Hardware folding when available, tables otherwise.
    #[default]
    Auto,
    /// Hardware folding; tables if the CPU has no carry-less multiplier.
    Hardware,
    /// Portable folding.
    SoftFold,
    /// Slicing-by-8 tables.
    Table,
}

impl BackendPreference {
    /// Name as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Hardware => "hardware",
            BackendPreference::SoftFold => "soft-fold",
            BackendPreference::Table => "table",
        }
    }

    /// Clamp the preference to what this CPU can run.
    pub fn resolve(self) -> Backend {
        match self {
            BackendPreference::Auto | BackendPreference::Hardware => {
                hardware_backend().unwrap_or(Backend::Table)
            }
            BackendPreference::SoftFold => Backend::SoftFold,
            BackendPreference::Table => Backend::Table,
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendPreference {
    type Err = PlatterError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("auto") {
            return Ok(BackendPreference::Auto);
        }
        if value.eq_ignore_ascii_case("hardware")
            || value.eq_ignore_ascii_case("hw")
            || value.eq_ignore_ascii_case("clmul")
            || value.eq_ignore_ascii_case("pclmulqdq")
            || value.eq_ignore_ascii_case("pmull")
        {
            return Ok(BackendPreference::Hardware);
        }
        if value.eq_ignore_ascii_case("soft-fold")
            || value.eq_ignore_ascii_case("soft")
            || value.eq_ignore_ascii_case("portable")
        {
            return Ok(BackendPreference::SoftFold);
        }
        if value.eq_ignore_ascii_case("table")
            || value.eq_ignore_ascii_case("slice8")
            || value.eq_ignore_ascii_case("scalar")
        {
            return Ok(BackendPreference::Table);
        }
        Err(PlatterError::invalid_config(format!(
            "unknown backend preference '{value}' (expected auto, hardware, soft-fold, or table)"
        )))
    }
}

#[cfg(target_arch = "x86_64")]
fn pclmulqdq_supported() -> bool {
    #[cfg(target_feature = "pclmulqdq")]
    {
        true
    }
    #[cfg(not(target_feature = "pclmulqdq"))]
    {
        std::arch::is_x86_feature_detected!("pclmulqdq")
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn pclmulqdq_supported() -> bool {
    false
}

#[cfg(target_arch = "aarch64")]
fn pmull_supported() -> bool {
    #[cfg(target_feature = "aes")]
    {
        true
    }
    #[cfg(not(target_feature = "aes"))]
    {
        std::arch::is_aarch64_feature_detected!("aes")
    }
}

#[cfg(not(target_arch = "aarch64"))]
fn pmull_supported() -> bool {
    false
}

#[cfg(target_arch = "x86_64")]
fn fold_pclmulqdq(data: &[u8], initial: u32) -> u32 {
    // SAFETY: only handed out by `Backend::kernel` after pclmulqdq detection.
    unsafe { crc_fold::fold_blocks_pclmulqdq(data, initial) }
}

#[cfg(target_arch = "aarch64")]
fn fold_pmull(data: &[u8], initial: u32) -> u32 {
    // SAFETY: only handed out by `Backend::kernel` after aes detection.
    unsafe { crc_fold::fold_blocks_pmull(data, initial) }
}

/// Hardware folding backend of this CPU, if any.
pub fn hardware_backend() -> Option<Backend> {
    [Backend::Pclmulqdq, Backend::Pmull]
        .into_iter()
        .find(|backend| backend.is_supported())
}

/// Backends usable on this CPU, fastest first.
pub fn available_backends() -> Vec<Backend> {
    Backend::ALL
        .into_iter()
        .filter(|backend| backend.is_supported())
        .collect()
}

/// Fastest folding kernel on this CPU (portable if no hardware).
pub fn best_fold_kernel() -> FoldKernel {
    hardware_backend()
        .and_then(Backend::kernel)
        .unwrap_or(crc_fold::fold_blocks_soft as FoldKernel)
}

/// CRC-32 dispatcher bound to one backend.
#[derive(Clone, Copy)]
pub struct Crc32Dispatcher {
    backend: Backend,
    kernel: Option<FoldKernel>,
}

impl Crc32Dispatcher {
    /// Create a dispatcher on the best backend for this CPU.
    pub fn new() -> Self {
        Self::with_preference(BackendPreference::Auto)
    }

    /// Create a dispatcher from a preference, clamped to CPU capabilities.
    pub fn with_preference(preference: BackendPreference) -> Self {
        let backend = preference.resolve();
        Self {
            backend,
            kernel: backend.kernel(),
        }
    }

    /// Create a dispatcher on an exact backend.
    ///
    /// # Errors
    ///
    /// Returns [`PlatterError::UnsupportedBackend`] if the CPU cannot run it.
    pub fn with_backend(backend: Backend) -> Result<Self> {
        if !backend.is_supported() {
            return Err(PlatterError::unsupported_backend(backend.name()));
        }
        Ok(Self {
            backend,
            kernel: backend.kernel(),
        })
    }

    /// Create a dispatcher that never folds (slicing-by-8 only).
    pub fn software_only() -> Self {
        Self {
            backend: Backend::Table,
            kernel: None,
        }
    }

    /// The selected backend.
    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Check if hardware carry-less multiplication is in use.
    #[inline]
    pub fn is_simd_available(&self) -> bool {
        self.backend.is_hardware()
    }

    /// Advance a CRC register over `data`.
    ///
    /// `register` is the raw (non-finalized) state, `0xFFFFFFFF` for a fresh
    /// computation. Returns the updated register.
    #[inline]
    pub fn update(&self, register: u32, data: &[u8]) -> u32 {
        let mut crc = register;
        let mut rest = data;

        if let Some(kernel) = self.kernel {
            let folded_len = data.len() / BLOCK_SIZE * BLOCK_SIZE;
            if folded_len > 0 {
                let (blocks, tail) = data.split_at(folded_len);
                crc = !kernel(blocks, !crc);
                rest = tail;
            }
        }

        crc32_slice8(crc, rest)
    }
}

impl Default for Crc32Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crc32Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crc32Dispatcher")
            .field("backend", &self.backend)
            .finish()
    }
}

static GLOBAL: OnceLock<Crc32Dispatcher> = OnceLock::new();

/// Process-wide dispatcher.
///
/// Built on first use from `PLATTER_CRC32_FORCE` (if set and valid) or
/// [`BackendPreference::Auto`].
pub fn global() -> &'static Crc32Dispatcher {
    GLOBAL.get_or_init(|| {
        let preference = crate::config::env_backend_preference().unwrap_or_default();
        let dispatcher = Crc32Dispatcher::with_preference(preference);
        tracing::debug!(
            preference = %preference,
            backend = %dispatcher.backend(),
            "selected CRC-32 backend"
        );
        dispatcher
    })
}

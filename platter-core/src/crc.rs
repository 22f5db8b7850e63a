//! Table-driven CRC-32 and the streaming [`Crc32`] hasher.
//!
//! This is the classic CRC-32/ISO-HDLC used by ZIP, GZIP, PNG and most disk
//! image containers:
//!
//! - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
//! - Initial value: 0xFFFFFFFF
//! - Final XOR: 0xFFFFFFFF
//! - Reflected input and output
//!
//! The table routines here serve three roles: the reference that the folding
//! engine is checked against, the finisher for the bytes after the last whole
//! 64-byte block, and the fallback on CPUs without a carry-less multiplier.
//!
//! The raw functions ([`crc32_bytewise`], [`crc32_slice8`]) operate on the
//! *register* (not finalized). [`Crc32`] hides that detail.

use crate::dispatch::{self, Crc32Dispatcher};
use std::io;

/// Reflected CRC-32/ISO-HDLC polynomial.
pub const CRC32_POLY: u32 = 0xEDB88320;

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected).
pub(crate) const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-32 slicing-by-8 lookup tables.
/// Table `t` advances a byte through `t` further zero bytes.
const CRC32_TABLE_SLICE: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];
    tables[0] = CRC32_TABLE;

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = CRC32_TABLE[(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

/// Advance the CRC register one byte at a time.
#[inline]
pub fn crc32_bytewise(register: u32, data: &[u8]) -> u32 {
    data.iter().fold(register, |crc, &byte| {
        CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
    })
}

/// Advance the CRC register eight bytes at a time (slicing-by-8).
#[inline]
pub fn crc32_slice8(register: u32, data: &[u8]) -> u32 {
    let mut crc = register;
    let mut words = data.chunks_exact(8);

    for bytes in &mut words {
        let crc_xor = crc ^ u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        crc = CRC32_TABLE_SLICE[7][(crc_xor & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[6][((crc_xor >> 8) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[5][((crc_xor >> 16) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[4][(crc_xor >> 24) as usize]
            ^ CRC32_TABLE_SLICE[3][bytes[4] as usize]
            ^ CRC32_TABLE_SLICE[2][bytes[5] as usize]
            ^ CRC32_TABLE_SLICE[1][bytes[6] as usize]
            ^ CRC32_TABLE_SLICE[0][bytes[7] as usize];
    }

    crc32_bytewise(crc, words.remainder())
}

/// Streaming CRC-32 calculator.
///
/// Updates go through a [`Crc32Dispatcher`]: whole 64-byte blocks are folded
/// with carry-less multiplication when the CPU allows it, the rest is
/// finished with slicing-by-8. Results are identical on every backend.
///
/// # Example
///
/// ```
/// use platter_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"1234");
/// crc.update(b"56789");
/// assert_eq!(crc.finalize(), 0xCBF43926);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    register: u32,
    dispatcher: Crc32Dispatcher,
}

impl Crc32 {
    /// Create a new CRC-32 calculator on the process-wide dispatcher.
    pub fn new() -> Self {
        Self::with_dispatcher(*dispatch::global())
    }

    /// Create a calculator pinned to a specific dispatcher.
    pub fn with_dispatcher(dispatcher: Crc32Dispatcher) -> Self {
        Self {
            register: 0xFFFFFFFF,
            dispatcher,
        }
    }

    /// Resume from a previously finalized CRC.
    pub fn with_initial(finalized: u32) -> Self {
        Self::with_dispatcher_and_initial(*dispatch::global(), finalized)
    }

    /// Resume from a previously finalized CRC on a specific dispatcher.
    pub fn with_dispatcher_and_initial(dispatcher: Crc32Dispatcher, finalized: u32) -> Self {
        Self {
            register: !finalized,
            dispatcher,
        }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.register = 0xFFFFFFFF;
    }

    /// The dispatcher this calculator runs on.
    pub fn dispatcher(&self) -> &Crc32Dispatcher {
        &self.dispatcher
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.register = self.dispatcher.update(self.register, data);
    }

    /// Get the current CRC value (without consuming the calculator).
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.register
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        !self.register
    }

    /// Compute CRC-32 for a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for Crc32 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

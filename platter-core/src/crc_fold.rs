//! Folded CRC-32 over 64-byte blocks.
//!
//! Four 128-bit lanes accumulate the input 64 bytes at a time: lane *i* takes
//! the 16-byte chunk at offset `16 * i` of every block. Each iteration
//! multiplies every lane by `x^512 mod P` (two carry-less half-products per
//! lane) and xors in the next chunk. After the last block the lanes are
//! cascaded into one, reduced from 128 to 96 bits with the `k5` pair, and
//! Barrett-reduced to the 32-bit remainder with the `k7` pair.
//!
//! The constants below belong to CRC-32/ISO-HDLC (reflected 0xEDB88320) and
//! are reproduced exactly as fixed data.
//!
//! ## Seed convention
//!
//! `initial` is the *finalized* CRC of whatever came before (0 for a fresh
//! computation), and the result is finalized as well. Lane 0 starts at
//! `0x9db42487`, which is the all-ones preset register moved back by one
//! block, so the seed enters as `initial ^ 0xFFFFFFFF` on the first four
//! bytes just like the bit-serial algorithm.
//!
//! Only whole blocks are folded. Trailing bytes are left to the table-driven
//! finisher in [`crate::dispatch`].

use crate::clmul::{CarrylessMultiply, SoftClmul};

/// Bytes consumed per folding iteration.
pub const BLOCK_SIZE: usize = 64;

/// Bytes per lane.
const LANE_SIZE: usize = 16;

/// Lane 0 preset: CRC remainder of the empty input, expressed in lane form.
const LANE0_PRESET: u32 = 0x9db42487;

/// Fold-by-4-blocks constant pair (x^512 folding), as four LE words.
const FOLD4: [u32; 4] = [0xc6e41596, 0x00000001, 0x54442bd4, 0x00000001];

/// Reduction constant table: k1|k2, k5|k6, k7|k8.
const CRC_K: [u32; 12] = [
    0xccaa009e, 0x00000000, 0x751997d0, 0x00000001, // k1, k2
    0xccaa009e, 0x00000000, 0x63cd6124, 0x00000001, // k5, k6
    0xf7011640, 0x00000001, 0xdb710640, 0x00000001, // k7, k8
];

/// Keeps the low 64 bits.
const MASK_LOW64: [u32; 4] = [0xFFFFFFFF, 0xFFFFFFFF, 0x00000000, 0x00000000];

/// Clears word 0, keeping the 96-bit window above it.
const MASK_HIGH96: [u32; 4] = [0x00000000, 0xFFFFFFFF, 0xFFFFFFFF, 0xFFFFFFFF];

/// Pack four little-endian 32-bit words into a lane (word 0 = bits 0..32).
const fn lane(words: [u32; 4]) -> u128 {
    (words[0] as u128)
        | ((words[1] as u128) << 32)
        | ((words[2] as u128) << 64)
        | ((words[3] as u128) << 96)
}

/// Constant pair `index` from [`CRC_K`].
const fn crc_k(index: usize) -> u128 {
    let base = index * 4;
    lane([CRC_K[base], CRC_K[base + 1], CRC_K[base + 2], CRC_K[base + 3]])
}

const K_FOLD4: u128 = lane(FOLD4);
const K1: u128 = crc_k(0);
const K5: u128 = crc_k(1);
const K7: u128 = crc_k(2);

/// Load one 64-byte block as four lanes.
#[inline(always)]
fn load_block(block: &[u8]) -> [u128; 4] {
    let mut chunks = [0u128; 4];
    for (chunk, bytes) in chunks.iter_mut().zip(block.chunks_exact(LANE_SIZE)) {
        let mut raw = [0u8; LANE_SIZE];
        raw.copy_from_slice(bytes);
        *chunk = u128::from_le_bytes(raw);
    }
    chunks
}

/// Multiply a lane by x^512 mod P.
#[inline(always)]
fn fold_lane<C: CarrylessMultiply>(value: u128) -> u128 {
    C::clmul::<0x01>(value, K_FOLD4) ^ C::clmul::<0x10>(value, K_FOLD4)
}

/// Fold lane `from` forward by 128 bits into lane `into`.
#[inline(always)]
fn cascade<C: CarrylessMultiply>(from: u128, into: u128) -> u128 {
    let low = C::clmul::<0x10>(from, K1);
    let high = C::clmul::<0x01>(from, K1);
    into ^ low ^ high
}

/// Collapse the four lanes to the finalized CRC.
#[inline(always)]
fn reduce<C: CarrylessMultiply>(lanes: [u128; 4]) -> u32 {
    let [lane0, lane1, lane2, lane3] = lanes;

    // 512 -> 128
    let lane1 = cascade::<C>(lane0, lane1);
    let lane2 = cascade::<C>(lane1, lane2);
    let folded = cascade::<C>(lane2, lane3);

    // 128 -> 96
    let x = C::clmul::<0x00>(folded, K5) ^ (folded >> 64);
    let y = (C::clmul::<0x10>(x << 32, K5) ^ x) & lane(MASK_HIGH96);

    // 96 -> 32
    let z = (C::clmul::<0x00>(y, K7) ^ y) & lane(MASK_LOW64);
    let r = C::clmul::<0x10>(z, K7) ^ z ^ y;

    !((r >> 64) as u32)
}

/// Fold every whole 64-byte block of `data` and return the finalized CRC.
///
/// Trailing bytes past the last whole block are ignored. With no whole block
/// the preset state is reduced directly, which yields 0.
#[inline(always)]
pub fn fold_blocks<C: CarrylessMultiply>(data: &[u8], initial: u32) -> u32 {
    let mut lanes = [LANE0_PRESET as u128, 0, 0, 0];
    let mut seed = initial as u128;

    for block in data.chunks_exact(BLOCK_SIZE) {
        let mut chunks = load_block(block);
        chunks[0] ^= core::mem::take(&mut seed);

        for (acc, chunk) in lanes.iter_mut().zip(chunks) {
            *acc = fold_lane::<C>(*acc) ^ chunk;
        }
    }

    reduce::<C>(lanes)
}

/// Portable folding kernel.
pub fn fold_blocks_soft(data: &[u8], initial: u32) -> u32 {
    fold_blocks::<SoftClmul>(data, initial)
}

/// PCLMULQDQ folding kernel.
///
/// # Safety
///
/// The CPU must support `pclmulqdq`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "pclmulqdq")]
pub unsafe fn fold_blocks_pclmulqdq(data: &[u8], initial: u32) -> u32 {
    fold_blocks::<crate::clmul::Pclmulqdq>(data, initial)
}

/// PMULL folding kernel.
///
/// # Safety
///
/// The CPU must support `neon` and `aes`.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon", enable = "aes")]
pub unsafe fn fold_blocks_pmull(data: &[u8], initial: u32) -> u32 {
    fold_blocks::<crate::clmul::Pmull>(data, initial)
}

/// Fold the first `length` bytes of `buffer` in whole 64-byte blocks.
///
/// `length` is clamped to `0..=buffer.len()`; a negative length or a short
/// buffer only folds what exists. `length % 64` trailing bytes are not
/// processed, see [`crate::crc::Crc32`] for arbitrary lengths. The fastest
/// folding kernel on this CPU is used, falling back to the portable one.
///
/// # Example
///
/// ```
/// use platter_core::compute_crc32_folded;
///
/// let zeros = [0u8; 64];
/// assert_eq!(compute_crc32_folded(&zeros, 64, 0), 0x758D6336);
/// ```
pub fn compute_crc32_folded(buffer: &[u8], length: i64, initial_crc: u32) -> u32 {
    let length = usize::try_from(length).unwrap_or(0).min(buffer.len());
    let kernel = crate::dispatch::best_fold_kernel();
    kernel(&buffer[..length], initial_crc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc32_bytewise;

    fn table_crc(initial: u32, data: &[u8]) -> u32 {
        !crc32_bytewise(!initial, data)
    }

    #[test]
    fn test_constant_layout() {
        assert_eq!(K_FOLD4, (0x1_54442bd4u128 << 64) | 0x1_c6e41596);
        assert_eq!(K1, (0x1_751997d0u128 << 64) | 0xccaa009e);
        assert_eq!(K5, (0x1_63cd6124u128 << 64) | 0xccaa009e);
        assert_eq!(K7, (0x1_db710640u128 << 64) | 0x1_f7011640);
        assert_eq!(lane(MASK_LOW64), u64::MAX as u128);
        assert_eq!(lane(MASK_HIGH96), u128::MAX << 32);
    }

    #[test]
    fn test_empty_reduces_to_zero() {
        assert_eq!(fold_blocks_soft(&[], 0), 0);
        assert_eq!(fold_blocks_soft(&[0xAB; 63], 0), 0);
    }

    #[test]
    fn test_zero_block_golden() {
        assert_eq!(fold_blocks_soft(&[0u8; 64], 0), 0x758D6336);
    }

    #[test]
    fn test_soft_matches_table() {
        let data: Vec<u8> = (0..640u32).map(|i| (i * 31 + 7) as u8).collect();
        for blocks in 1..=10 {
            let slice = &data[..blocks * BLOCK_SIZE];
            for initial in [0, 0x12345678, 0xFFFFFFFF] {
                assert_eq!(
                    fold_blocks_soft(slice, initial),
                    table_crc(initial, slice),
                    "{} blocks, initial {:#x}",
                    blocks,
                    initial
                );
            }
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let data: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        assert_eq!(fold_blocks_soft(&data, 7), fold_blocks_soft(&data[..192], 7));
    }

    #[test]
    fn test_compute_clamps_length() {
        let data = [0u8; 64];
        assert_eq!(compute_crc32_folded(&data, -5, 0), 0);
        assert_eq!(compute_crc32_folded(&data, 1_000, 0), 0x758D6336);
        assert_eq!(compute_crc32_folded(&data, 100, 0), 0x758D6336);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_pclmulqdq_matches_soft() {
        if !std::arch::is_x86_feature_detected!("pclmulqdq") {
            return;
        }
        let data: Vec<u8> = (0..1024u32).map(|i| (i ^ (i >> 3)) as u8).collect();
        for len in (0..=1024).step_by(64) {
            // SAFETY: pclmulqdq detected above.
            let hw = unsafe { fold_blocks_pclmulqdq(&data[..len], 0xA5A5A5A5) };
            assert_eq!(hw, fold_blocks_soft(&data[..len], 0xA5A5A5A5), "len {len}");
        }
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn test_pmull_matches_soft() {
        if !std::arch::is_aarch64_feature_detected!("aes") {
            return;
        }
        let data: Vec<u8> = (0..1024u32).map(|i| (i ^ (i >> 3)) as u8).collect();
        for len in (0..=1024).step_by(64) {
            // SAFETY: aes detected above; neon is baseline on aarch64.
            let hw = unsafe { fold_blocks_pmull(&data[..len], 0xA5A5A5A5) };
            assert_eq!(hw, fold_blocks_soft(&data[..len], 0xA5A5A5A5), "len {len}");
        }
    }
}

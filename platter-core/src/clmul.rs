//! Carry-less multiplication over GF(2).
//!
//! The folding CRC engine needs exactly one arithmetic primitive: multiply two
//! 64-bit polynomials over GF(2) into a 128-bit product. This module puts that
//! primitive behind [`CarrylessMultiply`] so the engine can be written once and
//! instantiated for:
//!
//! - [`SoftClmul`]: portable shift-and-xor implementation
//! - [`Pclmulqdq`]: PCLMULQDQ on x86_64
//! - [`Pmull`]: PMULL (crypto extensions) on aarch64
//!
//! Operands are 128-bit lanes held in `u128` (bits 0..64 are the low half).
//! The `IMM` selector follows the PCLMULQDQ encoding: bit 0 picks the half of
//! `a`, bit 4 picks the half of `b`.
//!
//! | `IMM`  | product         |
//! |--------|-----------------|
//! | `0x00` | `a.lo * b.lo`   |
//! | `0x01` | `a.hi * b.lo`   |
//! | `0x10` | `a.lo * b.hi`   |
//! | `0x11` | `a.hi * b.hi`   |

/// A 64×64→128 carry-less multiply on 128-bit lanes.
pub trait CarrylessMultiply {
    /// Multiply the halves of `a` and `b` chosen by `IMM`.
    fn clmul<const IMM: i32>(a: u128, b: u128) -> u128;
}

/// Split the operands according to a PCLMULQDQ selector.
#[inline(always)]
const fn select_halves<const IMM: i32>(a: u128, b: u128) -> (u64, u64) {
    let x = if IMM & 0x01 != 0 {
        (a >> 64) as u64
    } else {
        a as u64
    };
    let y = if IMM & 0x10 != 0 {
        (b >> 64) as u64
    } else {
        b as u64
    };
    (x, y)
}

/// Portable carry-less multiply of two 64-bit values.
///
/// Walks `a` four bits at a time against a 16-entry window of multiples of
/// `b`. The product of two degree-63 polynomials has degree at most 126, so
/// it always fits in a `u128`.
#[inline]
pub const fn clmul64(a: u64, b: u64) -> u128 {
    let b = b as u128;
    let mut window = [0u128; 16];
    let mut i = 1;
    while i < 16 {
        window[i] = if i & 1 == 0 {
            window[i >> 1] << 1
        } else {
            window[i - 1] ^ b
        };
        i += 1;
    }

    let mut product = 0u128;
    let mut shift = 64;
    while shift > 0 {
        shift -= 4;
        product = (product << 4) ^ window[((a >> shift) & 0xF) as usize];
    }
    product
}

/// Portable backend. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftClmul;

impl CarrylessMultiply for SoftClmul {
    #[inline(always)]
    fn clmul<const IMM: i32>(a: u128, b: u128) -> u128 {
        let (x, y) = select_halves::<IMM>(a, b);
        clmul64(x, y)
    }
}

/// PCLMULQDQ backend (x86_64).
///
/// Only sound to use once `pclmulqdq` has been detected; the kernels that
/// instantiate it carry `#[target_feature(enable = "pclmulqdq")]`.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Pclmulqdq;

#[cfg(target_arch = "x86_64")]
impl CarrylessMultiply for Pclmulqdq {
    #[inline(always)]
    fn clmul<const IMM: i32>(a: u128, b: u128) -> u128 {
        use core::arch::x86_64::{__m128i, _mm_clmulepi64_si128};

        // SAFETY: u128 and __m128i are both 16 plain bytes; x86_64 is little
        // endian so bits 0..64 land in qword 0. The intrinsic is only reached
        // from kernels compiled with pclmulqdq, after runtime detection.
        unsafe {
            let x: __m128i = core::mem::transmute::<u128, __m128i>(a);
            let y: __m128i = core::mem::transmute::<u128, __m128i>(b);
            core::mem::transmute::<__m128i, u128>(_mm_clmulepi64_si128(x, y, IMM))
        }
    }
}

/// PMULL backend (aarch64).
///
/// Only sound to use once the `aes` extension has been detected.
#[cfg(target_arch = "aarch64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Pmull;

#[cfg(target_arch = "aarch64")]
impl CarrylessMultiply for Pmull {
    #[inline(always)]
    fn clmul<const IMM: i32>(a: u128, b: u128) -> u128 {
        use core::arch::aarch64::vmull_p64;

        let (x, y) = select_halves::<IMM>(a, b);
        // SAFETY: reached only from kernels compiled with neon+aes, after
        // runtime detection.
        unsafe { vmull_p64(x, y) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bit-serial reference multiply.
    fn clmul_reference(a: u64, b: u64) -> u128 {
        let mut product = 0u128;
        for i in 0..64 {
            if (a >> i) & 1 != 0 {
                product ^= (b as u128) << i;
            }
        }
        product
    }

    #[test]
    fn test_clmul64_small_values() {
        assert_eq!(clmul64(0, 0xDEADBEEF), 0);
        assert_eq!(clmul64(1, 0xDEADBEEF), 0xDEADBEEF);
        // (x + 1)^2 = x^2 + 1 over GF(2)
        assert_eq!(clmul64(0b11, 0b11), 0b101);
        assert_eq!(clmul64(u64::MAX, 1), u64::MAX as u128);
    }

    #[test]
    fn test_clmul64_matches_reference() {
        let mut seed: u64 = 0x9E3779B97F4A7C15;
        for _ in 0..2000 {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let a = seed;
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let b = seed;
            assert_eq!(clmul64(a, b), clmul_reference(a, b), "a={a:#x} b={b:#x}");
        }
        assert_eq!(
            clmul64(u64::MAX, u64::MAX),
            clmul_reference(u64::MAX, u64::MAX)
        );
    }

    #[test]
    fn test_soft_selectors() {
        let a = (0x1111_2222_3333_4444u128 << 64) | 0x5555_6666_7777_8888;
        let b = (0x9999_AAAA_BBBB_CCCCu128 << 64) | 0xDDDD_EEEE_FFFF_0001;
        let (a_lo, a_hi) = (a as u64, (a >> 64) as u64);
        let (b_lo, b_hi) = (b as u64, (b >> 64) as u64);

        assert_eq!(SoftClmul::clmul::<0x00>(a, b), clmul64(a_lo, b_lo));
        assert_eq!(SoftClmul::clmul::<0x01>(a, b), clmul64(a_hi, b_lo));
        assert_eq!(SoftClmul::clmul::<0x10>(a, b), clmul64(a_lo, b_hi));
        assert_eq!(SoftClmul::clmul::<0x11>(a, b), clmul64(a_hi, b_hi));
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_pclmulqdq_matches_soft() {
        if !std::arch::is_x86_feature_detected!("pclmulqdq") {
            return;
        }
        let mut seed: u128 = 0x0123_4567_89AB_CDEF_FEDC_BA98_7654_3210;
        for _ in 0..256 {
            seed = seed.rotate_left(29) ^ seed.wrapping_mul(0x2545F4914F6CDD1D);
            let a = seed;
            let b = seed.rotate_left(64) ^ 0x9db42487;
            assert_eq!(
                Pclmulqdq::clmul::<0x00>(a, b),
                SoftClmul::clmul::<0x00>(a, b)
            );
            assert_eq!(
                Pclmulqdq::clmul::<0x01>(a, b),
                SoftClmul::clmul::<0x01>(a, b)
            );
            assert_eq!(
                Pclmulqdq::clmul::<0x10>(a, b),
                SoftClmul::clmul::<0x10>(a, b)
            );
            assert_eq!(
                Pclmulqdq::clmul::<0x11>(a, b),
                SoftClmul::clmul::<0x11>(a, b)
            );
        }
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn test_pmull_matches_soft() {
        if !std::arch::is_aarch64_feature_detected!("aes") {
            return;
        }
        let mut seed: u128 = 0x0123_4567_89AB_CDEF_FEDC_BA98_7654_3210;
        for _ in 0..256 {
            seed = seed.rotate_left(29) ^ seed.wrapping_mul(0x2545F4914F6CDD1D);
            let a = seed;
            let b = seed.rotate_left(64) ^ 0x9db42487;
            assert_eq!(Pmull::clmul::<0x00>(a, b), SoftClmul::clmul::<0x00>(a, b));
            assert_eq!(Pmull::clmul::<0x01>(a, b), SoftClmul::clmul::<0x01>(a, b));
            assert_eq!(Pmull::clmul::<0x10>(a, b), SoftClmul::clmul::<0x10>(a, b));
            assert_eq!(Pmull::clmul::<0x11>(a, b), SoftClmul::clmul::<0x11>(a, b));
        }
    }
}

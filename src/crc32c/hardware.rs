//! CRC32-C using the processor's CRC instruction.
//!
//! | Arch | Extension | Word step |
//! |------|-----------|-----------|
//! | x86_64 | SSE4.2 | `crc32 r64` |
//! | x86 | SSE4.2 | `crc32 r32` |
//! | aarch64 | `crc` | `crc32cx` |
//!
//! Two walks are provided:
//!
//! - **serial**: one accumulator; bytes until the read position is
//!   word-aligned, whole words, then the trailing bytes.
//! - **parallel** (64-bit only): three accumulators interleaved over
//!   non-overlapping thirds of each [`BLOCK_SIZE`] block, so the instruction
//!   latency overlaps. The partial results are folded back together with the
//!   shift tables. Bytes that do not fill a whole block are walked serially
//!   first.
//!
//! Everything here is `unsafe` to call unless [`is_available`] returned true.

#[cfg(target_arch = "aarch64")]
use core::arch::aarch64::{__crc32cb, __crc32cd};
#[cfg(target_arch = "x86")]
use core::arch::x86::{_mm_crc32_u32, _mm_crc32_u8};
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{_mm_crc32_u64, _mm_crc32_u8};

#[cfg(target_pointer_width = "64")]
use super::tables::{SHIFT_ONE_STREAM, SHIFT_TWO_STREAMS, STREAM_WORDS};

/// Words per parallel block: one lead-in word, three streams, one fold word.
#[cfg(target_pointer_width = "64")]
const BLOCK_WORDS: usize = 3 * STREAM_WORDS + 2;

/// Bytes per parallel block.
#[cfg(target_pointer_width = "64")]
pub const BLOCK_SIZE: usize = BLOCK_WORDS * 8;

/// Whether the running CPU has the CRC32-C instruction.
pub fn is_available() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        std::arch::is_x86_feature_detected!("sse4.2")
    }
    #[cfg(target_arch = "aarch64")]
    {
        std::arch::is_aarch64_feature_detected!("crc")
    }
}

/// Serial hardware CRC32-C, continuing from `crc`.
///
/// # Safety
///
/// The CPU must support the CRC32-C instruction (see [`is_available`]).
pub unsafe fn crc32c_serial(crc: u32, data: &[u8]) -> u32 {
    !update_serial(!crc, data)
}

/// Three-stream hardware CRC32-C, continuing from `crc`.
///
/// # Safety
///
/// The CPU must support the CRC32-C instruction (see [`is_available`]).
#[cfg(target_pointer_width = "64")]
pub unsafe fn crc32c_parallel(crc: u32, data: &[u8]) -> u32 {
    !update_parallel(!crc, data)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse4.2")]
#[inline]
unsafe fn step_byte(crc: u32, byte: u8) -> u32 {
    _mm_crc32_u8(crc, byte)
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "crc")]
#[inline]
unsafe fn step_byte(crc: u32, byte: u8) -> u32 {
    __crc32cb(crc, byte)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
#[inline]
unsafe fn step_u64(crc: u32, word: u64) -> u32 {
    _mm_crc32_u64(crc as u64, word) as u32
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "crc")]
#[inline]
unsafe fn step_u64(crc: u32, word: u64) -> u32 {
    __crc32cd(crc, word)
}

#[cfg(target_pointer_width = "64")]
#[cfg_attr(target_arch = "x86_64", target_feature(enable = "sse4.2"))]
#[cfg_attr(target_arch = "aarch64", target_feature(enable = "crc"))]
#[inline]
unsafe fn step_word(crc: u32, word: usize) -> u32 {
    step_u64(crc, word as u64)
}

#[cfg(target_arch = "x86")]
#[target_feature(enable = "sse4.2")]
#[inline]
unsafe fn step_word(crc: u32, word: usize) -> u32 {
    _mm_crc32_u32(crc, word as u32)
}

#[cfg_attr(
    any(target_arch = "x86", target_arch = "x86_64"),
    target_feature(enable = "sse4.2")
)]
#[cfg_attr(target_arch = "aarch64", target_feature(enable = "crc"))]
unsafe fn update_serial(mut crc: u32, data: &[u8]) -> u32 {
    // Any bit pattern is a valid `usize`; `words` is aligned by construction.
    let (head, words, tail) = data.align_to::<usize>();

    for &byte in head {
        crc = step_byte(crc, byte);
    }
    for &word in words {
        crc = step_word(crc, usize::from_le(word));
    }
    for &byte in tail {
        crc = step_byte(crc, byte);
    }
    crc
}

#[cfg(target_pointer_width = "64")]
#[cfg_attr(target_arch = "x86_64", target_feature(enable = "sse4.2"))]
#[cfg_attr(target_arch = "aarch64", target_feature(enable = "crc"))]
unsafe fn update_parallel(mut crc: u32, data: &[u8]) -> u32 {
    let (prefix, blocks) = data.split_at(data.len() % BLOCK_SIZE);
    crc = update_serial(crc, prefix);

    for block in blocks.chunks_exact(BLOCK_SIZE) {
        crc = update_block(crc, block);
    }
    crc
}

/// One [`BLOCK_SIZE`] block as three interleaved streams.
///
/// Word 0 primes the first stream, words `1..=42`, `43..=84` and `85..=126`
/// are the three streams, and word 127 absorbs the folded partials.
#[cfg(target_pointer_width = "64")]
#[cfg_attr(target_arch = "x86_64", target_feature(enable = "sse4.2"))]
#[cfg_attr(target_arch = "aarch64", target_feature(enable = "crc"))]
unsafe fn update_block(crc: u32, block: &[u8]) -> u32 {
    debug_assert_eq!(block.len(), BLOCK_SIZE);

    let mut c1 = step_u64(crc, read_word(block, 0));
    let mut c2 = 0;
    let mut c3 = 0;

    for i in 1..=STREAM_WORDS {
        c1 = step_u64(c1, read_word(block, i));
        c2 = step_u64(c2, read_word(block, i + STREAM_WORDS));
        c3 = step_u64(c3, read_word(block, i + 2 * STREAM_WORDS));
    }

    let mut fold = read_word(block, BLOCK_WORDS - 1);
    fold ^= shift(&SHIFT_ONE_STREAM, c2);
    fold ^= shift(&SHIFT_TWO_STREAMS, c1);

    step_u64(c3, fold)
}

/// Little-endian word `index` of `block`.
#[cfg(target_pointer_width = "64")]
#[inline(always)]
unsafe fn read_word(block: &[u8], index: usize) -> u64 {
    debug_assert!(index * 8 + 8 <= block.len());
    // SAFETY: caller keeps `index` below BLOCK_WORDS and `block` is a full block.
    u64::from_le(core::ptr::read_unaligned(
        block.as_ptr().add(index * 8).cast::<u64>(),
    ))
}

/// Advance a partial CRC over the streams that follow it, as a value ready
/// to be XORed into the fold word.
#[cfg(target_pointer_width = "64")]
#[inline(always)]
fn shift(table: &[u32; 256], crc: u32) -> u64 {
    (table[(crc & 0xFF) as usize] as u64)
        ^ ((table[((crc >> 8) & 0xFF) as usize] as u64) << 8)
        ^ ((table[((crc >> 16) & 0xFF) as usize] as u64) << 16)
        ^ ((table[(crc >> 24) as usize] as u64) << 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32c::software;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i.wrapping_mul(131) ^ (i >> 3)) as u8).collect()
    }

    #[test]
    fn test_serial_matches_software() {
        if !is_available() {
            return;
        }
        let data = pattern(4096 + 16);
        for start in 0..9 {
            for len in [0, 1, 3, 7, 8, 9, 31, 64, 1000, 4096] {
                let slice = &data[start..start + len];
                // SAFETY: checked above.
                let hw = unsafe { crc32c_serial(0x1234_5678, slice) };
                assert_eq!(hw, software::crc32c(0x1234_5678, slice), "start={start} len={len}");
            }
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_parallel_matches_software() {
        if !is_available() {
            return;
        }
        assert_eq!(BLOCK_SIZE, 1024);
        let data = pattern(3 * BLOCK_SIZE + 64);
        for start in 0..5 {
            for len in [
                0,
                5,
                BLOCK_SIZE - 1,
                BLOCK_SIZE,
                BLOCK_SIZE + 1,
                2 * BLOCK_SIZE,
                2 * BLOCK_SIZE + 13,
                3 * BLOCK_SIZE,
            ] {
                let slice = &data[start..start + len];
                // SAFETY: checked above.
                let hw = unsafe { crc32c_parallel(0, slice) };
                assert_eq!(hw, software::crc32c(0, slice), "start={start} len={len}");
            }
        }
    }
}

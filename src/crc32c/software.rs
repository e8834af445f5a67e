//! Table-driven CRC32-C (slice-by-8).
//!
//! Leading bytes are consumed one at a time until the read position is
//! 8-byte aligned, then whole 8-byte chunks go through all eight tables, and
//! the tail is consumed one byte at a time again. The hardware serial path
//! walks the buffer with the same head/body/tail shape.

use super::tables::SLICES;

/// Compute CRC32-C in software, continuing from `crc`.
pub fn crc32c(crc: u32, data: &[u8]) -> u32 {
    !update(!crc, data)
}

/// Advance a raw (already inverted) register over `data`.
#[inline]
pub fn update(mut crc: u32, data: &[u8]) -> u32 {
    let head_len = data.as_ptr().align_offset(8).min(data.len());
    let (head, body) = data.split_at(head_len);
    crc = update_bytes(crc, head);

    let mut chunks = body.chunks_exact(8);
    for chunk in &mut chunks {
        let lo = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let hi = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);

        crc ^= lo;
        crc = SLICES[7][(crc & 0xFF) as usize]
            ^ SLICES[6][((crc >> 8) & 0xFF) as usize]
            ^ SLICES[5][((crc >> 16) & 0xFF) as usize]
            ^ SLICES[4][(crc >> 24) as usize]
            ^ SLICES[3][(hi & 0xFF) as usize]
            ^ SLICES[2][((hi >> 8) & 0xFF) as usize]
            ^ SLICES[1][((hi >> 16) & 0xFF) as usize]
            ^ SLICES[0][(hi >> 24) as usize];
    }

    update_bytes(crc, chunks.remainder())
}

/// Byte-at-a-time update using the lowest-order table.
#[inline]
fn update_bytes(mut crc: u32, bytes: &[u8]) -> u32 {
    for &byte in bytes {
        crc = SLICES[0][((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32c::tables::POLYNOMIAL;

    /// Bit-at-a-time reference, independent of the tables.
    fn bitwise(data: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &byte in data {
            crc ^= byte as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ POLYNOMIAL
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc32c(0, b"123456789"), 0xE3069283);
    }

    #[test]
    fn test_matches_bitwise_reference_at_every_offset() {
        let data: Vec<u8> = (0..300u32).map(|i| (i * 31 + 7) as u8).collect();
        // Shifting the start walks every head length from 0 to 7.
        for start in 0..16 {
            for len in [0, 1, 7, 8, 9, 15, 16, 17, 63, 64, 65, 200] {
                let slice = &data[start..start + len];
                assert_eq!(crc32c(0, slice), bitwise(slice), "start={start} len={len}");
            }
        }
    }

    #[test]
    fn test_byte_loop_agrees_with_sliced_loop() {
        let data = [0xA5u8; 64];
        assert_eq!(!update_bytes(!0, &data), crc32c(0, &data));
    }
}

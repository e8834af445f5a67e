//! CRC32-C lookup tables, generated at compile time.
//!
//! | Table | Used by | Contents |
//! |-------|---------|----------|
//! | [`SLICES`] | software path | slice-by-8 tables, offsets 32..88 bits |
//! | [`SHIFT_ONE_STREAM`] | parallel path | state advanced over one stream of zeros |
//! | [`SHIFT_TWO_STREAMS`] | parallel path | state advanced over two streams of zeros |
//!
//! All tables are for the Castagnoli polynomial `0x1EDC6F41` in reflected
//! form and match the published values bit for bit.

/// Castagnoli polynomial, bit-reflected (`0x1EDC6F41` reversed).
pub const POLYNOMIAL: u32 = 0x82F6_3B78;

/// Number of 8-byte words each of the three parallel streams covers.
pub const STREAM_WORDS: usize = 42;

/// Bytes covered by one parallel stream.
pub const STREAM_BYTES: usize = STREAM_WORDS * 8;

/// Slice-by-8 tables. `SLICES[0]` is the classic byte-at-a-time table
/// (offset 32), `SLICES[7]` is the table for the byte furthest from the
/// accumulator (offset 88).
pub static SLICES: [[u32; 256]; 8] = slice_tables();

/// Multiplier table for the middle stream of a parallel block.
#[cfg_attr(not(target_pointer_width = "64"), allow(dead_code))]
pub static SHIFT_ONE_STREAM: [u32; 256] = shift_table(STREAM_BYTES);

/// Multiplier table for the first stream of a parallel block.
#[cfg_attr(not(target_pointer_width = "64"), allow(dead_code))]
pub static SHIFT_TWO_STREAMS: [u32; 256] = shift_table(2 * STREAM_BYTES);

const fn byte_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn slice_tables() -> [[u32; 256]; 8] {
    let mut tables = [[0u32; 256]; 8];
    tables[0] = byte_table();
    let mut k = 1;
    while k < 8 {
        let mut i = 0;
        while i < 256 {
            let prev = tables[k - 1][i];
            tables[k][i] = (prev >> 8) ^ tables[0][(prev & 0xFF) as usize];
            i += 1;
        }
        k += 1;
    }
    tables
}

/// Feed `bytes` zero bytes through a raw (non-inverted) CRC register.
const fn advance_zeros(mut crc: u32, bytes: usize, table: &[u32; 256]) -> u32 {
    let mut n = 0;
    while n < bytes {
        crc = (crc >> 8) ^ table[(crc & 0xFF) as usize];
        n += 1;
    }
    crc
}

/// `table[b]` is the register value `b` advanced over `bytes` zero bytes.
///
/// Advancing is linear over GF(2), so only the eight single-bit values are
/// run through the register; every other entry is an XOR of those.
const fn shift_table(bytes: usize) -> [u32; 256] {
    let base = byte_table();

    let mut basis = [0u32; 8];
    let mut bit = 0;
    while bit < 8 {
        basis[bit] = advance_zeros(1u32 << bit, bytes, &base);
        bit += 1;
    }

    let mut table = [0u32; 256];
    let mut i = 1;
    while i < 256 {
        let mut value = 0;
        let mut bit = 0;
        while bit < 8 {
            if i & (1 << bit) != 0 {
                value ^= basis[bit];
            }
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_tables_match_published_values() {
        let expected_second_entry = [
            0xF26B8303, 0x13A29877, 0xA541927E, 0xDD45AAB8, 0x38116FAC, 0xEF306B19, 0x68032CC8,
            0x493C7D27,
        ];
        for (k, &expected) in expected_second_entry.iter().enumerate() {
            assert_eq!(SLICES[k][0], 0, "table {k} entry 0");
            assert_eq!(SLICES[k][1], expected, "table {k} entry 1");
        }

        assert_eq!(SLICES[0][2], 0xE13B70F7);
        assert_eq!(SLICES[0][3], 0x1350F3F4);
        assert_eq!(SLICES[0][0x80], POLYNOMIAL);
        assert_eq!(SLICES[0][255], 0xAD7D5351);
        assert_eq!(SLICES[7][2], 0x9278FA4E);
        assert_eq!(SLICES[7][3], 0xDB448769);
        assert_eq!(SLICES[7][255], 0x1F1530A5);
    }

    #[test]
    fn test_shift_tables_match_published_values() {
        assert_eq!(STREAM_BYTES, 336);

        assert_eq!(SHIFT_ONE_STREAM[0], 0);
        assert_eq!(SHIFT_ONE_STREAM[1], 0x8F158014);
        assert_eq!(SHIFT_ONE_STREAM[2], 0x1BC776D9);
        assert_eq!(SHIFT_ONE_STREAM[3], 0x94D2F6CD);
        assert_eq!(SHIFT_ONE_STREAM[255], 0x308FADE7);

        assert_eq!(SHIFT_TWO_STREAMS[0], 0);
        assert_eq!(SHIFT_TWO_STREAMS[1], 0xE417F38A);
        assert_eq!(SHIFT_TWO_STREAMS[2], 0xCDC391E5);
        assert_eq!(SHIFT_TWO_STREAMS[3], 0x29D4626F);
        assert_eq!(SHIFT_TWO_STREAMS[255], 0x49B8E16B);
    }

    #[test]
    fn test_shift_table_agrees_with_register_walk() {
        let base = byte_table();
        for b in [0x01_u32, 0x5A, 0xA5, 0xFF] {
            assert_eq!(
                SHIFT_ONE_STREAM[b as usize],
                advance_zeros(b, STREAM_BYTES, &base)
            );
        }
    }
}

#![no_main]
use crcpool::Crc32c;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First four bytes seed the checksum
    let (seed, data) = match data.split_first_chunk::<4>() {
        Some((seed, rest)) => (u32::from_le_bytes(*seed), rest),
        None => (0, data),
    };

    let expected = Crc32c::calculate_software(data, seed);
    assert_eq!(Crc32c::calculate(data, seed), expected);
    assert_eq!(Crc32c::calculate_hardware_serial(data, seed), expected);
    assert_eq!(Crc32c::calculate_hardware_parallel(data, seed), expected);
});

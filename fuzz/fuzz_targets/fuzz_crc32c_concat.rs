#![no_main]
use crcpool::Crc32c;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else {
        return;
    };
    let split = (split as usize * data.len()) / 255;
    let (head, tail) = data.split_at(split.min(data.len()));

    let whole = Crc32c::checksum(data);
    assert_eq!(Crc32c::calculate(tail, Crc32c::calculate(head, 0)), whole);
});

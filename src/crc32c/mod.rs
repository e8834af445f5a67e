//! CRC32-C (Castagnoli) checksums with runtime strategy dispatch.
//!
//! The first call to [`Crc32c::calculate`] probes the processor once and binds
//! one of three interchangeable implementations for the rest of the process:
//!
//! | Strategy | Selected when | Shape |
//! |----------|---------------|-------|
//! | [`Strategy::HardwareParallel`] | CRC instruction, 64-bit words | three interleaved streams per 1024-byte block |
//! | [`Strategy::HardwareSerial`] | CRC instruction, narrower words | one instruction per aligned word |
//! | [`Strategy::Software`] | no CRC instruction | slice-by-8 lookup tables |
//!
//! Every strategy applies the standard parameters (initial XOR and final XOR
//! with all ones, reflected bit order), so all of them return the same value
//! and a checksum can be continued by passing it back in as `crc`:
//!
//! ```rust
//! use crcpool::Crc32c;
//!
//! assert_eq!(Crc32c::checksum(b"123456789"), 0xE306_9283);
//!
//! let first = Crc32c::calculate(b"12345", 0);
//! assert_eq!(Crc32c::calculate(b"6789", first), 0xE306_9283);
//! ```

#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
mod hardware;
mod software;
mod tables;


use std::fmt;
use std::sync::OnceLock;

/// Signature shared by every strategy: `(crc, data) -> crc`.
type Crc32cFn = fn(u32, &[u8]) -> u32;

/// Processor facts that decide the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The CPU exposes a CRC32-C instruction usable from this build.
    pub hardware_crc: bool,
    /// Native word width in bits.
    pub word_bits: u32,
}

impl Capabilities {
    /// Probe the running processor.
    pub fn detect() -> Self {
        Self {
            hardware_crc: hardware_available(),
            word_bits: usize::BITS,
        }
    }
}

/// A CRC32-C implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Slice-by-8 table lookups.
    Software,
    /// One hardware CRC instruction per aligned machine word.
    HardwareSerial,
    /// Three hardware accumulators per 1024-byte block, recombined by table.
    HardwareParallel,
}

impl Strategy {
    /// Pick the fastest strategy the given capabilities allow.
    pub const fn select(caps: Capabilities) -> Self {
        if !caps.hardware_crc {
            Self::Software
        } else if caps.word_bits == 64 {
            Self::HardwareParallel
        } else {
            Self::HardwareSerial
        }
    }

    /// Pick the fastest strategy for the running processor.
    pub fn detect() -> Self {
        Self::select(Capabilities::detect())
    }

    /// Short human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::HardwareSerial => "hardware-serial",
            Self::HardwareParallel => "hardware-parallel",
        }
    }

    /// Whether this strategy can run on the current processor and build.
    pub fn is_supported(self) -> bool {
        match self {
            Self::Software => true,
            Self::HardwareSerial => hardware_available(),
            Self::HardwareParallel => {
                cfg!(target_pointer_width = "64") && hardware_available()
            }
        }
    }

    /// The strategy that actually runs when this one is requested: itself
    /// when supported, otherwise the next slower supported one.
    fn resolve(self) -> Self {
        match self {
            Self::HardwareParallel if self.is_supported() => Self::HardwareParallel,
            Self::HardwareParallel | Self::HardwareSerial if hardware_available() => {
                Self::HardwareSerial
            }
            _ => Self::Software,
        }
    }

    /// The function implementing [`resolve`](Self::resolve)'s strategy.
    fn function(self) -> Crc32cFn {
        match self.resolve() {
            Self::Software => software::crc32c,
            Self::HardwareSerial => hardware_serial,
            Self::HardwareParallel => hardware_parallel,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The process-wide strategy binding.
struct Calculator {
    strategy: Strategy,
    function: Crc32cFn,
}

static CALCULATOR: OnceLock<Calculator> = OnceLock::new();

impl Calculator {
    fn instance() -> &'static Self {
        CALCULATOR.get_or_init(|| {
            let caps = Capabilities::detect();
            let strategy = Strategy::select(caps);
            tracing::info!(
                strategy = strategy.name(),
                hardware_crc = caps.hardware_crc,
                word_bits = caps.word_bits,
                "Using {} CRC32-C computation",
                strategy
            );
            Self {
                strategy,
                function: strategy.function(),
            }
        })
    }
}

/// CRC32-C checksum entry points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32c;

impl Crc32c {
    /// CRC32-C of `data`, continuing from a previous checksum `crc`
    /// (pass `0` to start fresh).
    ///
    /// Uses the strategy bound on first use. Empty input returns `crc`
    /// unchanged.
    #[inline]
    pub fn calculate(data: &[u8], crc: u32) -> u32 {
        if data.is_empty() {
            return crc;
        }
        (Calculator::instance().function)(crc, data)
    }

    /// CRC32-C of `data` from scratch.
    #[inline]
    pub fn checksum(data: &[u8]) -> u32 {
        Self::calculate(data, 0)
    }

    /// CRC32-C over `len` bytes at `data`.
    ///
    /// With `len == 0` the pointer is never read and may be null.
    ///
    /// # Safety
    ///
    /// When `len > 0`, `data` must be non-null and valid for reads of `len`
    /// bytes for the duration of the call.
    pub unsafe fn calculate_raw(data: *const u8, len: usize, crc: u32) -> u32 {
        if len == 0 {
            return crc;
        }
        debug_assert!(!data.is_null(), "null data with non-zero length");
        Self::calculate(std::slice::from_raw_parts(data, len), crc)
    }

    /// CRC32-C using the table-driven software path, bypassing dispatch.
    pub fn calculate_software(data: &[u8], crc: u32) -> u32 {
        if data.is_empty() {
            return crc;
        }
        software::crc32c(crc, data)
    }

    /// CRC32-C using the serial hardware path, bypassing dispatch.
    ///
    /// Falls back to the software path on processors without the CRC
    /// instruction.
    pub fn calculate_hardware_serial(data: &[u8], crc: u32) -> u32 {
        if data.is_empty() {
            return crc;
        }
        (Strategy::HardwareSerial.function())(crc, data)
    }

    /// CRC32-C using the three-stream hardware path, bypassing dispatch.
    ///
    /// Falls back to the software path where the parallel path cannot run.
    pub fn calculate_hardware_parallel(data: &[u8], crc: u32) -> u32 {
        if data.is_empty() {
            return crc;
        }
        (Strategy::HardwareParallel.function())(crc, data)
    }

    /// The strategy [`Crc32c::calculate`] dispatches to.
    pub fn strategy() -> Strategy {
        Calculator::instance().strategy
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
fn hardware_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(hardware::is_available)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn hardware_available() -> bool {
    false
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
fn hardware_serial(crc: u32, data: &[u8]) -> u32 {
    // SAFETY: only handed out by `Strategy::function` after detection.
    unsafe { hardware::crc32c_serial(crc, data) }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn hardware_serial(crc: u32, data: &[u8]) -> u32 {
    software::crc32c(crc, data)
}

#[cfg(all(
    target_pointer_width = "64",
    any(target_arch = "x86_64", target_arch = "aarch64")
))]
fn hardware_parallel(crc: u32, data: &[u8]) -> u32 {
    // SAFETY: only handed out by `Strategy::function` after detection.
    unsafe { hardware::crc32c_parallel(crc, data) }
}

#[cfg(not(all(
    target_pointer_width = "64",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
fn hardware_parallel(crc: u32, data: &[u8]) -> u32 {
    hardware_serial(crc, data)
}

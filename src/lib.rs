//! CRC32-C checksums and a fixed-size worker thread pool.
//!
//! Two independent building blocks for storage and networking code:
//!
//! - [`Crc32c`]: CRC32-C (Castagnoli) with the implementation picked once at
//!   runtime from the CPU's capabilities: a table-driven software path, the
//!   hardware CRC instruction, or the hardware instruction over three
//!   interleaved streams.
//! - [`FixedThreadPool`]: a fixed number of workers fed from a bounded queue,
//!   with start/stop, drain, suspend/resume and discard-on-shutdown control.
//!
//! ## Features
//! - No feature flags; hardware support is detected at runtime
//! - Worker threads block asynchronous signals on Unix (configurable)
//! - Logging through `tracing`

// Note: unsafe_code = "allow" in Cargo.toml is for the CPU intrinsics in
// crc32c::hardware; every unsafe block there carries a SAFETY comment.

pub mod crc32c;
pub mod error;
pub mod thread_pool;

pub use crc32c::{Capabilities, Crc32c, Strategy};
pub use error::{PoolError, Result};
pub use thread_pool::{
    BoundedQueue, ControlState, FixedThreadPool, Job, PushError, ThreadAttributes,
    ThreadPoolOptions, DEFAULT_QUEUE_DEPTH,
};

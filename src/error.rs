//! Error types for the thread pool.
//!
//! This module provides the [`PoolError`] type returned by the fallible
//! [`FixedThreadPool`] operations. CRC32-C computation cannot fail and has no
//! error type.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Submission | [`QueueFull`], [`QueueDisabled`] | The job was not enqueued |
//! | Startup | [`Spawn`] | A worker thread could not be created |
//!
//! ## Example
//!
//! ```rust
//! use crcpool::{FixedThreadPool, PoolError};
//!
//! let pool = FixedThreadPool::new(2, 16);
//!
//! // Not started yet: the queue refuses work.
//! match pool.try_enqueue_job(|| {}) {
//!     Err(PoolError::QueueDisabled) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! [`FixedThreadPool`]: crate::FixedThreadPool
//! [`QueueFull`]: PoolError::QueueFull
//! [`QueueDisabled`]: PoolError::QueueDisabled
//! [`Spawn`]: PoolError::Spawn

use std::io;

use thiserror::Error;

/// Error type for thread pool operations.
///
/// Submission errors drop the rejected job; the caller decides whether to
/// retry, block, or give up.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The job queue is at capacity.
    ///
    /// Only returned by non-blocking submission.
    #[error("job queue is full")]
    QueueFull,

    /// The job queue is not accepting jobs.
    ///
    /// The pool is stopped, shutting down, or was explicitly disabled.
    #[error("job queue is disabled")]
    QueueDisabled,

    /// A worker thread could not be created.
    ///
    /// Threads started before the failure have been joined and the pool is
    /// back in the stopped state.
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        /// Index of the worker that failed to start.
        index: usize,
        /// The platform error.
        #[source]
        source: io::Error,
    },
}

impl<T> From<crate::thread_pool::PushError<T>> for PoolError {
    fn from(err: crate::thread_pool::PushError<T>) -> Self {
        if err.is_full() {
            Self::QueueFull
        } else {
            Self::QueueDisabled
        }
    }
}

/// Result alias for thread pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

//! Thread pool configuration.

use std::thread;

/// Default bound on queued jobs.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// How worker threads are created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadAttributes {
    /// Workers are named `<prefix>-<index>`. Unnamed when `None`.
    pub name_prefix: Option<String>,
    /// Stack size in bytes. Platform default when `None`.
    pub stack_size: Option<usize>,
}

impl ThreadAttributes {
    /// Build the `std::thread::Builder` for worker `index`.
    pub(crate) fn builder(&self, index: usize) -> thread::Builder {
        let mut builder = thread::Builder::new();
        if let Some(prefix) = &self.name_prefix {
            builder = builder.name(format!("{prefix}-{index}"));
        }
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder
    }
}

/// Options for [`FixedThreadPool::with_options`].
///
/// # Example
///
/// ```rust
/// use crcpool::{FixedThreadPool, ThreadPoolOptions};
///
/// let options = ThreadPoolOptions::default()
///     .with_threads(4)
///     .with_queue_depth(256)
///     .with_name_prefix("ingest");
/// let pool = FixedThreadPool::with_options(options);
/// assert_eq!(pool.num_threads(), 4);
/// ```
///
/// [`FixedThreadPool::with_options`]: crate::FixedThreadPool::with_options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPoolOptions {
    /// Number of worker threads. Must be non-zero.
    pub num_threads: usize,
    /// Maximum number of queued (not yet started) jobs. Must be non-zero.
    pub max_queue_depth: usize,
    /// Worker thread attributes.
    pub attributes: ThreadAttributes,
    /// Block asynchronous signals in workers (Unix only).
    pub block_signals: bool,
}

impl Default for ThreadPoolOptions {
    fn default() -> Self {
        Self {
            num_threads: thread::available_parallelism().map_or(1, |n| n.get()),
            max_queue_depth: DEFAULT_QUEUE_DEPTH,
            attributes: ThreadAttributes::default(),
            block_signals: true,
        }
    }
}

impl ThreadPoolOptions {
    /// Set the number of worker threads.
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the queue bound.
    pub fn with_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Name workers `<prefix>-<index>`.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attributes.name_prefix = Some(prefix.into());
        self
    }

    /// Set the worker stack size in bytes.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.attributes.stack_size = Some(bytes);
        self
    }

    /// Replace all thread attributes.
    pub fn with_attributes(mut self, attributes: ThreadAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Choose whether workers block asynchronous signals.
    pub fn with_signal_blocking(mut self, block: bool) -> Self {
        self.block_signals = block;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ThreadPoolOptions::default();
        assert!(options.num_threads >= 1);
        assert_eq!(options.max_queue_depth, DEFAULT_QUEUE_DEPTH);
        assert!(options.block_signals);
        assert_eq!(options.attributes, ThreadAttributes::default());
    }

    #[test]
    fn test_named_builder() {
        let attributes = ThreadAttributes {
            name_prefix: Some("crc".to_string()),
            stack_size: Some(256 * 1024),
        };
        let handle = attributes
            .builder(3)
            .spawn(|| thread::current().name().map(str::to_owned))
            .expect("spawn");
        assert_eq!(handle.join().expect("join").as_deref(), Some("crc-3"));
    }
}

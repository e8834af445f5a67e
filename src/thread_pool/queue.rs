//! Bounded FIFO queue with an enable/disable switch.
//!
//! Backed by a `crossbeam_channel::bounded` channel whose both ends are owned
//! by the queue, so the channel never disconnects. Every insert happens under
//! the switch lock, so disabling the queue makes every later push fail,
//! including pushes already blocked on a full queue: those wait for
//! readiness against a "closed" channel whose sender is dropped by
//! [`BoundedQueue::disable`], then retry.

use std::fmt;
use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Select, Sender, TrySendError};

/// A push that did not enqueue. The item is handed back.
pub enum PushError<T> {
    /// The queue was at capacity (non-blocking push only).
    Full(T),
    /// The queue is disabled.
    Disabled(T),
}

impl<T> PushError<T> {
    /// Recover the item that was not enqueued.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Disabled(item) => item,
        }
    }

    /// Whether the push failed because the queue was full.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Whether the push failed because the queue was disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Disabled(_) => f.write_str("Disabled(..)"),
        }
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("pushing into a full queue"),
            Self::Disabled(_) => f.write_str("pushing into a disabled queue"),
        }
    }
}

impl<T> std::error::Error for PushError<T> {}

struct Switch {
    enabled: bool,
    /// Dropped on disable; `closed` then reports disconnection.
    closer: Option<Sender<()>>,
    closed: Receiver<()>,
}

impl Switch {
    fn open() -> Self {
        let (closer, closed) = bounded(0);
        Self {
            enabled: true,
            closer: Some(closer),
            closed,
        }
    }
}

/// Fixed-capacity multi-producer multi-consumer FIFO queue.
pub struct BoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    switch: Mutex<Switch>,
}

impl<T> BoundedQueue<T> {
    /// Create an enabled queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            switch: Mutex::new(Switch::open()),
        }
    }

    /// Append `item`, blocking while the queue is full.
    ///
    /// Fails with [`PushError::Disabled`] if the queue is disabled before or
    /// while waiting for room.
    pub fn push_back(&self, mut item: T) -> Result<(), PushError<T>> {
        loop {
            // The enabled check and the insert happen under one switch lock,
            // so nothing lands in the queue once `disable` has returned.
            let closed = {
                let switch = self.lock_switch();
                if !switch.enabled {
                    return Err(PushError::Disabled(item));
                }
                match self.tx.try_send(item) {
                    Ok(()) => return Ok(()),
                    Err(TrySendError::Full(rejected)) => item = rejected,
                    Err(TrySendError::Disconnected(rejected)) => {
                        return Err(PushError::Disabled(rejected));
                    }
                }
                switch.closed.clone()
            };

            // Wait for room or for `disable`, then retry under the lock.
            let mut select = Select::new();
            select.send(&self.tx);
            select.recv(&closed);
            let _ = select.ready();
        }
    }

    /// Append `item` if there is room right now.
    pub fn try_push_back(&self, item: T) -> Result<(), PushError<T>> {
        let switch = self.lock_switch();
        if !switch.enabled {
            return Err(PushError::Disabled(item));
        }
        self.tx.try_send(item).map_err(|err| match err {
            TrySendError::Full(item) => PushError::Full(item),
            TrySendError::Disconnected(item) => PushError::Disabled(item),
        })
    }

    /// Remove the front item, if any, without blocking.
    pub fn try_pop_front(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }

    /// Accept pushes again. No-op when already enabled.
    pub fn enable(&self) {
        let mut switch = self.lock_switch();
        if !switch.enabled {
            *switch = Switch::open();
        }
    }

    /// Reject all pushes, waking pushers blocked on a full queue.
    pub fn disable(&self) {
        let mut switch = self.lock_switch();
        switch.enabled = false;
        drop(switch.closer.take());
    }

    /// Whether pushes are accepted.
    pub fn is_enabled(&self) -> bool {
        self.lock_switch().enabled
    }

    /// Drop every queued item and return how many there were.
    pub fn remove_all(&self) -> usize {
        self.rx.try_iter().count()
    }

    fn lock_switch(&self) -> std::sync::MutexGuard<'_, Switch> {
        // The switch holds plain flags; a poisoned guard is still coherent.
        self.switch
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

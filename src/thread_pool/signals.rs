//! Signal masking for worker thread creation.
//!
//! New threads inherit the creating thread's signal mask, so asynchronous
//! signals are blocked just around the spawn and the old mask is put back
//! right after. Synchronous fault signals stay deliverable so a worker that
//! faults still gets the signal on its own thread.

#[cfg(unix)]
use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow, Signal};

/// Signals raised by the faulting thread itself; never blocked.
#[cfg(unix)]
pub const SYNCHRONOUS_SIGNALS: [Signal; 7] = [
    Signal::SIGBUS,
    Signal::SIGFPE,
    Signal::SIGILL,
    Signal::SIGSEGV,
    Signal::SIGSYS,
    Signal::SIGABRT,
    Signal::SIGTRAP,
];

/// Blocks asynchronous signals on the current thread until dropped.
pub struct SignalMaskGuard {
    #[cfg(unix)]
    previous: Option<SigSet>,
}

impl SignalMaskGuard {
    /// Block every signal except [`SYNCHRONOUS_SIGNALS`] on this thread.
    ///
    /// Failure to change the mask is logged and the guard restores nothing.
    #[cfg(unix)]
    pub fn block_asynchronous() -> Self {
        let mut blocked = SigSet::all();
        for signal in SYNCHRONOUS_SIGNALS {
            blocked.remove(signal);
        }

        let mut previous = SigSet::empty();
        match pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&blocked), Some(&mut previous)) {
            Ok(()) => Self {
                previous: Some(previous),
            },
            Err(err) => {
                tracing::warn!("Failed to block signals for worker spawn: {}", err);
                Self { previous: None }
            }
        }
    }

    /// Signal masks do not exist here.
    #[cfg(not(unix))]
    pub fn block_asynchronous() -> Self {
        Self {}
    }
}

#[cfg(unix)]
impl Drop for SignalMaskGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None) {
                tracing::warn!("Failed to restore signal mask: {}", err);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_spawned_thread_blocks_async_signals_only() {
        let before = SigSet::thread_get_mask().expect("mask");

        let handle = {
            let _guard = SignalMaskGuard::block_asynchronous();
            thread::spawn(|| SigSet::thread_get_mask().expect("mask"))
        };
        let worker_mask = handle.join().expect("join");

        assert!(worker_mask.contains(Signal::SIGINT));
        assert!(worker_mask.contains(Signal::SIGTERM));
        assert!(worker_mask.contains(Signal::SIGUSR1));
        for signal in SYNCHRONOUS_SIGNALS {
            assert!(!worker_mask.contains(signal), "{signal:?} must stay deliverable");
        }

        let after = SigSet::thread_get_mask().expect("mask");
        assert_eq!(
            before.contains(Signal::SIGINT),
            after.contains(Signal::SIGINT)
        );
        assert_eq!(
            before.contains(Signal::SIGUSR1),
            after.contains(Signal::SIGUSR1)
        );
    }
}

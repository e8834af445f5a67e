//! Fixed-size worker thread pool with a bounded job queue.
//!
//! A [`FixedThreadPool`] owns a fixed number of worker threads and a
//! [`BoundedQueue`] of jobs. Administrative calls move the pool through four
//! control states:
//!
//! | State | Workers |
//! |-------|---------|
//! | [`ControlState::Stop`] | not running; threads (if any) are about to exit |
//! | [`ControlState::Run`] | pop and execute jobs |
//! | [`ControlState::Drain`] | execute until the queue is empty, then park |
//! | [`ControlState::Suspend`] | park without executing anything |
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            │ gate: park, bump `ready`, wait for a new │
//!            │ generation                               │◄──────┐
//!            └──────────────────────────────────────────┘       │
//!                              │ released                       │
//!                              ↓                                │
//!   Run ──► pop / execute / wait on the wake semaphore          │
//!                              │ state changed                  │
//!                              ↓                                │
//!   Drain ─► pop / execute until empty ─────────────────────────┤
//!   Suspend ────────────────────────────────────────────────────┘
//!   Stop ──► thread exits
//! ```
//!
//! Every worker parks at the gate between phases, so an administrative call
//! can wait until all workers have acknowledged a state change (drain,
//! suspend, stop) and release them all at once by bumping the gate
//! generation. Administrative calls are serialized by a separate meta lock,
//! so the gate lock only ever guards the short worker-parking path.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use crcpool::FixedThreadPool;
//!
//! let pool = FixedThreadPool::new(4, 64);
//! pool.start().expect("spawn workers");
//!
//! let done = Arc::new(AtomicUsize::new(0));
//! for _ in 0..10 {
//!     let done = Arc::clone(&done);
//!     pool.enqueue_job(move || {
//!         done.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .expect("queue accepts jobs while running");
//! }
//!
//! pool.drain();
//! assert_eq!(done.load(Ordering::SeqCst), 10);
//! ```

mod options;
mod queue;
mod signals;


pub use options::{ThreadAttributes, ThreadPoolOptions, DEFAULT_QUEUE_DEPTH};
pub use queue::{BoundedQueue, PushError};

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{PoolError, Result};
use signals::SignalMaskGuard;

/// A unit of work. Runs once on a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlState {
    /// Workers are not processing; threads exit when released.
    Stop = 0,
    /// Workers dequeue and execute jobs.
    Run = 1,
    /// Workers execute until the queue is empty, then park.
    Drain = 2,
    /// Workers park without executing jobs.
    Suspend = 3,
}

impl ControlState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Run,
            2 => Self::Drain,
            3 => Self::Suspend,
            _ => Self::Stop,
        }
    }
}

/// Gate bookkeeping, guarded by the gate mutex.
#[derive(Debug, Default)]
struct Gate {
    /// Generation; bumping it releases every parked worker.
    generation: u64,
    /// Workers parked since the last release.
    ready: usize,
}

/// State shared between the pool handle and its workers.
struct Shared {
    queue: BoundedQueue<Job>,
    control: AtomicU8,
    gate: Mutex<Gate>,
    gate_cond: Condvar,
    ready_cond: Condvar,
    /// Workers blocked (or about to block) on the wake semaphore.
    waiting: AtomicUsize,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Shared {
    fn new(max_queue_depth: usize) -> Self {
        let (wake_tx, wake_rx) = unbounded();
        Self {
            queue: BoundedQueue::new(max_queue_depth),
            control: AtomicU8::new(ControlState::Stop as u8),
            gate: Mutex::new(Gate::default()),
            gate_cond: Condvar::new(),
            ready_cond: Condvar::new(),
            waiting: AtomicUsize::new(0),
            wake_tx,
            wake_rx,
        }
    }

    fn control(&self) -> ControlState {
        ControlState::from_u8(self.control.load(Ordering::SeqCst))
    }

    fn set_control(&self, state: ControlState) {
        self.control.store(state as u8, Ordering::SeqCst);
    }

    fn lock_gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.lock_gate().generation
    }

    /// Park at the gate until the generation moves past `seen`; returns the
    /// new generation.
    fn park(&self, seen: u64) -> u64 {
        let mut gate = self.lock_gate();
        gate.ready += 1;
        self.ready_cond.notify_all();

        while gate.generation == seen {
            gate = self
                .gate_cond
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        gate.generation
    }

    /// Block until `expected` workers are parked at the gate.
    fn wait_workers_ready(&self, expected: usize) {
        let mut gate = self.lock_gate();
        while gate.ready != expected {
            gate = self
                .ready_cond
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Release every parked worker into the current control state.
    fn release_workers(&self) {
        let mut gate = self.lock_gate();
        gate.ready = 0;
        gate.generation = gate.generation.wrapping_add(1);
        self.gate_cond.notify_all();
    }

    /// Wake every worker blocked on the semaphore so it re-reads the state.
    fn interrupt_workers(&self) {
        let _gate = self.lock_gate();
        for _ in 0..self.waiting.load(Ordering::SeqCst) {
            let _ = self.wake_tx.send(());
        }
    }

    /// Wake one worker waiting for work, if any.
    fn wake_one(&self) {
        if self.waiting.load(Ordering::SeqCst) > 0 {
            let _ = self.wake_tx.send(());
        }
    }

    fn process_jobs(&self) {
        while self.control() == ControlState::Run {
            match self.queue.try_pop_front() {
                Some(job) => run_job(job),
                None => self.wait_for_work(),
            }
        }
    }

    fn wait_for_work(&self) {
        // Checked under the gate lock so an interrupt either sees this worker
        // counted or this worker sees the new state.
        let park = {
            let _gate = self.lock_gate();
            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.control() == ControlState::Run && self.queue.is_empty()
        };
        if park {
            let _ = self.wake_rx.recv();
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }

    fn drain_queue(&self) {
        while self.control() == ControlState::Drain {
            match self.queue.try_pop_front() {
                Some(job) => run_job(job),
                None => return,
            }
        }
    }
}

fn run_job(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!("Thread pool job panicked");
    }
}

fn worker_main(shared: Arc<Shared>, index: usize, mut generation: u64) {
    tracing::trace!(index, "Worker thread started");
    loop {
        generation = shared.park(generation);

        let mut control = shared.control();
        if control == ControlState::Run {
            shared.process_jobs();
            control = shared.control();
        }

        match control {
            ControlState::Drain => shared.drain_queue(),
            ControlState::Stop => break,
            // Run is only re-entered through the gate.
            ControlState::Suspend | ControlState::Run => {}
        }
    }
    tracing::trace!(index, "Worker thread exiting");
}

/// Join handles of the live workers, guarded by the meta mutex.
#[derive(Default)]
struct ThreadGroup {
    handles: Vec<JoinHandle<()>>,
    #[cfg(test)]
    fail_at: Option<usize>,
}

impl ThreadGroup {
    fn spawn<F>(&mut self, builder: thread::Builder, f: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        #[cfg(test)]
        {
            if self.fail_at == Some(self.handles.len()) {
                return Err(io::Error::other("injected spawn failure"));
            }
        }
        self.handles.push(builder.spawn(f)?);
        Ok(())
    }

    fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }

    fn len(&self) -> usize {
        self.handles.len()
    }
}

/// A pool of a fixed number of worker threads fed from a bounded queue.
///
/// Created stopped, with the queue disabled; call [`start`](Self::start)
/// before submitting jobs. Dropping the pool calls
/// [`shutdown`](Self::shutdown).
pub struct FixedThreadPool {
    shared: Arc<Shared>,
    meta: Mutex<ThreadGroup>,
    options: ThreadPoolOptions,
}

impl FixedThreadPool {
    /// Create a stopped pool of `num_threads` workers and a queue bound of
    /// `max_queue_depth` jobs.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero.
    pub fn new(num_threads: usize, max_queue_depth: usize) -> Self {
        Self::with_options(
            ThreadPoolOptions::default()
                .with_threads(num_threads)
                .with_queue_depth(max_queue_depth),
        )
    }

    /// Create a stopped pool from `options`.
    ///
    /// # Panics
    ///
    /// Panics if `options.num_threads` or `options.max_queue_depth` is zero.
    pub fn with_options(options: ThreadPoolOptions) -> Self {
        assert!(options.num_threads > 0, "thread pool needs at least one thread");
        assert!(
            options.max_queue_depth > 0,
            "thread pool needs a non-zero queue depth"
        );

        let shared = Shared::new(options.max_queue_depth);
        shared.queue.disable();

        Self {
            shared: Arc::new(shared),
            meta: Mutex::new(ThreadGroup::default()),
            options,
        }
    }

    /// Spawn the workers and start processing jobs.
    ///
    /// No-op unless the pool is stopped. If a worker cannot be created, the
    /// workers already started are joined and the pool stays stopped.
    pub fn start(&self) -> Result<()> {
        let mut group = self.lock_meta();
        if self.shared.control() != ControlState::Stop {
            return Ok(());
        }

        // Workers start from this generation, so a release racing the spawn
        // cannot leave one parked forever.
        let generation = self.shared.generation();

        for index in group.len()..self.options.num_threads {
            if let Err(source) = self.spawn_worker(&mut group, index, generation) {
                tracing::warn!(index, error = %source, "Failed to spawn worker thread, rolling back");
                self.shared.release_workers();
                group.join_all();
                self.shared.lock_gate().ready = 0;
                return Err(PoolError::Spawn { index, source });
            }
        }

        self.shared.wait_workers_ready(self.options.num_threads);
        self.shared.queue.enable();
        self.shared.set_control(ControlState::Run);
        self.shared.release_workers();

        tracing::debug!(threads = self.options.num_threads, "Thread pool started");
        Ok(())
    }

    /// Stop accepting jobs, finish the queued ones, and join the workers.
    ///
    /// No-op unless the pool is running.
    pub fn stop(&self) {
        let mut group = self.lock_meta();
        if self.shared.control() != ControlState::Run {
            return;
        }

        self.shared.queue.disable();
        self.shared.set_control(ControlState::Drain);
        self.shared.interrupt_workers();
        self.shared.wait_workers_ready(self.options.num_threads);

        self.shared.set_control(ControlState::Stop);
        self.shared.release_workers();
        group.join_all();

        tracing::debug!("Thread pool stopped");
    }

    /// Stop accepting jobs, discard the queued ones, and join the workers.
    ///
    /// Jobs already executing run to completion. Also tears down a suspended
    /// pool. No-op on a stopped pool.
    pub fn shutdown(&self) {
        let mut group = self.lock_meta();
        let control = self.shared.control();
        if control != ControlState::Run && control != ControlState::Suspend {
            return;
        }

        self.shared.queue.disable();
        self.shared.set_control(ControlState::Stop);
        if control == ControlState::Suspend {
            self.shared.release_workers();
        } else {
            self.shared.interrupt_workers();
        }

        let discarded = self.shared.queue.remove_all();
        group.join_all();

        tracing::debug!(discarded, "Thread pool shut down");
    }

    /// Block until every queued job has run, leaving the pool running.
    ///
    /// Jobs submitted concurrently from other threads may or may not be
    /// included. No-op unless the pool is running.
    pub fn drain(&self) {
        let _group = self.lock_meta();
        if self.shared.control() != ControlState::Run {
            return;
        }

        self.shared.set_control(ControlState::Drain);
        self.shared.interrupt_workers();
        self.shared.wait_workers_ready(self.options.num_threads);

        self.shared.set_control(ControlState::Run);
        self.shared.release_workers();

        tracing::debug!("Thread pool drained");
    }

    /// Park every worker without running further jobs.
    ///
    /// Returns once all workers are parked; jobs already executing finish
    /// first. The queue keeps accepting jobs. No-op unless the pool is
    /// running.
    pub fn suspend(&self) {
        let _group = self.lock_meta();
        if self.shared.control() != ControlState::Run {
            return;
        }

        self.shared.set_control(ControlState::Suspend);
        self.shared.interrupt_workers();
        self.shared.wait_workers_ready(self.options.num_threads);

        tracing::debug!(pending = self.shared.queue.len(), "Thread pool suspended");
    }

    /// Release suspended workers back into processing.
    ///
    /// No-op unless the pool is suspended.
    pub fn resume(&self) {
        let _group = self.lock_meta();
        if self.shared.control() != ControlState::Suspend {
            return;
        }

        self.shared.set_control(ControlState::Run);
        self.shared.release_workers();

        tracing::debug!("Thread pool resumed");
    }

    /// Submit `job`, blocking while the queue is full.
    ///
    /// Fails with [`PoolError::QueueDisabled`] if the queue is disabled, also
    /// when it becomes disabled while this call is blocked.
    pub fn enqueue_job<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.queue.push_back(Box::new(job))?;
        self.shared.wake_one();
        Ok(())
    }

    /// Submit `job` only if the queue has room right now.
    pub fn try_enqueue_job<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.queue.try_push_back(Box::new(job))?;
        self.shared.wake_one();
        Ok(())
    }

    /// Accept job submissions.
    pub fn enable(&self) {
        self.shared.queue.enable();
    }

    /// Reject job submissions. Queued jobs are kept.
    pub fn disable(&self) {
        self.shared.queue.disable();
    }

    /// Whether job submissions are accepted.
    pub fn is_enabled(&self) -> bool {
        self.shared.queue.is_enabled()
    }

    /// Current control state.
    pub fn state(&self) -> ControlState {
        self.shared.control()
    }

    /// Whether the workers have been started and not stopped.
    pub fn is_started(&self) -> bool {
        self.shared.control() != ControlState::Stop
    }

    /// Configured number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.options.num_threads
    }

    /// Number of live worker threads.
    pub fn num_active_threads(&self) -> usize {
        self.lock_meta().len()
    }

    /// Number of queued jobs not yet picked up by a worker.
    pub fn num_pending_jobs(&self) -> usize {
        self.shared.queue.len()
    }

    /// Maximum number of queued jobs.
    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    fn spawn_worker(&self, group: &mut ThreadGroup, index: usize, generation: u64) -> io::Result<()> {
        let builder = self.options.attributes.builder(index);
        let shared = Arc::clone(&self.shared);

        let _mask = self
            .options
            .block_signals
            .then(SignalMaskGuard::block_asynchronous);
        group.spawn(builder, move || worker_main(shared, index, generation))
    }

    fn lock_meta(&self) -> MutexGuard<'_, ThreadGroup> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the spawn of worker `index` fail.
    #[cfg(test)]
    fn fail_spawn_at(&self, index: usize) {
        self.lock_meta().fail_at = Some(index);
    }
}

impl Drop for FixedThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FixedThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedThreadPool")
            .field("state", &self.state())
            .field("num_threads", &self.options.num_threads)
            .field("pending", &self.num_pending_jobs())
            .field("capacity", &self.queue_capacity())
            .finish()
    }
}

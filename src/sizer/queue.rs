//! Work queue for locators
//!
//! A multi-producer/multi-consumer queue of [`Locator`] work items.
//! Workers both drain it and, during expansion, feed derived locators
//! back into it.
//!
//! Closing is an explicit, idempotent operation performed only by the
//! coordinator once its expansion counter reaches zero: the single
//! internal sender lives behind a mutex, and `close` drops it. Workers
//! submit through the same guarded slot, so no stray sender clone can
//! keep the channel alive past the close.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::WorkerError;
use crate::locator::Locator;

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total locators enqueued (initial + derived)
    pub enqueued: AtomicU64,

    /// Total locators dequeued by workers
    pub dequeued: AtomicU64,

    /// Number of times `close` actually closed the queue
    pub closes: AtomicU64,
}

impl QueueStats {
    /// Total locators enqueued
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Total locators dequeued
    pub fn dequeued_count(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// How many times the queue transitioned to closed (at most 1)
    pub fn close_count(&self) -> u64 {
        self.closes.load(Ordering::Relaxed)
    }
}

struct Shared {
    sender: Mutex<Option<Sender<Locator>>>,
    receiver: Receiver<Locator>,
    closed: AtomicBool,
    stats: Arc<QueueStats>,
}

/// Result of polling the queue
#[derive(Debug)]
pub enum RecvOutcome {
    /// A locator is ready for processing
    Task(Locator),

    /// Nothing arrived within the timeout; the queue is still open
    TimedOut,

    /// The queue is closed and fully drained
    Closed,
}

/// Multi-producer/multi-consumer locator queue with explicit close
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    /// Create an open, empty queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            shared: Arc::new(Shared {
                sender: Mutex::new(Some(sender)),
                receiver,
                closed: AtomicBool::new(false),
                stats: Arc::new(QueueStats::default()),
            }),
        }
    }

    /// Get a handle for a worker (clone per worker)
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            shared: Arc::clone(&self.shared),
            receiver: self.shared.receiver.clone(),
        }
    }

    /// Enqueue a locator
    pub fn submit(&self, locator: Locator) -> Result<(), WorkerError> {
        self.shared.submit(locator)
    }

    /// Close the queue
    ///
    /// Returns `true` if this call performed the close; later calls are
    /// no-ops. Items already enqueued remain receivable until drained.
    pub fn close(&self) -> bool {
        match self.shared.sender.lock().take() {
            Some(sender) => {
                drop(sender);
                self.shared.closed.store(true, Ordering::SeqCst);
                self.shared.stats.closes.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Current queue length
    pub fn len(&self) -> usize {
        self.shared.receiver.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.shared.receiver.is_empty()
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.shared.stats)
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    fn submit(&self, locator: Locator) -> Result<(), WorkerError> {
        let guard = self.sender.lock();
        match guard.as_ref() {
            Some(sender) => {
                // The receiver lives as long as Shared, so send cannot fail
                sender.send(locator).map_err(|_| WorkerError::QueueClosed)?;
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(WorkerError::QueueClosed),
        }
    }
}

/// Per-worker handle for submitting and draining locators
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
    receiver: Receiver<Locator>,
}

impl QueueHandle {
    /// Enqueue a derived locator
    pub fn submit(&self, locator: Locator) -> Result<(), WorkerError> {
        self.shared.submit(locator)
    }

    /// Poll for a locator with a timeout
    ///
    /// The timeout lets workers re-check the cancel flag while the queue
    /// is idle but still open.
    pub fn recv_timeout(&self, timeout: Duration) -> RecvOutcome {
        match self.receiver.recv_timeout(timeout) {
            Ok(locator) => {
                self.shared.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                RecvOutcome::Task(locator)
            }
            Err(RecvTimeoutError::Timeout) => RecvOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => RecvOutcome::Closed,
        }
    }
}

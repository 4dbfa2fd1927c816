//! The aggregate-size engine
//!
//! Computes the total byte size of every blob matched by a set of
//! locators, expanding ambiguous locators into concrete containers along
//! the way.
//!
//! # Architecture
//!
//! ```text
//!  initial locators
//!        │
//!        ▼
//! ┌──────────────┐    resolved locators re-submitted by expansion
//! │  WorkQueue   │◄──────────────────────────────┐
//! └──────┬───────┘                               │
//!        │                                       │
//!  ┌─────▼─────┐  ┌───────────┐           ┌─────┴─────┐
//!  │ Worker 1  │  │ Worker 2  │   ...     │ Worker N+K│
//!  └─────┬─────┘  └─────┬─────┘           └─────┬─────┘
//!        │ batches, expansion-done, worker-exited │
//!        └──────────────┬─────────────────────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │ Coordinator  │  counters close the queue and decide
//!               │ (sole owner) │  completion; batches fold into the total
//!               └──────┬───────┘
//!                      ▼
//!              Total size: 3.50 MB
//! ```
//!
//! The coordinator owns the two counters (`expansions_pending`,
//! `workers_alive`) and is the only task that closes the queue, so the
//! termination protocol needs no global list of outstanding work.

pub mod coordinator;
pub mod queue;
pub mod report;
pub mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StorageError;
use crate::storage::BlobRecord;

pub use coordinator::{SizeCoordinator, SizeReport};
pub use queue::{QueueStats, WorkQueue};
pub use report::{format_bytes, scale_bytes};

/// Shared cancellation flag
///
/// Checked by every worker at each loop iteration and each retry
/// boundary. Set by the coordinator when a fatal error arrives, or by an
/// external party (e.g. a ctrl-c handler) to stop the computation early.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Signals merged onto the coordinator's event channel
///
/// One channel carries all three sources so the coordinator observes them
/// in arrival order; each worker sends its batches before its own exit
/// signal, so per-producer FIFO guarantees the result stream is drained
/// once every exit has been seen.
#[derive(Debug)]
pub(crate) enum SizeEvent {
    /// An unresolved locator finished emitting all of its derived locators
    ExpansionDone,

    /// A worker's loop exited
    WorkerExited { worker: usize },

    /// One resolved locator's records, or the error that stopped it
    Batch(Result<ResultBatch, StorageError>),
}

/// The blob records matched under one fully-resolved locator
///
/// Created by a worker, consumed exactly once by the coordinator.
#[derive(Debug, Clone)]
pub struct ResultBatch {
    /// Container the records were listed from
    pub container: String,

    /// All matched records, in listing order
    pub records: Vec<BlobRecord>,
}

impl ResultBatch {
    /// Sum of the record sizes in bytes
    pub fn total_bytes(&self) -> i64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(!flag.is_set());

        let clone = flag.clone();
        clone.set();
        assert!(flag.is_set());
    }

    #[test]
    fn test_batch_total() {
        let batch = ResultBatch {
            container: "data".into(),
            records: vec![
                BlobRecord::new("a", 100),
                BlobRecord::new("b", 250),
                BlobRecord::new("c", 4096),
            ],
        };
        assert_eq!(batch.total_bytes(), 4446);
    }
}

//! Size coordinator - owns queue lifecycle and the running total
//!
//! The coordinator is the single task that:
//! - seeds the work queue and sizes the pool (configured workers plus one
//!   slot per initial locator, so that every initial locator expanding at
//!   once still leaves a worker free to drain the queue)
//! - counts expansion-done signals and closes the work queue when all
//!   initially-unresolved locators have finished emitting derived work
//! - counts worker-exited signals to know when the result stream is done
//! - folds result batches into the running byte total
//!
//! Because every unresolved locator emits exactly one expansion-done
//! signal and every worker exactly one exit signal, both counts are known
//! at start and suffice to prove completion without a global work list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use tracing::{debug, info, trace, warn};

use crate::config::SizeConfig;
use crate::error::{Result, SizerError, StorageError, WorkerError};
use crate::locator::Locator;
use crate::sizer::queue::WorkQueue;
use crate::sizer::report;
use crate::sizer::worker::{aggregate_stats, SizeWorker};
use crate::sizer::{CancelFlag, SizeEvent};
use crate::storage::StorageClient;

/// Result of a completed size computation
#[derive(Debug)]
pub struct SizeReport {
    /// Total byte size of every matched blob
    pub total_bytes: i64,

    /// Number of blob entries counted
    pub blob_count: u64,

    /// Result batches received (one per fully-resolved locator)
    pub batches: u64,

    /// Unresolved locators expanded
    pub containers_expanded: u64,

    /// Containers fully listed
    pub containers_sized: u64,

    /// Transient page failures that were retried
    pub retries: u64,

    /// Time taken for the computation
    pub duration: Duration,
}

impl SizeReport {
    /// Render the total in the largest fitting decimal unit
    pub fn format_total(&self) -> String {
        report::format_bytes(self.total_bytes)
    }
}

/// Coordinates the parallel size computation
pub struct SizeCoordinator {
    config: Arc<SizeConfig>,
    client: Arc<dyn StorageClient>,
    cancel: CancelFlag,
}

impl SizeCoordinator {
    /// Create a coordinator over a storage client
    pub fn new(config: SizeConfig, client: Arc<dyn StorageClient>) -> Self {
        Self {
            config: Arc::new(config),
            client,
            cancel: CancelFlag::new(),
        }
    }

    /// Get a clone of the cancel flag (for signal handlers)
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the size computation over the given locators
    ///
    /// Fatal errors cancel all workers and surface as a single error; no
    /// partial total is ever reported.
    pub fn run(self, locators: Vec<Locator>) -> Result<SizeReport> {
        self.run_with_queue(locators, WorkQueue::new())
    }

    fn run_with_queue(self, locators: Vec<Locator>, queue: WorkQueue) -> Result<SizeReport> {
        let start = Instant::now();

        let pool_size = self.config.worker_count + locators.len();
        let expansions = locators.iter().filter(|l| !l.is_resolved()).count();

        info!(
            locators = locators.len(),
            unresolved = expansions,
            workers = pool_size,
            "starting size computation"
        );

        let (events_tx, events_rx) = unbounded();

        for locator in &locators {
            debug!(locator = %locator, "submitting source");
            queue.submit(locator.clone())?;
        }

        let mut workers = Vec::with_capacity(pool_size);
        for id in 0..pool_size {
            let spawned = SizeWorker::spawn(
                id,
                Arc::clone(&self.config),
                Arc::clone(&self.client),
                queue.handle(),
                events_tx.clone(),
                self.cancel.clone(),
            );

            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // The part of the pool that did start must not be left
                    // polling an open queue forever
                    warn!(worker = id, error = %e, "spawn failed, stopping pool");
                    self.cancel.set();
                    queue.close();
                    for worker in workers {
                        if let Err(join_err) = worker.join() {
                            warn!(error = %join_err, "worker failed to join cleanly");
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        // Workers hold the only event senders now; if every thread dies
        // without its exit signal, recv below reports disconnection
        // instead of hanging
        drop(events_tx);

        let mut expansions_pending = expansions;
        if expansions_pending == 0 {
            // Nothing will ever feed derived work back into the queue
            debug!("no expansions required, closing work queue");
            queue.close();
        }

        let mut workers_alive = pool_size;
        let mut total_bytes: i64 = 0;
        let mut blob_count: u64 = 0;
        let mut batches: u64 = 0;
        let mut fatal: Option<StorageError> = None;
        let mut channel_error = false;

        // Each worker sends its batches before its own exit signal, so
        // once every exit has been observed the result stream is drained
        while workers_alive > 0 {
            let event = match events_rx.recv() {
                Ok(event) => event,
                Err(_) => {
                    channel_error = true;
                    break;
                }
            };

            match event {
                SizeEvent::ExpansionDone => {
                    expansions_pending -= 1;
                    debug!(remaining = expansions_pending, "source expanded");
                    if expansions_pending == 0 && queue.close() {
                        debug!("all sources expanded, work queue closed");
                    }
                }

                SizeEvent::WorkerExited { worker } => {
                    workers_alive -= 1;
                    debug!(worker, still_working = workers_alive, "worker exited");
                }

                SizeEvent::Batch(Ok(batch)) => {
                    batches += 1;
                    blob_count += batch.records.len() as u64;
                    total_bytes += batch.total_bytes();
                    trace!(
                        container = %batch.container,
                        blobs = batch.records.len(),
                        "batch received"
                    );
                }

                SizeEvent::Batch(Err(e)) => {
                    // First fatal error wins; cancel the pool and keep
                    // draining events until every worker has exited
                    if fatal.is_none() {
                        warn!(error = %e, "fatal error, cancelling computation");
                        fatal = Some(e);
                        self.cancel.set();
                        queue.close();
                    }
                }
            }
        }

        let (containers_expanded, containers_sized, _, _, retries) = aggregate_stats(&workers);

        for worker in workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "worker failed to join cleanly");
            }
        }

        if let Some(e) = fatal {
            return Err(e.into());
        }

        if channel_error {
            return Err(WorkerError::EventChannelClosed {
                missing: workers_alive,
            }
            .into());
        }

        if self.cancel.is_set() {
            return Err(SizerError::Interrupted);
        }

        let duration = start.elapsed();

        info!(
            blobs = blob_count,
            total_bytes,
            duration_ms = duration.as_millis() as u64,
            "size computation complete"
        );

        Ok(SizeReport {
            total_bytes,
            blob_count,
            batches,
            containers_expanded,
            containers_sized,
            retries,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn coordinator(store: MemoryStorage, workers: usize) -> SizeCoordinator {
        SizeCoordinator::new(SizeConfig::new(workers).unwrap(), Arc::new(store))
    }

    #[test]
    fn test_empty_locator_set_reports_zero() {
        let report = coordinator(MemoryStorage::new(), 2)
            .run(Vec::new())
            .unwrap();
        assert_eq!(report.total_bytes, 0);
        assert_eq!(report.batches, 0);
        assert_eq!(report.format_total(), "0.00 B");
    }

    #[test]
    fn test_queue_closes_exactly_once_with_expansions() {
        let mut store = MemoryStorage::new();
        store.add_blob("photos", "a", 1);
        store.add_blob("logs", "b", 2);

        let queue = WorkQueue::new();
        let stats = queue.stats();

        coordinator(store, 2)
            .run_with_queue(
                vec![Locator::parse("photos"), Locator::parse("logs")],
                queue,
            )
            .unwrap();
        assert_eq!(stats.close_count(), 1);
    }

    #[test]
    fn test_queue_closes_exactly_once_without_expansions() {
        let mut store = MemoryStorage::new();
        store.add_blob("photos", "a", 1);

        let queue = WorkQueue::new();
        let stats = queue.stats();

        coordinator(store, 2)
            .run_with_queue(vec![Locator::parse("photos/")], queue)
            .unwrap();
        assert_eq!(stats.close_count(), 1);
    }

    #[test]
    fn test_fatal_path_does_not_double_close() {
        // The fatal path closes the queue on top of whichever close the
        // counter protocol already performed; the transition happens once
        let mut store = MemoryStorage::new();
        store.add_blob("photos", "a", 1);

        let queue = WorkQueue::new();
        let stats = queue.stats();

        let err = coordinator(store, 2)
            .run_with_queue(
                vec![Locator::parse("photos/"), Locator::parse("absent/")],
                queue,
            )
            .unwrap_err();
        assert!(matches!(err, SizerError::Storage(_)));
        assert_eq!(stats.close_count(), 1);
    }

    #[test]
    fn test_pre_set_cancel_flag_interrupts() {
        let mut store = MemoryStorage::new();
        store.add_blob("data", "a", 1);

        let coord = coordinator(store, 2);
        coord.cancel_flag().set();

        let err = coord.run(vec![Locator::parse("data/")]).unwrap_err();
        assert!(matches!(err, SizerError::Interrupted));
    }
}

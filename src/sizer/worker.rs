//! Worker thread logic for the size pool
//!
//! Each worker pulls locators from the work queue and either:
//! - expands an unresolved locator into concrete containers, feeding the
//!   derived locators back into the queue, or
//! - resolves a concrete locator by listing its blobs into one batch for
//!   the coordinator.
//!
//! Every page fetch goes through a bounded retry; exhausting the budget
//! is fatal for the whole computation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, trace, warn};

use crate::config::SizeConfig;
use crate::error::{StorageError, StorageResult, WorkerError};
use crate::locator::Locator;
use crate::sizer::queue::{QueueHandle, RecvOutcome};
use crate::sizer::{CancelFlag, ResultBatch, SizeEvent};
use crate::storage::StorageClient;

/// How often an idle worker re-checks the cancel flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Unresolved locators expanded
    pub containers_expanded: AtomicU64,

    /// Resolved locators fully listed
    pub containers_sized: AtomicU64,

    /// Blob entries counted
    pub blobs_counted: AtomicU64,

    /// Bytes counted (sum of entry sizes)
    pub bytes_counted: AtomicU64,

    /// Transient page failures that were retried
    pub retries: AtomicU64,
}

impl WorkerStats {
    fn record_expansion(&self) {
        self.containers_expanded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_sized(&self, blobs: u64, bytes: u64) {
        self.containers_sized.fetch_add(1, Ordering::Relaxed);
        self.blobs_counted.fetch_add(blobs, Ordering::Relaxed);
        self.bytes_counted.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }
}

/// A worker thread in the size pool
pub struct SizeWorker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl SizeWorker {
    /// Spawn a new worker thread
    pub(crate) fn spawn(
        id: usize,
        config: Arc<SizeConfig>,
        client: Arc<dyn StorageClient>,
        queue: QueueHandle,
        events: Sender<SizeEvent>,
        cancel: CancelFlag,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("sizer-{}", id))
            .spawn(move || {
                worker_loop(id, config, client, queue, events, cancel, stats_clone);
            })
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked { id: self.id }),
            None => Ok(()),
        }
    }
}

/// Main worker loop: resolve-or-expand until the queue is closed and
/// drained, then emit exactly one exit signal
fn worker_loop(
    id: usize,
    config: Arc<SizeConfig>,
    client: Arc<dyn StorageClient>,
    queue: QueueHandle,
    events: Sender<SizeEvent>,
    cancel: CancelFlag,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "worker starting");

    loop {
        if cancel.is_set() {
            break;
        }

        let locator = match queue.recv_timeout(POLL_INTERVAL) {
            RecvOutcome::Task(locator) => locator,
            RecvOutcome::TimedOut => continue,
            RecvOutcome::Closed => break,
        };

        match locator {
            Locator::Unresolved { name_prefix } => {
                match expand_locator(
                    client.as_ref(),
                    config.retry_attempts,
                    &cancel,
                    &name_prefix,
                    &stats,
                ) {
                    Ok(derived) => {
                        let matched = derived.len();
                        let mut submitted = 0usize;
                        for locator in derived {
                            // Submission only fails once the fatal path has
                            // closed the queue; the rest can be dropped
                            if queue.submit(locator).is_err() {
                                break;
                            }
                            submitted += 1;
                        }
                        debug!(
                            worker = id,
                            prefix = %name_prefix,
                            matched,
                            submitted,
                            "expansion complete"
                        );
                    }
                    Err(e) => {
                        if !cancel.is_set() {
                            warn!(worker = id, prefix = %name_prefix, error = %e, "expansion failed");
                            let _ = events.send(SizeEvent::Batch(Err(e)));
                        }
                    }
                }

                // All submissions above precede this signal: the coordinator
                // may close the queue the moment its counter reaches zero
                let _ = events.send(SizeEvent::ExpansionDone);
            }

            Locator::Resolved { container, prefix } => {
                match resolve_locator(
                    client.as_ref(),
                    config.retry_attempts,
                    &cancel,
                    &container,
                    &prefix,
                    &stats,
                ) {
                    Ok(batch) => {
                        trace!(
                            worker = id,
                            container = %container,
                            blobs = batch.records.len(),
                            "container sized"
                        );
                        let _ = events.send(SizeEvent::Batch(Ok(batch)));
                    }
                    Err(e) => {
                        if !cancel.is_set() {
                            warn!(worker = id, container = %container, error = %e, "listing failed");
                            let _ = events.send(SizeEvent::Batch(Err(e)));
                        }
                    }
                }
            }
        }
    }

    debug!(
        worker = id,
        blobs = stats.blobs_counted.load(Ordering::Relaxed),
        bytes = stats.bytes_counted.load(Ordering::Relaxed),
        "worker exiting"
    );

    let _ = events.send(SizeEvent::WorkerExited { worker: id });
}

/// Expand an unresolved locator into one resolved locator per container
/// whose name starts with the prefix
///
/// The account listing is fetched completely, across every page, before
/// any filtering decision is final; the filter itself is applied client
/// side per page, never delegated to the provider.
fn expand_locator(
    client: &dyn StorageClient,
    retry_attempts: u32,
    cancel: &CancelFlag,
    name_prefix: &str,
    stats: &WorkerStats,
) -> StorageResult<Vec<Locator>> {
    let mut matches = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = retry_page(
            "list_containers",
            retry_attempts,
            cancel,
            stats,
            || client.list_containers(cursor.as_deref()),
        )?;

        for container in page.containers {
            if container.name.starts_with(name_prefix) {
                matches.push(Locator::resolved(container.name, ""));
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    stats.record_expansion();
    Ok(matches)
}

/// List every blob under a resolved locator into one result batch
fn resolve_locator(
    client: &dyn StorageClient,
    retry_attempts: u32,
    cancel: &CancelFlag,
    container: &str,
    prefix: &str,
    stats: &WorkerStats,
) -> StorageResult<ResultBatch> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = retry_page("list_blobs", retry_attempts, cancel, stats, || {
            client.list_blobs(container, prefix, cursor.as_deref())
        })?;

        records.extend(page.entries);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    let bytes: i64 = records.iter().map(|r| r.size).sum();
    stats.record_sized(records.len() as u64, bytes.max(0) as u64);

    Ok(ResultBatch {
        container: container.to_string(),
        records,
    })
}

/// Run one page fetch with a bounded retry on transient errors
///
/// Non-transient errors fail immediately; exhausting the budget escalates
/// to `RetriesExhausted`. The cancel flag is honored between attempts.
fn retry_page<T>(
    operation: &str,
    attempts: u32,
    cancel: &CancelFlag,
    stats: &WorkerStats,
    mut fetch: impl FnMut() -> StorageResult<T>,
) -> StorageResult<T> {
    let mut last_error: Option<StorageError> = None;

    for attempt in 1..=attempts {
        if cancel.is_set() {
            break;
        }

        match fetch() {
            Ok(page) => return Ok(page),
            Err(e) if e.is_transient() => {
                debug!(operation, attempt, error = %e, "transient page failure");
                stats.record_retry();
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    match last_error {
        Some(e) => Err(StorageError::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
            last_error: e.to_string(),
        }),
        None => Err(StorageError::Transient {
            operation: operation.to_string(),
            reason: "cancelled before completion".to_string(),
        }),
    }
}

/// Aggregate statistics from the whole pool:
/// (expanded, sized, blobs, bytes, retries)
pub(crate) fn aggregate_stats(workers: &[SizeWorker]) -> (u64, u64, u64, u64, u64) {
    let mut expanded = 0u64;
    let mut sized = 0u64;
    let mut blobs = 0u64;
    let mut bytes = 0u64;
    let mut retries = 0u64;

    for worker in workers {
        expanded += worker.stats.containers_expanded.load(Ordering::Relaxed);
        sized += worker.stats.containers_sized.load(Ordering::Relaxed);
        blobs += worker.stats.blobs_counted.load(Ordering::Relaxed);
        bytes += worker.stats.bytes_counted.load(Ordering::Relaxed);
        retries += worker.stats.retries.load(Ordering::Relaxed);
    }

    (expanded, sized, blobs, bytes, retries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizer::queue::WorkQueue;
    use crate::storage::MemoryStorage;
    use crossbeam_channel::unbounded;

    fn prefix_store() -> MemoryStorage {
        let mut store = MemoryStorage::new();
        for name in ["foo", "foobar", "foo2", "bar"] {
            store.add_container(name);
        }
        store
    }

    #[test]
    fn test_expansion_filters_by_name_prefix() {
        let store = prefix_store();
        let stats = WorkerStats::default();

        let mut derived =
            expand_locator(&store, 3, &CancelFlag::new(), "foo", &stats).unwrap();
        derived.sort_by_key(|l| l.to_string());

        assert_eq!(
            derived,
            vec![
                Locator::resolved("foo", ""),
                Locator::resolved("foo2", ""),
                Locator::resolved("foobar", ""),
            ]
        );
    }

    #[test]
    fn test_expansion_spans_pages() {
        // Prefix matches must be collected from every page, not just the first
        let store = prefix_store().with_page_size(1);
        let stats = WorkerStats::default();

        let derived = expand_locator(&store, 3, &CancelFlag::new(), "foo", &stats).unwrap();
        assert_eq!(derived.len(), 3);
    }

    #[test]
    fn test_empty_prefix_expands_to_all_containers() {
        let store = prefix_store();
        let stats = WorkerStats::default();

        let derived = expand_locator(&store, 3, &CancelFlag::new(), "", &stats).unwrap();
        assert_eq!(derived.len(), 4);
    }

    #[test]
    fn test_resolution_accumulates_across_pages() {
        let mut store = MemoryStorage::new();
        for (name, size) in [("a", 10), ("b", 20), ("c", 30), ("d", 40), ("e", 50)] {
            store.add_blob("data", name, size);
        }
        let store = store.with_page_size(2);
        let stats = WorkerStats::default();

        let batch =
            resolve_locator(&store, 3, &CancelFlag::new(), "data", "", &stats).unwrap();
        assert_eq!(batch.records.len(), 5);
        assert_eq!(batch.total_bytes(), 150);
        assert_eq!(stats.blobs_counted.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let mut store = MemoryStorage::new();
        store.add_blob("data", "a", 7);
        store.fail_next(2);

        let stats = WorkerStats::default();
        let batch =
            resolve_locator(&store, 3, &CancelFlag::new(), "data", "", &stats).unwrap();
        assert_eq!(batch.total_bytes(), 7);
        assert_eq!(stats.retries.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_retry_budget_exhaustion_is_fatal() {
        let mut store = MemoryStorage::new();
        store.add_blob("data", "a", 7);
        store.fail_next(4);

        let stats = WorkerStats::default();
        let err = resolve_locator(&store, 3, &CancelFlag::new(), "data", "", &stats)
            .unwrap_err();
        assert!(matches!(err, StorageError::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn test_cancel_stops_worker_while_queue_is_still_open() {
        // The queue's sender stays alive here, so the worker never sees a
        // disconnect; the cancel flag alone must end its poll loop. This
        // is what lets the coordinator abort a partially-started pool.
        let queue = WorkQueue::new();
        let (events, _events_rx) = unbounded();
        let cancel = CancelFlag::new();

        let worker = SizeWorker::spawn(
            0,
            Arc::new(SizeConfig::default()),
            Arc::new(MemoryStorage::new()),
            queue.handle(),
            events,
            cancel.clone(),
        )
        .unwrap();

        cancel.set();
        worker.join().unwrap();
        assert!(!queue.is_closed());
    }

    #[test]
    fn test_not_found_fails_without_retry() {
        let store = MemoryStorage::new();
        let stats = WorkerStats::default();

        let err = resolve_locator(&store, 3, &CancelFlag::new(), "absent", "", &stats)
            .unwrap_err();
        assert!(matches!(err, StorageError::ContainerNotFound { .. }));
        assert_eq!(store.list_call_count(), 1);
    }
}

//! Integration tests for the size engine
//!
//! All tests run the full worker pool and coordinator against the
//! in-memory storage backend.

use std::sync::Arc;

use blobsize::config::SizeConfig;
use blobsize::error::{SizerError, StorageError};
use blobsize::locator::Locator;
use blobsize::sizer::SizeCoordinator;
use blobsize::storage::MemoryStorage;

fn run_with(
    store: MemoryStorage,
    workers: usize,
    locators: &[&str],
) -> blobsize::Result<blobsize::SizeReport> {
    let config = SizeConfig::new(workers).unwrap();
    let coordinator = SizeCoordinator::new(config, Arc::new(store));
    coordinator.run(locators.iter().map(|s| Locator::parse(s)).collect())
}

/// Two containers matching the "photos" name prefix plus one that does not
fn photo_account() -> MemoryStorage {
    let mut store = MemoryStorage::new();
    store.add_blob("photos", "cat.jpg", 400_000);
    store.add_blob("photos", "dog.jpg", 600_000);
    store.add_blob("photos-archive", "old/a.jpg", 1_500_000);
    store.add_blob("photos-archive", "old/b.jpg", 1_000_000);
    store.add_blob("logs", "2024/app.log", 12_345);
    store
}

#[test]
fn single_resolved_locator_sums_matching_blobs() {
    let mut store = MemoryStorage::new();
    store.add_blob("data", "a", 100);
    store.add_blob("data", "b", 250);
    store.add_blob("data", "c", 4096);

    let report = run_with(store, 2, &["data/"]).unwrap();
    assert_eq!(report.total_bytes, 4446);
    assert_eq!(report.blob_count, 3);
    assert_eq!(report.batches, 1);
    assert_eq!(report.format_total(), "4.45 KB");
}

#[test]
fn unresolved_locator_expands_and_sums_both_containers() {
    let mut store = MemoryStorage::new();
    store.add_blob("backup-a", "x", 1_000_000);
    store.add_blob("backup-b", "y", 2_500_000);

    let report = run_with(store, 2, &["backup"]).unwrap();
    assert_eq!(report.total_bytes, 3_500_000);
    assert_eq!(report.containers_expanded, 1);
    assert_eq!(report.batches, 2);
    assert_eq!(report.format_total(), "3.50 MB");
}

#[test]
fn expansion_matches_exactly_the_prefixed_containers() {
    let mut store = MemoryStorage::new();
    store.add_blob("foo", "a", 1);
    store.add_blob("foobar", "b", 10);
    store.add_blob("foo2", "c", 100);
    store.add_blob("bar", "d", 1000);

    let report = run_with(store, 3, &["foo"]).unwrap();
    // foo, foobar, foo2 counted exactly once each; bar excluded
    assert_eq!(report.total_bytes, 111);
    assert_eq!(report.batches, 3);
}

#[test]
fn total_is_independent_of_pool_size() {
    let expected = {
        let report = run_with(photo_account(), 1, &["photos", "logs/2024/"]).unwrap();
        report.total_bytes
    };
    assert_eq!(expected, 3_512_345);

    for workers in [4, 16] {
        let report = run_with(photo_account(), workers, &["photos", "logs/2024/"]).unwrap();
        assert_eq!(report.total_bytes, expected, "pool size {}", workers);
    }
}

#[test]
fn zero_unresolved_locators_complete_without_expansion() {
    let report = run_with(photo_account(), 2, &["photos/", "logs/"]).unwrap();
    assert_eq!(report.containers_expanded, 0);
    assert_eq!(report.total_bytes, 1_012_345);
    assert_eq!(report.batches, 2);
}

#[test]
fn three_unresolved_locators_emit_three_expansions() {
    let report = run_with(photo_account(), 2, &["photos", "logs", "photos-archive"]).unwrap();
    assert_eq!(report.containers_expanded, 3);
    // photos expands to {photos, photos-archive}, the others to themselves
    assert_eq!(report.batches, 4);
    assert_eq!(report.total_bytes, 2_500_000 + 1_000_000 + 12_345 + 2_500_000);
}

#[test]
fn pagination_counts_every_entry_exactly_once() {
    let mut store = MemoryStorage::new();
    for (name, size) in [("a", 1), ("b", 2), ("c", 4), ("d", 8), ("e", 16)] {
        store.add_blob("data", name, size);
    }
    // 5 entries at page size 2: pages of 2, 2, 1
    let store = store.with_page_size(2);

    let report = run_with(store, 2, &["data/"]).unwrap();
    assert_eq!(report.blob_count, 5);
    assert_eq!(report.total_bytes, 31);
}

#[test]
fn prefix_restricts_the_resolved_listing() {
    let mut store = MemoryStorage::new();
    store.add_blob("data", "logs/a", 100);
    store.add_blob("data", "logs/b", 200);
    store.add_blob("data", "tmp/c", 400);

    let report = run_with(store, 2, &["data/logs/"]).unwrap();
    assert_eq!(report.total_bytes, 300);
    assert_eq!(report.blob_count, 2);
}

#[test]
fn empty_locator_sizes_the_whole_account() {
    let report = run_with(photo_account(), 2, &[""]).unwrap();
    assert_eq!(report.containers_expanded, 1);
    assert_eq!(report.batches, 3);
    assert_eq!(report.total_bytes, 3_512_345);
}

#[test]
fn transient_failures_within_budget_still_succeed() {
    let mut store = MemoryStorage::new();
    store.add_blob("data", "a", 1000);
    store.fail_next(2);

    let report = run_with(store, 2, &["data/"]).unwrap();
    assert_eq!(report.total_bytes, 1000);
    assert_eq!(report.retries, 2);
}

#[test]
fn exceeding_the_retry_budget_reports_fatal_and_no_total() {
    let mut store = MemoryStorage::new();
    store.add_blob("data", "a", 1000);
    // 4 consecutive failures exceed the budget of 3 attempts
    store.fail_next(4);

    let err = run_with(store, 2, &["data/"]).unwrap_err();
    match err {
        SizerError::Storage(StorageError::RetriesExhausted { attempts, .. }) => {
            assert_eq!(attempts, 3);
        }
        other => panic!("expected retries-exhausted, got {:?}", other),
    }
}

#[test]
fn missing_container_aborts_the_whole_computation() {
    // Policy: not-found is fatal for the entire multi-locator run,
    // consistent with never reporting a partial total
    let err = run_with(photo_account(), 2, &["photos/", "absent/"]).unwrap_err();
    assert!(matches!(
        err,
        SizerError::Storage(StorageError::ContainerNotFound { .. })
    ));
}

#[test]
fn fatal_error_with_work_still_queued_shuts_down_promptly() {
    let mut store = MemoryStorage::new();
    for i in 0..50 {
        store.add_blob(&format!("c{:02}", i), "blob", 10);
    }

    // One bad locator in the middle of many good ones: the run must
    // terminate with the error and without a partial total, regardless of
    // how much other work was in flight when it hit
    let mut locators: Vec<String> = (0..50).map(|i| format!("c{:02}/", i)).collect();
    locators.insert(25, "absent/".to_string());
    let refs: Vec<&str> = locators.iter().map(|s| s.as_str()).collect();

    let err = run_with(store, 1, &refs).unwrap_err();
    assert!(matches!(
        err,
        SizerError::Storage(StorageError::ContainerNotFound { .. })
    ));
}

#[test]
fn large_expansion_with_minimal_pool_does_not_deadlock() {
    let mut store = MemoryStorage::new();
    let mut expected = 0i64;
    for i in 0..100 {
        store.add_blob(&format!("bucket-{:03}", i), "payload", i);
        expected += i;
    }

    // Pool of 1 configured worker + 1 initial-locator slot
    let report = run_with(store, 1, &["bucket-"]).unwrap();
    assert_eq!(report.total_bytes, expected);
    assert_eq!(report.batches, 100);
}

//! blobsize - Parallel aggregate-size engine for cloud blob storage
//!
//! Computes the total byte size of every object matched by a set of
//! storage locators. Locators may name a concrete container and path
//! prefix, or only a container-name prefix that must first be expanded
//! into the set of matching containers - so the amount of work is not
//! known up front.
//!
//! # Features
//!
//! - **Dynamic work generation**: expanding one ambiguous locator feeds
//!   an unknown number of new work items back into the same queue the
//!   workers drain.
//!
//! - **Deadlock-free pool sizing**: the pool holds one extra worker per
//!   initial locator, so every initial locator expanding at once still
//!   leaves workers free to make progress.
//!
//! - **Counter-based termination**: the coordinator proves completion
//!   from two statically-known counts (pending expansions, live workers)
//!   with no global list of outstanding tasks.
//!
//! - **Bounded retries, no partial totals**: each page fetch is retried
//!   on transient failures; exhaustion cancels the whole pool and the
//!   computation reports a single error instead of an undercounted total.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Storage account                          │
//! │        (containers × blobs, paginated listing API)           │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │ StorageClient trait
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Worker pool (N+K)                       │
//! │   expand: name-prefix -> resolved locators -> WorkQueue      │
//! │   resolve: container+prefix -> ResultBatch -> Coordinator    │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │ event channel
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Coordinator                           │
//! │   counts expansion-done / worker-exited signals,             │
//! │   closes the queue, folds batches into the total             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use blobsize::config::SizeConfig;
//! use blobsize::locator::Locator;
//! use blobsize::sizer::SizeCoordinator;
//! use blobsize::storage::MemoryStorage;
//!
//! let mut store = MemoryStorage::new();
//! store.add_blob("photos", "cat.jpg", 1000);
//! store.add_blob("photos-archive", "dog.jpg", 2500);
//!
//! // "photos" has no path separator: it expands to both containers
//! let coordinator = SizeCoordinator::new(SizeConfig::default(), Arc::new(store));
//! let report = coordinator.run(vec![Locator::parse("photos")]).unwrap();
//!
//! assert_eq!(report.total_bytes, 3500);
//! assert_eq!(report.format_total(), "3.50 KB");
//! ```
//!
//! Production callers implement [`storage::StorageClient`] over their
//! cloud SDK; the in-memory backend serves tests and the
//! `blobsize-sim` harness binary.

pub mod config;
pub mod error;
pub mod locator;
pub mod progress;
pub mod sizer;
pub mod storage;

pub use config::SizeConfig;
pub use error::{Result, SizerError, StorageError};
pub use locator::Locator;
pub use sizer::{CancelFlag, ResultBatch, SizeCoordinator, SizeReport};
pub use storage::{BlobRecord, StorageClient};

//! In-memory storage backend
//!
//! Deterministic [`StorageClient`] implementation used by the test suite
//! and the simulation harness. Containers are held in a `BTreeMap` so
//! listing order is stable, pages are cut at a configurable size, and a
//! scripted failure budget lets tests exercise the retry path.
//!
//! Cursors are the decimal offset of the next item, which keeps pages
//! exhaustive and non-overlapping by construction.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::storage::{BlobPage, BlobRecord, ContainerItem, ContainerPage, StorageClient};

/// Default page size, matching typical provider limits
const DEFAULT_PAGE_SIZE: usize = 5000;

/// Catalog format consumed by [`MemoryStorage::from_catalog_file`]:
/// a JSON object mapping container names to arrays of blob records
pub type Catalog = BTreeMap<String, Vec<BlobRecord>>;

/// In-memory paginated storage account
pub struct MemoryStorage {
    containers: BTreeMap<String, Vec<BlobRecord>>,
    page_size: usize,

    /// Remaining scripted failures; every list call consumes one while
    /// nonzero and reports a transient error instead of a page
    fail_budget: Mutex<u32>,

    /// Total list calls observed (both operations)
    list_calls: AtomicU64,
}

impl MemoryStorage {
    /// Create an empty account with the default page size
    pub fn new() -> Self {
        Self::from_catalog(Catalog::new())
    }

    /// Create an account from a prebuilt catalog
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            containers: catalog,
            page_size: DEFAULT_PAGE_SIZE,
            fail_budget: Mutex::new(0),
            list_calls: AtomicU64::new(0),
        }
    }

    /// Load an account from a JSON catalog file
    pub fn from_catalog_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let catalog: Catalog = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::from_catalog(catalog))
    }

    /// Set the page size for both listing operations
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add an empty container
    pub fn add_container(&mut self, name: impl Into<String>) -> &mut Self {
        self.containers.entry(name.into()).or_default();
        self
    }

    /// Add a blob, creating its container if needed
    pub fn add_blob(&mut self, container: &str, name: &str, size: i64) -> &mut Self {
        self.containers
            .entry(container.to_string())
            .or_default()
            .push(BlobRecord::new(name, size));
        self
    }

    /// Script the next `n` list calls to fail with a transient error
    pub fn fail_next(&self, n: u32) {
        *self.fail_budget.lock() = n;
    }

    /// Total list calls observed so far
    pub fn list_call_count(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn check_fault(&self, operation: &str) -> StorageResult<()> {
        let mut budget = self.fail_budget.lock();
        if *budget > 0 {
            *budget -= 1;
            return Err(StorageError::Transient {
                operation: operation.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn parse_cursor(operation: &str, cursor: Option<&str>) -> StorageResult<usize> {
        match cursor {
            None => Ok(0),
            Some(c) => c.parse().map_err(|_| StorageError::InvalidCursor {
                operation: operation.to_string(),
                cursor: c.to_string(),
            }),
        }
    }

    fn page_bounds(&self, start: usize, total: usize) -> (usize, Option<String>) {
        let end = (start + self.page_size).min(total);
        let next = (end < total).then(|| end.to_string());
        (end, next)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageClient for MemoryStorage {
    fn list_containers(&self, cursor: Option<&str>) -> StorageResult<ContainerPage> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.check_fault("list_containers")?;

        let start = Self::parse_cursor("list_containers", cursor)?;
        let names: Vec<&String> = self.containers.keys().collect();
        let (end, next_cursor) = self.page_bounds(start, names.len());

        let containers = names[start.min(names.len())..end]
            .iter()
            .map(|name| ContainerItem {
                name: (*name).clone(),
            })
            .collect();

        Ok(ContainerPage {
            containers,
            next_cursor,
        })
    }

    fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
        cursor: Option<&str>,
    ) -> StorageResult<BlobPage> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.check_fault("list_blobs")?;

        let blobs = self
            .containers
            .get(container)
            .ok_or_else(|| StorageError::ContainerNotFound {
                name: container.to_string(),
            })?;

        let matched: Vec<&BlobRecord> = blobs
            .iter()
            .filter(|b| b.name.starts_with(prefix))
            .collect();

        let start = Self::parse_cursor("list_blobs", cursor)?;
        let (end, next_cursor) = self.page_bounds(start, matched.len());

        let entries = matched[start.min(matched.len())..end]
            .iter()
            .map(|b| (*b).clone())
            .collect();

        Ok(BlobPage {
            entries,
            next_cursor,
        })
    }
}

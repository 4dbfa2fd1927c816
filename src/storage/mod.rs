//! Storage listing interface
//!
//! The size engine consumes blob storage through the [`StorageClient`]
//! trait: two paginated listing operations, resumed via opaque cursors
//! until the provider reports none remaining. Production backends wrap a
//! cloud SDK; [`memory::MemoryStorage`] backs tests and the simulation
//! harness.
//!
//! Implementations must be safe for concurrent invocation - every worker
//! in the pool calls into the same client.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

pub use memory::MemoryStorage;

/// One matched object and its byte length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    /// Blob name (path within its container)
    pub name: String,

    /// Content length in bytes
    pub size: i64,
}

impl BlobRecord {
    /// Create a new record
    pub fn new(name: impl Into<String>, size: i64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// A container as returned by an account-level listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerItem {
    /// Container name
    pub name: String,
}

/// One page of an account-level container listing
#[derive(Debug, Clone)]
pub struct ContainerPage {
    /// Containers on this page
    pub containers: Vec<ContainerItem>,

    /// Cursor for the next page; `None` when the listing is exhausted
    pub next_cursor: Option<String>,
}

/// One page of a blob listing under a container + prefix
#[derive(Debug, Clone)]
pub struct BlobPage {
    /// Blob entries on this page
    pub entries: Vec<BlobRecord>,

    /// Cursor for the next page; `None` when the listing is exhausted
    pub next_cursor: Option<String>,
}

/// Paginated listing operations against a storage account
///
/// Both operations must support resumption via the returned cursor until
/// exhausted, and successive pages must be non-overlapping: the engine
/// counts every entry exactly once.
pub trait StorageClient: Send + Sync {
    /// List containers in the account, one page at a time
    ///
    /// The listing is unfiltered: name-prefix filtering happens client
    /// side, after all pages have been fetched. A provider-side prefix
    /// parameter combined with partial pagination may silently miss
    /// matches beyond a single page horizon.
    fn list_containers(&self, cursor: Option<&str>) -> StorageResult<ContainerPage>;

    /// List blob entries under `container` whose names start with
    /// `prefix`, one page at a time
    fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
        cursor: Option<&str>,
    ) -> StorageResult<BlobPage>;
}

//! Storage locators - the work items of the size engine
//!
//! A locator names a storage scope. It is either resolved (a concrete
//! container plus a path prefix to search directly) or unresolved (the
//! container field is itself only a name-prefix and must be expanded into
//! the set of matching containers before any blob listing can happen).
//!
//! Locators are immutable: expansion never mutates the unresolved locator,
//! it synthesizes new resolved ones.

use std::fmt;

/// A reference to a storage scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// A container-name prefix that must be expanded before it can be
    /// measured. An empty prefix matches every container in the account.
    Unresolved {
        /// Prefix matched against container names
        name_prefix: String,
    },

    /// A concrete container and blob-path prefix, ready for listing
    Resolved {
        /// Container name
        container: String,

        /// Blob path prefix (may be empty: the whole container)
        prefix: String,
    },
}

impl Locator {
    /// Parse a locator from its CLI string form
    ///
    /// - `"foo/bar"` names blobs under container `foo` with prefix `bar`
    /// - `"foo/"` names every blob in container `foo`
    /// - `"foo"` is ambiguous: any container whose name starts with `foo`
    /// - `""` is ambiguous over every container in the account
    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((container, prefix)) => Locator::Resolved {
                container: container.to_string(),
                prefix: prefix.to_string(),
            },
            None => Locator::Unresolved {
                name_prefix: s.to_string(),
            },
        }
    }

    /// Construct a resolved locator, as synthesized by expansion
    pub fn resolved(container: impl Into<String>, prefix: impl Into<String>) -> Self {
        Locator::Resolved {
            container: container.into(),
            prefix: prefix.into(),
        }
    }

    /// Construct an unresolved locator from a container-name prefix
    pub fn unresolved(name_prefix: impl Into<String>) -> Self {
        Locator::Unresolved {
            name_prefix: name_prefix.into(),
        }
    }

    /// Whether this locator can be listed directly
    pub fn is_resolved(&self) -> bool {
        matches!(self, Locator::Resolved { .. })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Unresolved { name_prefix } => write!(f, "{}", name_prefix),
            Locator::Resolved { container, prefix } => write!(f, "{}/{}", container, prefix),
        }
    }
}

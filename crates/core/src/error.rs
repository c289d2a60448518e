//! Error types for registry mutations and launches

use crate::item::CollectionKind;
use thiserror::Error;

/// Rejected registry mutation. State is never modified when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("index {index} out of range for {collection} (len {len})")]
    IndexOutOfRange {
        collection: CollectionKind,
        index: usize,
        len: usize,
    },

    #[error("{0} is being reordered; commit or cancel first")]
    ReorderInProgress(CollectionKind),
}

/// Failure to start an application or open a website
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("nothing to launch: empty target")]
    EmptyTarget,

    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

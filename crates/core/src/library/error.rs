//! Error types for the library module.

use thiserror::Error;

/// Errors reported by the library store and the metadata inserter.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Collection does not exist (e.g. deleted by a user).
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Store rejected or failed a collection operation.
    #[error("Library store error: {0}")]
    Store(String),

    /// Metadata insertion failed for an item.
    #[error("Metadata insertion failed for {item}: {reason}")]
    Insert { item: String, reason: String },

    /// Inserter reported success without producing a library item.
    #[error("Metadata insertion returned no library item for {item}")]
    MissingItem { item: String },

    /// Insertion ran past its time box.
    #[error("Metadata insertion timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Insertion observed cancellation.
    #[error("Operation cancelled")]
    Cancelled,
}
